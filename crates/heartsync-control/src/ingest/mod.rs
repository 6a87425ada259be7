//! Snapshot ingestion
//!
//! Two transports feed the same mailbox: a persistent websocket
//! ([`StreamIngestor`]) and a periodic HTTP fetch ([`PollIngestor`]).
//! The [`ConnectionSupervisor`](crate::supervisor::ConnectionSupervisor)
//! drives either one through the [`Ingestor`] trait.

pub mod poll;
pub mod stream;

pub use poll::PollIngestor;
pub use stream::StreamIngestor;

use crate::Result;
use async_trait::async_trait;
use heartsync_core::{ClientConfig, SnapshotMailbox, TelemetrySnapshot, Transport};
use tracing::{trace, warn};

/// A source of telemetry snapshots.
///
/// The supervisor calls `connect`, then `run` until it returns, then
/// `close`, and repeats after the reconnect delay. Either future may be
/// dropped at any await point when the client stops.
#[async_trait]
pub trait Ingestor: Send {
    /// Short transport name for logs
    fn kind(&self) -> &'static str;

    /// Endpoint this ingestor reads from
    fn endpoint(&self) -> &str;

    /// Open the connection (or verify the endpoint is reachable).
    async fn connect(&mut self) -> Result<()>;

    /// Publish snapshots into `mailbox` until the connection ends.
    ///
    /// `Ok(())` means a clean close, `Err` a transport failure. Both hand
    /// control back to the supervisor for reconnection.
    async fn run(&mut self, mailbox: &SnapshotMailbox) -> Result<()>;

    /// Release the connection. Safe to call when not connected.
    async fn close(&mut self);
}

/// Build the ingestor selected by `config.transport`.
pub fn from_config(config: &ClientConfig) -> Result<Box<dyn Ingestor>> {
    Ok(match config.transport {
        Transport::Stream => Box::new(StreamIngestor::new(
            config.stream_url.clone(),
            config.liveness_timeout(),
        )),
        Transport::Poll => Box::new(PollIngestor::new(
            config.metrics_url.clone(),
            config.poll_interval(),
            config.request_timeout(),
        )?),
    })
}

/// Decode `payload` and publish it. Undecodable payloads are logged and dropped.
///
/// Returns `true` if a snapshot was published.
pub(crate) fn publish_payload(mailbox: &SnapshotMailbox, payload: &str, source: &str) -> bool {
    match TelemetrySnapshot::from_json(payload) {
        Ok(snapshot) => {
            trace!(source, bpm = snapshot.bpm, zone = %snapshot.zone, "Snapshot received");
            if mailbox.publish(snapshot) {
                trace!(source, "Replaced unread snapshot");
            }
            true
        }
        Err(e) => {
            warn!(source, error = %e, "Dropping undecodable payload");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_payload_valid() {
        let mailbox = SnapshotMailbox::new();
        assert!(publish_payload(
            &mailbox,
            r##"{"bpm": 101.0, "zone": "Fat Burn", "color": "#FFFF00"}"##,
            "test"
        ));
        assert_eq!(mailbox.take().unwrap().bpm, 101.0);
    }

    #[test]
    fn test_publish_payload_malformed_leaves_mailbox_alone() {
        let mailbox = SnapshotMailbox::new();
        publish_payload(&mailbox, r##"{"bpm": 70.0, "color": "#00FF00"}"##, "test");

        assert!(!publish_payload(&mailbox, r##"{"zone": "Rest", "color": "#00FF00"}"##, "test"));
        assert!(!publish_payload(&mailbox, "not json", "test"));

        // The earlier snapshot is still the pending one
        assert_eq!(mailbox.take().unwrap().bpm, 70.0);
        assert_eq!(mailbox.stats().published, 1);
    }

    #[test]
    fn test_from_config_selects_transport() {
        let mut config = ClientConfig::default();
        assert_eq!(from_config(&config).unwrap().kind(), "stream");

        config.transport = Transport::Poll;
        let ingestor = from_config(&config).unwrap();
        assert_eq!(ingestor.kind(), "poll");
        assert_eq!(ingestor.endpoint(), "http://localhost:8000/metrics");
    }
}
