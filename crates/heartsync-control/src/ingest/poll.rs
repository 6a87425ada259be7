//! HTTP polling ingestor, the fallback when no stream is available

use super::{publish_payload, Ingestor};
use crate::{Result, SyncError};
use async_trait::async_trait;
use heartsync_core::SnapshotMailbox;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Fetches the metrics route once per interval.
pub struct PollIngestor {
    url: String,
    interval: Duration,
    client: reqwest::Client,
    // Reading returned by connect, with the time it was requested
    primed: Option<(String, Instant)>,
}

impl PollIngestor {
    pub fn new(url: impl Into<String>, interval: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            url: url.into(),
            interval,
            client,
            primed: None,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One GET of the metrics route. `Ok(None)` means the service has no reading yet.
    async fn fetch(&self) -> Result<Option<String>> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::Status(status));
        }
        Ok(Some(resp.text().await?))
    }
}

#[async_trait]
impl Ingestor for PollIngestor {
    fn kind(&self) -> &'static str {
        "poll"
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    /// Check the service answers. Any HTTP status counts as reachable; a reading
    /// that comes back here is kept for the first cycle.
    async fn connect(&mut self) -> Result<()> {
        let requested_at = Instant::now();
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        debug!(url = %self.url, status = %status, "Metrics endpoint reachable");

        self.primed = None;
        if status.is_success() {
            match resp.text().await {
                Ok(body) => self.primed = Some((body, requested_at)),
                Err(e) => debug!(error = %e, "Discarding first reading"),
            }
        }
        Ok(())
    }

    async fn run(&mut self, mailbox: &SnapshotMailbox) -> Result<()> {
        if let Some((body, requested_at)) = self.primed.take() {
            publish_payload(mailbox, &body, "poll");
            tokio::time::sleep_until(requested_at + self.interval).await;
        }

        loop {
            let cycle_start = Instant::now();

            match self.fetch().await {
                Ok(Some(body)) => {
                    publish_payload(mailbox, &body, "poll");
                }
                Ok(None) => debug!("Metrics service has no reading yet"),
                Err(e) => warn!(error = %e, "Metrics fetch failed, skipping cycle"),
            }

            // Measured from the cycle start: a slow fetch shortens the wait
            tokio::time::sleep_until(cycle_start + self.interval).await;
        }
    }

    async fn close(&mut self) {
        self.primed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_unreachable() {
        let mut ingestor = PollIngestor::new(
            "http://127.0.0.1:1/metrics",
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(ingestor.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_end_loop() {
        let mut ingestor = PollIngestor::new(
            "http://127.0.0.1:1/metrics",
            Duration::from_millis(20),
            Duration::from_millis(200),
        )
        .unwrap();
        let mailbox = SnapshotMailbox::new();

        // Every fetch fails, but the loop keeps going until cancelled
        let outcome = tokio::time::timeout(Duration::from_millis(200), ingestor.run(&mailbox)).await;
        assert!(outcome.is_err(), "poll loop returned early");
        assert_eq!(mailbox.stats().published, 0);
    }
}
