//! Outbound control commands
//!
//! The dispatcher relays the intensity slider to the metrics service.
//! Only the latest value matters: each `submit` cancels the send that is
//! still pending for an older value and schedules a new one after a short
//! debounce. A send that could not be cancelled in time has its result
//! ignored, tracked by a generation number.

use crate::{Result, SyncError};
use heartsync_core::ClientConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Route that sets the simulated workload, relative to the command base URL.
const SET_INTENSITY_ROUTE: &str = "set_intensity";

/// Format the command URL for `value`. Always two decimals with a `.` separator.
pub fn intensity_url(base_url: &str, value: f32) -> String {
    format!(
        "{}/{}/{:.2}",
        base_url.trim_end_matches('/'),
        SET_INTENSITY_ROUTE,
        value
    )
}

/// Latest not-yet-acknowledged command
#[derive(Debug, Default)]
struct PendingCommand {
    value: Option<f32>,
    generation: u64,
    in_flight: Option<AbortHandle>,
    last_delivered: Option<f32>,
    closed: bool,
}

/// Debounced, latest-value-wins command sender.
pub struct CommandDispatcher {
    client: reqwest::Client,
    base_url: String,
    debounce: Duration,
    handle: Handle,
    pending: Arc<Mutex<PendingCommand>>,
}

impl CommandDispatcher {
    pub fn new(
        base_url: impl Into<String>,
        debounce: Duration,
        request_timeout: Duration,
        handle: Handle,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            debounce,
            handle,
            pending: Arc::new(Mutex::new(PendingCommand::default())),
        })
    }

    pub fn from_config(config: &ClientConfig, handle: Handle) -> Result<Self> {
        Self::new(
            config.command_url.clone(),
            config.command_debounce(),
            config.request_timeout(),
            handle,
        )
    }

    /// Record `value` as the pending command and schedule its send,
    /// cancelling the send for any older value. Never blocks.
    ///
    /// Values are clamped to `0.0..=1.0`, the range the service accepts.
    /// Returns the generation assigned to this command.
    pub fn submit(&self, value: f32) -> Result<u64> {
        if !value.is_finite() {
            return Err(SyncError::InvalidCommand(format!(
                "intensity must be finite, got {}",
                value
            )));
        }
        let value = value.clamp(0.0, 1.0);

        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(SyncError::Shutdown);
        }

        pending.generation += 1;
        let generation = pending.generation;
        if let Some(previous) = pending.in_flight.take() {
            previous.abort();
        }

        let send = deliver(
            self.client.clone(),
            intensity_url(&self.base_url, value),
            value,
            generation,
            self.debounce,
            self.pending.clone(),
        );
        pending.in_flight = Some(self.handle.spawn(send).abort_handle());
        pending.value = Some(value);

        debug!(value, generation, "Intensity command scheduled");
        Ok(generation)
    }

    /// Cancel any in-flight send and refuse further submissions. Idempotent.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock();
        if pending.closed {
            return;
        }
        pending.closed = true;
        if let Some(in_flight) = pending.in_flight.take() {
            in_flight.abort();
        }
        debug!("Command dispatcher closed");
    }

    /// Most recently submitted value.
    pub fn pending_value(&self) -> Option<f32> {
        self.pending.lock().value
    }

    /// Last value the service acknowledged.
    pub fn last_delivered(&self) -> Option<f32> {
        self.pending.lock().last_delivered
    }

    /// Whether a send is scheduled or awaiting its response.
    pub fn is_in_flight(&self) -> bool {
        self.pending.lock().in_flight.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }
}

async fn deliver(
    client: reqwest::Client,
    url: String,
    value: f32,
    generation: u64,
    debounce: Duration,
    pending: Arc<Mutex<PendingCommand>>,
) {
    if !debounce.is_zero() {
        tokio::time::sleep(debounce).await;
    }

    let outcome = client
        .post(&url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status());

    let mut slot = pending.lock();
    if slot.closed || slot.generation != generation {
        debug!(value, generation, "Ignoring result of superseded command");
        return;
    }
    slot.in_flight = None;

    match outcome {
        Ok(_) => {
            slot.last_delivered = Some(value);
            debug!(value, "Intensity command delivered");
        }
        // No retry: the next submission supersedes this one
        Err(e) => warn!(value, url = %url, error = %e, "Intensity command failed"),
    }
}
