//! Connection lifecycle and reconnection
//!
//! The supervisor runs the active [`Ingestor`] in a background task:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> (error | close) -> Disconnected
//!      ^                                                            |
//!      +-------------------- reconnect delay -----------------------+
//! ```
//!
//! Failures never escape the loop; they are logged and drive the retry.
//! [`ConnectionSupervisor::stop`] moves through `Closing` to `Disconnected`
//! and only returns once the task has finished, so no mailbox write can
//! happen afterwards.

use crate::ingest::Ingestor;
use crate::Result;
use heartsync_core::{ClientConfig, SnapshotMailbox};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long `stop` waits for a graceful close before aborting the task.
const STOP_GRACE: Duration = Duration::from_secs(2);
/// Upper bound on the websocket close handshake during shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// Delay between reconnect attempts.
///
/// With `multiplier == 1.0` the delay is fixed. Larger multipliers grow it
/// per failed attempt up to `max`; a successful connect resets it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(500))
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1.0,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            initial: config.reconnect_delay(),
            max: config.max_reconnect_delay(),
            multiplier: config.backoff_multiplier,
        }
    }

    /// Delay to use after `current` has been waited out.
    pub fn next_delay(&self, current: Duration) -> Duration {
        if self.multiplier <= 1.0 {
            return self.initial;
        }
        let cap = self.max.max(self.initial);
        // Products too large for a Duration saturate at the cap
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(cap, |next| next.min(cap))
    }
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    connects: AtomicU64,
}

/// Supervisor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Connect attempts, successful or not
    pub attempts: u64,
    /// Successful connects
    pub connects: u64,
}

/// Owns the lifetime of whichever ingestor is active.
pub struct ConnectionSupervisor {
    mailbox: Arc<SnapshotMailbox>,
    policy: ReconnectPolicy,
    handle: Handle,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl ConnectionSupervisor {
    /// `handle` is the runtime the supervision task is spawned on.
    pub fn new(mailbox: Arc<SnapshotMailbox>, policy: ReconnectPolicy, handle: Handle) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            mailbox,
            policy,
            handle,
            state_tx: Arc::new(state_tx),
            shutdown_tx: None,
            task: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Begin connecting with `ingestor`. Replaces nothing: call `stop` first
    /// to switch ingestors.
    pub fn start(&mut self, ingestor: Box<dyn Ingestor>) -> Result<()> {
        if self.is_running() {
            warn!("Supervisor already running, ignoring start");
            return Ok(());
        }

        info!(
            transport = ingestor.kind(),
            endpoint = %ingestor.endpoint(),
            "Starting telemetry connection"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = SupervisorTask {
            ingestor,
            mailbox: self.mailbox.clone(),
            policy: self.policy,
            state_tx: self.state_tx.clone(),
            shutdown: shutdown_rx,
            counters: self.counters.clone(),
        };

        self.task = Some(self.handle.spawn(task.run()));
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    /// Tear down. Idempotent; returns once the ingestor task has ended.
    pub async fn stop(&mut self) {
        let Some(mut task) = self.task.take() else {
            debug!("Supervisor already stopped");
            return;
        };

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        if tokio::time::timeout(STOP_GRACE, &mut task).await.is_err() {
            warn!("Ingestor did not stop within {:?}, aborting", STOP_GRACE);
            task.abort();
            let _ = task.await;
            set_state(&self.state_tx, ConnectionState::Disconnected);
        }
        info!("Telemetry connection stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> SupervisorStats {
        SupervisorStats {
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            connects: self.counters.connects.load(Ordering::Relaxed),
        }
    }
}

fn set_state(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    let previous = tx.send_replace(next);
    if previous != next {
        info!("Connection state: {} -> {}", previous, next);
    }
}

struct SupervisorTask {
    ingestor: Box<dyn Ingestor>,
    mailbox: Arc<SnapshotMailbox>,
    policy: ReconnectPolicy,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
}

impl SupervisorTask {
    async fn run(mut self) {
        let mut delay = self.policy.initial;

        while !*self.shutdown.borrow() {
            set_state(&self.state_tx, ConnectionState::Connecting);
            self.counters.attempts.fetch_add(1, Ordering::Relaxed);

            let connected = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                res = self.ingestor.connect() => res,
            };

            match connected {
                Ok(()) => {
                    self.counters.connects.fetch_add(1, Ordering::Relaxed);
                    delay = self.policy.initial;
                    set_state(&self.state_tx, ConnectionState::Connected);

                    let outcome = tokio::select! {
                        biased;
                        _ = self.shutdown.changed() => break,
                        res = self.ingestor.run(&self.mailbox) => res,
                    };
                    match outcome {
                        Ok(()) => info!(endpoint = %self.ingestor.endpoint(), "Connection closed"),
                        Err(e) => warn!(endpoint = %self.ingestor.endpoint(), error = %e, "Connection lost"),
                    }
                    self.ingestor.close().await;
                }
                Err(e) => {
                    warn!(
                        endpoint = %self.ingestor.endpoint(),
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Connect failed"
                    );
                }
            }

            set_state(&self.state_tx, ConnectionState::Disconnected);

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.policy.next_delay(delay);
        }

        set_state(&self.state_tx, ConnectionState::Closing);
        if tokio::time::timeout(CLOSE_TIMEOUT, self.ingestor.close())
            .await
            .is_err()
        {
            debug!("Close handshake timed out, dropping connection");
        }
        set_state(&self.state_tx, ConnectionState::Disconnected);
    }
}
