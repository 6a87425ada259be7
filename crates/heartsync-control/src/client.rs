//! Blocking facade for hosts with a synchronous tick loop
//!
//! [`TelemetryClient`] owns a small tokio runtime for the network side and
//! exposes only non-blocking calls to the consumer, apart from `stop`.
//! It must not be created or dropped from inside an async context.

use crate::command::CommandDispatcher;
use crate::ingest;
use crate::supervisor::{ConnectionState, ConnectionSupervisor, ReconnectPolicy, SupervisorStats};
use crate::{Result, SyncError};
use heartsync_core::{ClientConfig, SnapshotMailbox, StateSynchronizer};
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tracing::info;

/// Telemetry client: ingestion, command relay, and their runtime.
pub struct TelemetryClient {
    config: ClientConfig,
    mailbox: Arc<SnapshotMailbox>,
    supervisor: ConnectionSupervisor,
    dispatcher: CommandDispatcher,
    stopped: bool,
    // Declared last so the tasks above are torn down before the runtime
    runtime: Runtime,
}

impl TelemetryClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("heartsync-net")
            .enable_all()
            .build()?;

        let mailbox = Arc::new(SnapshotMailbox::new());
        let supervisor = ConnectionSupervisor::new(
            mailbox.clone(),
            ReconnectPolicy::from_config(&config),
            runtime.handle().clone(),
        );
        let dispatcher = CommandDispatcher::from_config(&config, runtime.handle().clone())?;

        Ok(Self {
            config,
            mailbox,
            supervisor,
            dispatcher,
            stopped: false,
            runtime,
        })
    }

    /// Start ingesting with the configured transport.
    pub fn start(&mut self) -> Result<()> {
        if self.stopped {
            return Err(SyncError::Shutdown);
        }
        let ingestor = ingest::from_config(&self.config)?;
        self.supervisor.start(ingestor)
    }

    /// A synchronizer reading from this client's mailbox.
    pub fn synchronizer(&self) -> Result<StateSynchronizer> {
        Ok(StateSynchronizer::new(self.mailbox.clone(), &self.config.sync)?)
    }

    pub fn mailbox(&self) -> Arc<SnapshotMailbox> {
        self.mailbox.clone()
    }

    /// Send an intensity (`0.0..=1.0`) to the service, superseding any pending one.
    pub fn submit_intensity(&self, value: f32) -> Result<()> {
        self.dispatcher.submit(value).map(|_| ())
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe()
    }

    pub fn supervisor_stats(&self) -> SupervisorStats {
        self.supervisor.stats()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle for host-side tasks such as signal listeners.
    pub fn runtime_handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Cancel the command in flight, close the connection, and wait for the
    /// ingestor to finish. Blocks; safe to call more than once.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.dispatcher.cancel();
        self.runtime.block_on(self.supervisor.stop());
        info!("Telemetry client stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        self.stop();
    }
}
