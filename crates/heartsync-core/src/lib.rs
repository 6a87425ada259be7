//! HeartSync Core - Telemetry Domain Model
//!
//! This crate contains the runtime-free half of the telemetry client:
//! - Snapshot decoding from the metrics service's JSON payloads
//! - Heart-rate zones and display colors
//! - The single-slot mailbox handing snapshots to the consumer tick
//! - The state synchronizer that turns snapshots into render state
//! - Client and logging configuration
//!
//! Nothing here blocks or performs network I/O; the async side lives in
//! `heartsync-control`.

#![allow(missing_docs)]

pub mod color;
pub mod config;
pub mod error;
pub mod logging;
pub mod mailbox;
pub mod snapshot;
pub mod sync;
pub mod zone;

// --- Re-exports grouped by category ---

// Snapshots & Handoff
pub use mailbox::{MailboxStats, SnapshotMailbox};
pub use snapshot::TelemetrySnapshot;

// Rendering State
pub use color::Color;
pub use sync::{pulse_wave, RenderState, StateSynchronizer};
pub use zone::Zone;

// Configuration
pub use config::{ClientConfig, SyncConfig, Transport};
pub use logging::LogConfig;

pub use error::{CoreError, Result};
