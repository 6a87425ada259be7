//! HeartSync Control - Network Synchronization
//!
//! This crate provides the asynchronous half of the telemetry client:
//! - **Ingest**: websocket stream and HTTP poll transports behind one trait
//! - **Supervisor**: connection lifecycle with reconnect delay and clean shutdown
//! - **Command**: debounced, latest-value-wins intensity relay
//! - **Client**: a blocking facade owning the tokio runtime
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use heartsync_control::TelemetryClient;
//! use heartsync_core::ClientConfig;
//! use std::time::Duration;
//!
//! let mut client = TelemetryClient::new(ClientConfig::default()).unwrap();
//! let mut sync = client.synchronizer().unwrap();
//! client.start().unwrap();
//!
//! for _ in 0..600 {
//!     sync.tick(Duration::from_millis(16));
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//! client.stop();
//! ```

#![allow(missing_docs)]

/// Blocking client facade
pub mod client;
/// Outbound intensity commands
pub mod command;
/// Error types
pub mod error;
/// Stream and poll ingestors
pub mod ingest;
/// Connection lifecycle
pub mod supervisor;

// Re-exports
pub use client::TelemetryClient;
pub use command::{intensity_url, CommandDispatcher};
pub use error::{Result, SyncError};
pub use ingest::{Ingestor, PollIngestor, StreamIngestor};
pub use supervisor::{ConnectionState, ConnectionSupervisor, ReconnectPolicy, SupervisorStats};
