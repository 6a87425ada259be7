//! Error types for the network side
use heartsync_core::CoreError;
use std::time::Duration;
use thiserror::Error;

/// Synchronization errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Websocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Service answered with a non-success status
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// No frame within the liveness window
    #[error("Stream silent for {0:?}")]
    Stale(Duration),

    /// `run` called before a successful `connect`
    #[error("Not connected")]
    NotConnected,

    /// Control value that cannot be sent
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Operation attempted after `stop`
    #[error("Client is shut down")]
    Shutdown,

    /// Domain or configuration error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for synchronization operations
pub type Result<T> = std::result::Result<T, SyncError>;
