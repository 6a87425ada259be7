//! Error types for the core domain
use thiserror::Error;

/// Core errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Payload was not a JSON object of the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Color string was not `#RRGGBB` (or `#RGB`)
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Heart rate that cannot drive a pulse
    #[error("Invalid bpm: {0}")]
    InvalidBpm(f32),

    /// Configuration could not be parsed or failed validation
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
