//! Client configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty or
//! missing file yields a client that talks to a service on localhost.

use crate::color::Color;
use crate::error::{CoreError, Result};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How snapshots are fetched from the metrics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Persistent websocket carrying one JSON snapshot per text frame
    #[default]
    Stream,
    /// Periodic HTTP GET of the metrics route
    Poll,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "ws" | "websocket" => Ok(Self::Stream),
            "poll" | "http" => Ok(Self::Poll),
            other => Err(CoreError::Config(format!("Unknown transport: {}", other))),
        }
    }
}

/// Tick-side smoothing and pulse settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Heart rate shown before the first snapshot arrives
    pub default_bpm: f32,
    /// Color shown before the first snapshot arrives
    pub default_color: String,
    /// Color smoothing rate per second; higher fades faster
    pub color_blend_rate: f32,
    /// Peak scale offset of the pulse (0.2 = grows to 120%)
    pub pulse_amplitude: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_bpm: 60.0,
            default_color: "#FFFFFF".to_string(),
            color_blend_rate: 4.0,
            pulse_amplitude: 0.2,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.default_bpm.is_finite() || self.default_bpm <= 0.0 {
            return Err(CoreError::Config(format!(
                "default_bpm must be positive, got {}",
                self.default_bpm
            )));
        }
        if !self.color_blend_rate.is_finite() || self.color_blend_rate < 0.0 {
            return Err(CoreError::Config(format!(
                "color_blend_rate must be >= 0, got {}",
                self.color_blend_rate
            )));
        }
        if !self.pulse_amplitude.is_finite() {
            return Err(CoreError::Config("pulse_amplitude must be finite".to_string()));
        }
        Color::from_hex(&self.default_color)
            .map_err(|e| CoreError::Config(format!("default_color: {}", e)))?;
        Ok(())
    }
}

/// Full client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Active ingestion transport
    pub transport: Transport,
    /// Websocket endpoint for the stream transport
    pub stream_url: String,
    /// Metrics route for the poll transport
    pub metrics_url: String,
    /// Base URL of the command routes (`/set_intensity/{value}` is appended)
    pub command_url: String,
    /// Poll cycle length
    pub poll_interval_ms: u64,
    /// Timeout for a single HTTP request
    pub request_timeout_ms: u64,
    /// Wait after a disconnect before reconnecting
    pub reconnect_delay_ms: u64,
    /// Upper bound for the reconnect delay when backoff grows it
    pub max_reconnect_delay_ms: u64,
    /// Growth factor per failed attempt; 1.0 keeps the delay fixed
    pub backoff_multiplier: f64,
    /// Reconnect if the stream is silent this long (0 disables)
    pub liveness_timeout_ms: u64,
    /// Quiet period before an intensity change is sent
    pub command_debounce_ms: u64,
    /// Consumer tick rate
    pub tick_rate_hz: u32,
    /// Smoothing and pulse settings
    pub sync: SyncConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stream,
            stream_url: "ws://localhost:8000/ws".to_string(),
            metrics_url: "http://localhost:8000/metrics".to_string(),
            command_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 500,
            request_timeout_ms: 2000,
            reconnect_delay_ms: 500,
            max_reconnect_delay_ms: 500,
            backoff_multiplier: 1.0,
            liveness_timeout_ms: 15_000,
            command_debounce_ms: 50,
            tick_rate_hz: 60,
            sync: SyncConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// `<config dir>/HeartSync/config.toml`, or the working directory when
    /// the platform has no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("HeartSync")
            .join("config.toml")
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("reconnect_delay_ms", self.reconnect_delay_ms),
            ("tick_rate_hz", u64::from(self.tick_rate_hz)),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CoreError::Config(format!("{} must be greater than 0", name)));
            }
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(CoreError::Config(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        let endpoint = match self.transport {
            Transport::Stream => ("stream_url", &self.stream_url),
            Transport::Poll => ("metrics_url", &self.metrics_url),
        };
        for (name, url) in [endpoint, ("command_url", &self.command_url)] {
            if url.trim().is_empty() {
                return Err(CoreError::Config(format!("{} is empty", name)));
            }
        }
        self.sync.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Never shorter than the base reconnect delay.
    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms.max(self.reconnect_delay_ms))
    }

    pub fn liveness_timeout(&self) -> Option<Duration> {
        (self.liveness_timeout_ms > 0).then(|| Duration::from_millis(self.liveness_timeout_ms))
    }

    pub fn command_debounce(&self) -> Duration {
        Duration::from_millis(self.command_debounce_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}
