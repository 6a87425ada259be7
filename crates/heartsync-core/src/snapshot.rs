//! Telemetry snapshots and their JSON wire format
//!
//! The metrics service sends one JSON object per reading:
//!
//! ```json
//! {"bpm": 142.3, "trimp": 12.51, "hrr": 0.0, "zone": "Anaerobic", "color": "#FF4500"}
//! ```
//!
//! Only `bpm` and `color` are required. Unknown fields are ignored so the
//! service can grow its payload without breaking older clients.

use crate::color::Color;
use crate::error::{CoreError, Result};
use crate::zone::Zone;
use serde::Deserialize;

/// Payload as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireSnapshot {
    bpm: f32,
    color: String,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    trimp: Option<f32>,
    #[serde(default)]
    hrr: Option<f32>,
    #[serde(default)]
    intensity: Option<f32>,
    #[serde(default)]
    time: Option<serde_json::Value>,
}

/// One immutable measurement reading.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// Heart rate in beats per minute (finite, > 0)
    pub bpm: f32,
    /// Cumulative training impulse, if reported
    pub training_load: Option<f32>,
    /// Heart-rate recovery score, if reported
    pub recovery_metric: Option<f32>,
    /// Workload the service is simulating, if reported
    pub intensity: Option<f32>,
    /// Zone label exactly as sent (empty when absent)
    pub zone_label: String,
    /// Zone parsed from the label
    pub zone: Zone,
    /// Decoded zone color
    pub color: Color,
    /// Service timestamp, passed through untouched
    pub time: Option<serde_json::Value>,
}

impl TelemetrySnapshot {
    /// Decode one text payload.
    ///
    /// Fails when the text is not a JSON object, `bpm` or `color` is missing,
    /// `bpm` is not a positive finite number, or `color` is not a hex color.
    pub fn from_json(text: &str) -> Result<Self> {
        let wire: WireSnapshot = serde_json::from_str(text)?;

        if !wire.bpm.is_finite() || wire.bpm <= 0.0 {
            return Err(CoreError::InvalidBpm(wire.bpm));
        }
        let color = Color::from_hex(&wire.color)?;
        let zone_label = wire.zone.unwrap_or_default();

        Ok(Self {
            bpm: wire.bpm,
            training_load: wire.trimp,
            recovery_metric: wire.hrr,
            intensity: wire.intensity,
            zone: Zone::from_label(&zone_label),
            zone_label,
            color,
            time: wire.time,
        })
    }

    /// Build a snapshot directly, bypassing the wire format.
    pub fn new(bpm: f32, zone: Zone, color: Color) -> Self {
        Self {
            bpm,
            training_load: None,
            recovery_metric: None,
            intensity: None,
            zone_label: zone.label().to_string(),
            zone,
            color,
            time: None,
        }
    }
}
