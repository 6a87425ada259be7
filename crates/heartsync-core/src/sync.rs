//! Tick-side state synchronization
//!
//! [`StateSynchronizer::tick`] runs once per consumer frame. It drains the
//! mailbox without blocking, then advances the pulse and fades the color
//! whether or not a new snapshot arrived, so the visual output keeps moving
//! smoothly between network updates.

use crate::color::Color;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::mailbox::SnapshotMailbox;
use crate::snapshot::TelemetrySnapshot;
use crate::zone::Zone;
use std::sync::Arc;
use std::time::Duration;

/// State the renderer reads each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Heart rate driving the pulse
    pub current_bpm: f32,
    /// Color currently on screen
    pub display_color: Color,
    /// Position within the current beat, in `[0, 1)`
    pub pulse_phase: f32,
}

/// Triangle wave over one beat: 0 at the beat start, 1 at mid-beat.
pub fn pulse_wave(phase: f32) -> f32 {
    let p = phase.rem_euclid(1.0);
    1.0 - (2.0 * p - 1.0).abs()
}

/// Consumer-owned synchronizer. Not shared across threads.
pub struct StateSynchronizer {
    mailbox: Arc<SnapshotMailbox>,
    state: RenderState,
    target_color: Color,
    zone: Zone,
    // Accumulated in f64 so long sessions keep a clean period
    beat_phase: f64,
    color_blend_rate: f32,
    pulse_amplitude: f32,
    snapshots_applied: u64,
}

impl StateSynchronizer {
    pub fn new(mailbox: Arc<SnapshotMailbox>, config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        let default_color = Color::from_hex(&config.default_color)?;
        Ok(Self {
            mailbox,
            state: RenderState {
                current_bpm: config.default_bpm,
                display_color: default_color,
                pulse_phase: 0.0,
            },
            target_color: default_color,
            zone: Zone::Unknown,
            beat_phase: 0.0,
            color_blend_rate: config.color_blend_rate,
            pulse_amplitude: config.pulse_amplitude,
            snapshots_applied: 0,
        })
    }

    /// Advance one consumer tick of length `dt`. Never blocks.
    ///
    /// Returns `true` if a fresh snapshot was applied this tick.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let fresh = match self.mailbox.take() {
            Some(snapshot) => {
                self.apply(&snapshot);
                true
            }
            None => false,
        };

        let dt = dt.as_secs_f64();
        self.advance_pulse(dt);
        self.blend_color(dt as f32);
        fresh
    }

    fn apply(&mut self, snapshot: &TelemetrySnapshot) {
        self.state.current_bpm = snapshot.bpm;
        self.target_color = snapshot.color;
        if snapshot.zone != self.zone {
            tracing::debug!("Zone changed: {} -> {}", self.zone, snapshot.zone);
            self.zone = snapshot.zone;
        }
        self.snapshots_applied += 1;
    }

    fn advance_pulse(&mut self, dt: f64) {
        let beats_per_second = f64::from(self.state.current_bpm) / 60.0;
        self.beat_phase = (self.beat_phase + dt * beats_per_second).rem_euclid(1.0);
        // Narrowing can round 0.99999999 up to 1.0, which is the next beat's start
        let phase = self.beat_phase as f32;
        self.state.pulse_phase = if phase >= 1.0 { 0.0 } else { phase };
    }

    fn blend_color(&mut self, dt: f32) {
        // Exponential smoothing, independent of tick rate
        let factor = 1.0 - (-self.color_blend_rate * dt).exp();
        self.state.display_color = self.state.display_color.blend_toward(self.target_color, factor);
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Scale factor for the pulsing visual, `1.0` at rest.
    pub fn pulse_scale(&self) -> f32 {
        1.0 + self.pulse_amplitude * pulse_wave(self.state.pulse_phase)
    }

    /// Zone of the most recent snapshot.
    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn target_bpm(&self) -> f32 {
        self.state.current_bpm
    }

    pub fn target_color(&self) -> Color {
        self.target_color
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }
}
