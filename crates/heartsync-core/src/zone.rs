//! Heart-rate zones as labelled by the metrics service

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physiological intensity band, derived from the fraction of max heart rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Zone {
    /// Below 60% of max HR
    Rest,
    /// 60-70%
    FatBurn,
    /// 70-80%
    Aerobic,
    /// 80-90%
    Anaerobic,
    /// 90% and above
    Vo2Max,
    /// Label missing or not recognized
    #[default]
    Unknown,
}

impl Zone {
    /// All labelled zones, lowest intensity first.
    pub const ALL: [Zone; 5] = [
        Zone::Rest,
        Zone::FatBurn,
        Zone::Aerobic,
        Zone::Anaerobic,
        Zone::Vo2Max,
    ];

    /// Parse the service's label. Matching ignores case and surrounding whitespace.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|zone| zone.label().eq_ignore_ascii_case(label))
            .unwrap_or(Zone::Unknown)
    }

    /// Label as sent on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Zone::Rest => "Rest",
            Zone::FatBurn => "Fat Burn",
            Zone::Aerobic => "Aerobic",
            Zone::Anaerobic => "Anaerobic",
            Zone::Vo2Max => "VO2 Max",
            Zone::Unknown => "Unknown",
        }
    }

    /// Canonical hex color the service assigns to this zone.
    pub fn hex(self) -> &'static str {
        match self {
            Zone::Rest => "#00FF00",
            Zone::FatBurn => "#FFFF00",
            Zone::Aerobic => "#FFA500",
            Zone::Anaerobic => "#FF4500",
            Zone::Vo2Max => "#FF0000",
            Zone::Unknown => "#FFFFFF",
        }
    }

    pub fn color(self) -> Color {
        // The table above only holds valid literals
        Color::from_hex(self.hex()).unwrap_or_default()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
