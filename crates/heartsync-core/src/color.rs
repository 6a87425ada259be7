//! Display colors
//!
//! Colors arrive as `#RRGGBB` strings and are kept in linear RGB so that
//! blending between zone colors fades evenly instead of darkening midway.

use crate::error::{CoreError, Result};
use palette::{LinSrgb, Mix, Srgb};
use std::fmt;
use std::str::FromStr;

/// A display color in linear RGB space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(LinSrgb);

impl Color {
    /// Opaque white, used before any snapshot has arrived.
    pub fn white() -> Self {
        Self(LinSrgb::new(1.0, 1.0, 1.0))
    }

    /// Parse a hex color such as `#FF4500`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let srgb = Srgb::<u8>::from_str(hex.trim())
            .map_err(|e| CoreError::InvalidColor(format!("{:?}: {}", hex, e)))?;
        Ok(Self(srgb.into_format::<f32>().into_linear()))
    }

    /// Build a color from 8-bit sRGB channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self(Srgb::new(r, g, b).into_format::<f32>().into_linear())
    }

    /// Gamma-encoded channels in `0.0..=1.0`, as a renderer expects them.
    pub fn to_srgb(self) -> Srgb {
        Srgb::from_linear(self.0)
    }

    /// Gamma-encoded 8-bit channels.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let c: Srgb<u8> = self.to_srgb().into_format();
        (c.red, c.green, c.blue)
    }

    /// Uppercase `#RRGGBB` form.
    pub fn to_hex(self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Move toward `target` by `factor` (clamped to `0.0..=1.0`).
    ///
    /// A factor of zero or a target equal to `self` returns `self` unchanged.
    pub fn blend_toward(self, target: Color, factor: f32) -> Color {
        Color(self.0.mix(target.0, factor.clamp(0.0, 1.0)))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

impl FromStr for Color {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_with_and_without_hash() {
        let a = Color::from_hex("#FF4500").unwrap();
        let b = Color::from_hex("ff4500").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_rgb8(), (0xFF, 0x45, 0x00));
        assert_eq!(a.to_hex(), "#FF4500");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Color::from_hex("#GG0000"),
            Err(CoreError::InvalidColor(_))
        ));
        assert!(Color::from_hex("").is_err());
        assert!(Color::from_hex("#12345").is_err());
    }

    #[test]
    fn test_blend_endpoints() {
        let red = Color::from_rgb8(255, 0, 0);
        let green = Color::from_rgb8(0, 255, 0);

        assert_eq!(red.blend_toward(green, 0.0), red);
        assert_eq!(red.blend_toward(green, 1.0).to_rgb8(), (0, 255, 0));
        // Out-of-range factors are clamped
        assert_eq!(red.blend_toward(green, 7.0).to_rgb8(), (0, 255, 0));
    }

    #[test]
    fn test_blend_at_equilibrium_is_identity() {
        let orange = Color::from_hex("#FFA500").unwrap();
        for factor in [0.0, 0.01, 0.5, 0.99, 1.0] {
            assert_eq!(orange.blend_toward(orange, factor), orange);
        }
    }

    #[test]
    fn test_default_is_white() {
        assert_eq!(Color::default().to_hex(), "#FFFFFF");
    }
}
