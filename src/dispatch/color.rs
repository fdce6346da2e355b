//! Hue/saturation/brightness to RGB conversion

use serde::{Deserialize, Serialize};

use crate::hub::Rgb;

/// Colour as sent by `SetColor`: hue in degrees, saturation and brightness in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl Hsb {
    /// RGB for the given brightness level
    #[must_use]
    pub fn to_rgb_at(self, brightness: f64) -> Rgb {
        hsb_to_rgb(self.hue, self.saturation, brightness)
    }

    /// Hue and saturation only, at full brightness
    ///
    /// The hub keeps its own dim level, so colour writes leave brightness out.
    #[must_use]
    pub fn chroma(self) -> Rgb {
        self.to_rgb_at(1.0)
    }
}

/// Convert HSB to 8-bit RGB
#[must_use]
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Rgb {
    let hue = hue.rem_euclid(360.0);
    let saturation = saturation.clamp(0.0, 1.0);
    let value = brightness.clamp(0.0, 1.0);

    let chroma = value * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let m = value - chroma;

    let (r, g, b) = match sector {
        s if s < 1.0 => (chroma, x, 0.0),
        s if s < 2.0 => (x, chroma, 0.0),
        s if s < 3.0 => (0.0, chroma, x),
        s if s < 4.0 => (0.0, x, chroma),
        s if s < 5.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    Rgb {
        r: channel(r + m),
        g: channel(g + m),
        b: channel(b + m),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(fraction: f64) -> u8 {
    (fraction * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }

    #[test]
    fn test_primaries() {
        assert_eq!(hsb_to_rgb(0.0, 1.0, 1.0), rgb(255, 0, 0));
        assert_eq!(hsb_to_rgb(120.0, 1.0, 1.0), rgb(0, 255, 0));
        assert_eq!(hsb_to_rgb(240.0, 1.0, 1.0), rgb(0, 0, 255));
        assert_eq!(hsb_to_rgb(60.0, 1.0, 1.0), rgb(255, 255, 0));
        assert_eq!(hsb_to_rgb(360.0, 1.0, 1.0), rgb(255, 0, 0));
    }

    #[test]
    fn test_white_and_black() {
        assert_eq!(hsb_to_rgb(200.0, 0.0, 1.0), rgb(255, 255, 255));
        assert_eq!(hsb_to_rgb(200.0, 1.0, 0.0), rgb(0, 0, 0));
    }

    #[test]
    fn test_chroma_ignores_brightness() {
        let dim_red = Hsb {
            hue: 0.0,
            saturation: 1.0,
            brightness: 0.2,
        };
        assert_eq!(dim_red.chroma(), rgb(255, 0, 0));
        assert_eq!(dim_red.to_rgb_at(0.2), rgb(51, 0, 0));
        assert_eq!(dim_red.chroma().to_hex(), "ff0000");
    }

    #[test]
    fn test_pastel() {
        // 50% saturation orange
        assert_eq!(hsb_to_rgb(30.0, 0.5, 1.0), rgb(255, 191, 128));
    }
}
