// Color classification - RGB to HSV conversion and target-band matching
//
// Pure, total functions over 8-bit channel triples. Hue uses the standard
// six-sector formula; saturation and brightness are reported on the 0-100
// scale the band bounds are written in.

use crate::config::DetectionConfig;

/// A pixel converted to the perceptual space the detection band is defined in.
///
/// hue in degrees [0, 360), saturation and brightness in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub hue: f32,
    pub saturation: f32,
    pub brightness: f32,
}

impl ColorSample {
    /// Convert an RGB triple to HSV.
    ///
    /// Achromatic input (all channels equal) yields hue 0 and saturation 0.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r = r as f32 / 255.0;
        let g = g as f32 / 255.0;
        let b = b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let saturation = if max == 0.0 { 0.0 } else { delta / max };

        let mut hue = 0.0;
        if delta != 0.0 {
            hue = if max == r {
                (g - b) / delta + if g < b { 6.0 } else { 0.0 }
            } else if max == g {
                (b - r) / delta + 2.0
            } else {
                (r - g) / delta + 4.0
            };
            hue *= 60.0;
        }

        Self {
            hue,
            saturation: saturation * 100.0,
            brightness: max * 100.0,
        }
    }

    /// Test this sample against the configured hue/saturation/brightness band.
    ///
    /// When `hue_min > hue_max` the band wraps past the 0°/360° seam and the
    /// hue test becomes `hue >= hue_min OR hue <= hue_max`.
    pub fn matches(&self, config: &DetectionConfig) -> bool {
        let hue_in_band = if config.hue_min <= config.hue_max {
            self.hue >= config.hue_min && self.hue <= config.hue_max
        } else {
            self.hue >= config.hue_min || self.hue <= config.hue_max
        };

        hue_in_band
            && self.saturation >= config.saturation_min
            && self.brightness >= config.brightness_min
    }
}
