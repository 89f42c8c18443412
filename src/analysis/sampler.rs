// Frame sampling - occupancy ratio over a full-frame pixel scan
//
// Every pixel is visited (stride 1) in row-major order; the ratio is a pure
// aggregate count, so iteration order cannot affect the result. The frame is
// read, never retained.

use crate::analysis::color::ColorSample;
use crate::config::DetectionConfig;

/// One rasterized video frame as packed RGB bytes, row-major.
#[derive(Debug, Clone)]
pub struct PixelFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelFrame {
    /// Build a frame from packed RGB bytes (3 bytes per pixel).
    ///
    /// Positive dimensions and a matching buffer length are caller
    /// contracts, not recoverable runtime errors.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert!(width > 0 && height > 0, "frame dimensions must be positive");
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "RGB buffer length must be width * height * 3"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Build a frame from packed RGBA bytes (4 bytes per pixel), dropping alpha.
    ///
    /// Platform rasters (canvas readback, camera planes) are usually RGBA.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Self {
        debug_assert_eq!(
            rgba.len(),
            width as usize * height as usize * 4,
            "RGBA buffer length must be width * height * 4"
        );
        let data = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Fill a frame with a single color, for tests and synthetic sources.
    pub fn solid(width: u32, height: u32, rgb: (u8, u8, u8)) -> Self {
        let data = std::iter::repeat([rgb.0, rgb.1, rgb.2])
            .take(width as usize * height as usize)
            .flatten()
            .collect();
        Self::from_rgb(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Iterate pixels as RGB triples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        self.data.chunks_exact(3).map(|px| (px[0], px[1], px[2]))
    }
}

/// Fraction of pixels in the frame that fall inside the detection band.
///
/// Returns a ratio in [0, 1]. This is the only place the classifier touches
/// pixel data; everything downstream sees scalars.
pub fn sample_occupancy(frame: &PixelFrame, config: &DetectionConfig) -> f64 {
    debug_assert!(frame.pixel_count() > 0, "cannot sample an empty frame");

    let matches = frame
        .pixels()
        .filter(|&(r, g, b)| ColorSample::from_rgb(r, g, b).matches(config))
        .count();

    matches as f64 / frame.pixel_count() as f64
}

/// The instantaneous per-frame detection signal.
///
/// A ratio exactly at the threshold counts as a hit (>= comparison), so the
/// configured threshold is the smallest occupancy that still triggers.
pub fn frame_contains_target(ratio: f64, config: &DetectionConfig) -> bool {
    ratio >= config.occupancy_threshold
}
