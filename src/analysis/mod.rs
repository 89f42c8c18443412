// Frame analysis pipeline
//
// Leaf-to-root: color.rs converts pixels into the perceptual space the
// detection band lives in, sampler.rs aggregates a whole frame into an
// occupancy ratio, debounce.rs stabilizes the resulting boolean signal into
// state transitions. Everything here is synchronous and side-effect free.

pub mod color;
pub mod debounce;
pub mod sampler;

pub use color::ColorSample;
pub use debounce::{DetectionDebouncer, DetectionState, StateChange};
pub use sampler::{frame_contains_target, sample_occupancy, PixelFrame};

/// What one processed frame looked like: the ratio and the signal derived
/// from it. Recomputed every tick, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAssessment {
    pub ratio: f64,
    pub detected: bool,
}

impl FrameAssessment {
    /// Run the sampler and threshold over one frame.
    pub fn assess(frame: &PixelFrame, config: &crate::config::DetectionConfig) -> Self {
        let ratio = sample_occupancy(frame, config);
        Self {
            ratio,
            detected: frame_contains_target(ratio, config),
        }
    }
}
