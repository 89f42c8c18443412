//! Frame source seam
//!
//! Any platform able to expose a raw RGB raster satisfies this contract;
//! canvas readback, a camera pipeline, or a decoded still all look the
//! same from here. Two in-crate sources cover the CLI and tests.

use std::collections::VecDeque;

use crate::analysis::PixelFrame;
use crate::error::DetectorError;

/// Result of polling the source on one tick.
#[derive(Debug, Clone)]
pub enum FramePoll {
    /// A rasterized frame ready for classification
    Frame(PixelFrame),
    /// The source is opened but not producing frames yet; the tick is a
    /// no-op, not an error
    NotReady,
}

/// Trait implemented by platform frame providers.
pub trait FrameSource: Send {
    /// Acquire the underlying device. Unavailability (permission refused,
    /// no device) maps to `DetectorError::PermissionDenied`.
    fn open(&mut self) -> Result<(), DetectorError>;

    /// Fetch the current frame, if one is available.
    fn poll(&mut self) -> FramePoll;
}

/// Source that repeats a single frame forever; used by the CLI to run the
/// pipeline over a decoded still image.
pub struct StaticFrameSource {
    frame: PixelFrame,
}

impl StaticFrameSource {
    pub fn new(frame: PixelFrame) -> Self {
        Self { frame }
    }
}

impl FrameSource for StaticFrameSource {
    fn open(&mut self) -> Result<(), DetectorError> {
        Ok(())
    }

    fn poll(&mut self) -> FramePoll {
        FramePoll::Frame(self.frame.clone())
    }
}

/// Source that plays back a fixed step sequence, then reports NotReady;
/// `None` steps model warm-up ticks before the device produces frames.
pub struct ScriptedFrameSource {
    steps: VecDeque<Option<PixelFrame>>,
    fail_open: bool,
}

impl ScriptedFrameSource {
    pub fn new(steps: Vec<Option<PixelFrame>>) -> Self {
        Self {
            steps: steps.into(),
            fail_open: false,
        }
    }

    /// Make `open` fail with `PermissionDenied`.
    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

impl FrameSource for ScriptedFrameSource {
    fn open(&mut self) -> Result<(), DetectorError> {
        if self.fail_open {
            return Err(DetectorError::PermissionDenied);
        }
        Ok(())
    }

    fn poll(&mut self) -> FramePoll {
        match self.steps.pop_front() {
            Some(Some(frame)) => FramePoll::Frame(frame),
            Some(None) => FramePoll::NotReady,
            None => FramePoll::NotReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_repeats_frame() {
        let mut source = StaticFrameSource::new(PixelFrame::solid(2, 2, (1, 2, 3)));
        source.open().unwrap();
        for _ in 0..3 {
            assert!(matches!(source.poll(), FramePoll::Frame(_)));
        }
    }

    #[test]
    fn test_scripted_source_plays_steps_then_dries_up() {
        let mut source = ScriptedFrameSource::new(vec![
            None,
            Some(PixelFrame::solid(2, 2, (0, 0, 255))),
        ]);
        source.open().unwrap();
        assert!(matches!(source.poll(), FramePoll::NotReady));
        assert!(matches!(source.poll(), FramePoll::Frame(_)));
        assert!(matches!(source.poll(), FramePoll::NotReady));
    }

    #[test]
    fn test_open_failure_maps_to_permission_denied() {
        let mut source = ScriptedFrameSource::new(vec![]).with_open_failure();
        assert_eq!(source.open(), Err(DetectorError::PermissionDenied));
    }
}
