//! Score accumulation - continuous reward/penalty integration
//!
//! The score integrates the *instantaneous* per-frame signal over wall-clock
//! time, deliberately bypassing the debounced state: the displayed score
//! reacts immediately while audio cues wait for a stable transition. The
//! per-tick dt is clamped so a frame hitch or a suspended tab cannot dump a
//! large jump into the total.

use crate::config::ScoringConfig;

/// Elapsed-time-weighted score, floor-clamped at zero.
///
/// The internal accumulator keeps full precision; only the display value is
/// rounded.
#[derive(Debug)]
pub struct ScoreAccumulator {
    value: f64,
    config: ScoringConfig,
}

impl ScoreAccumulator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { value: 0.0, config }
    }

    /// Integrate one tick.
    ///
    /// `dt_secs` is the wall-clock delta since the previous tick; it is
    /// clamped to `max_frame_dt_secs` and floored at zero before use.
    pub fn integrate(&mut self, dt_secs: f64, detected: bool) {
        let dt = dt_secs.clamp(0.0, self.config.max_frame_dt_secs);
        let rate = if detected {
            self.config.points_per_second_detected
        } else {
            -self.config.points_per_second_missing
        };
        self.value = (self.value + rate * dt).max(0.0);
    }

    /// Full-precision accumulator value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Rounded value for display.
    pub fn display(&self) -> i64 {
        self.value.round() as i64
    }
}
