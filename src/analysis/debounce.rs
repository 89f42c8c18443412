// Detection state machine - time-debounced stabilization of the per-frame signal
//
// The raw per-frame signal flickers with sampling noise; an accepted state
// change starts a cooldown window during which every flip is ignored, which
// bounds both the flicker rate and the worst-case reaction latency.

use serde::{Deserialize, Serialize};

/// Stable detection state, `Unset` until the first classified frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionState {
    Unset,
    Negative { since_ms: u64 },
    Positive { since_ms: u64 },
}

impl DetectionState {
    /// The boolean polarity of a settled state, None while `Unset`.
    pub fn signal(&self) -> Option<bool> {
        match self {
            DetectionState::Unset => None,
            DetectionState::Negative { .. } => Some(false),
            DetectionState::Positive { .. } => Some(true),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, DetectionState::Positive { .. })
    }
}

/// Emitted exactly once per accepted state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub state: DetectionState,
    pub timestamp_ms: u64,
}

/// Debounces the instantaneous signal into stable state transitions.
#[derive(Debug)]
pub struct DetectionDebouncer {
    state: DetectionState,
    cooldown_ms: u64,
}

impl DetectionDebouncer {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            state: DetectionState::Unset,
            cooldown_ms,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Reset to `Unset` (e.g. when the frame source is re-opened)
    pub fn reset(&mut self) {
        self.state = DetectionState::Unset;
    }

    /// Feed one tick's instantaneous signal.
    ///
    /// Inside the cooldown window no transition is considered, whatever the
    /// signal says. Once the window has elapsed a differing signal flips the
    /// state and emits exactly one `StateChange`; an agreeing signal emits
    /// nothing. The first classified frame always settles the state.
    pub fn update(&mut self, now_ms: u64, signal: bool) -> Option<StateChange> {
        match self.state.signal() {
            None => Some(self.transition(now_ms, signal)),
            Some(stable) => {
                let since = match self.state {
                    DetectionState::Negative { since_ms } | DetectionState::Positive { since_ms } => {
                        since_ms
                    }
                    DetectionState::Unset => unreachable!("signal() returned Some for Unset"),
                };
                if now_ms.saturating_sub(since) < self.cooldown_ms {
                    return None;
                }
                if signal != stable {
                    Some(self.transition(now_ms, signal))
                } else {
                    None
                }
            }
        }
    }

    fn transition(&mut self, now_ms: u64, signal: bool) -> StateChange {
        self.state = if signal {
            DetectionState::Positive { since_ms: now_ms }
        } else {
            DetectionState::Negative { since_ms: now_ms }
        };
        log::debug!(
            "[Debounce] state -> {:?} at {} ms",
            self.state.signal(),
            now_ms
        );
        StateChange {
            state: self.state,
            timestamp_ms: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: u64 = 1000;

    #[test]
    fn test_first_frame_settles_state_immediately() {
        let mut debouncer = DetectionDebouncer::new(COOLDOWN);
        let change = debouncer.update(0, true).expect("first frame must settle");
        assert_eq!(change.state, DetectionState::Positive { since_ms: 0 });
        assert!(debouncer.state().is_positive());
    }

    #[test]
    fn test_flips_inside_cooldown_emit_nothing() {
        let mut debouncer = DetectionDebouncer::new(COOLDOWN);
        debouncer.update(0, true).unwrap();

        // Two flips well inside the window: zero events
        assert!(debouncer.update(200, false).is_none());
        assert!(debouncer.update(600, false).is_none());
        assert!(debouncer.state().is_positive());
    }

    #[test]
    fn test_flip_at_exactly_cooldown_emits_once() {
        let mut debouncer = DetectionDebouncer::new(COOLDOWN);
        debouncer.update(0, true).unwrap();

        let change = debouncer
            .update(COOLDOWN, false)
            .expect("flip at exactly cooldown must be accepted");
        assert_eq!(change.state, DetectionState::Negative { since_ms: COOLDOWN });

        // The window restarts from the accepted change
        assert!(debouncer.update(COOLDOWN + 500, true).is_none());
    }

    #[test]
    fn test_agreeing_signal_after_cooldown_emits_nothing() {
        let mut debouncer = DetectionDebouncer::new(COOLDOWN);
        debouncer.update(0, true).unwrap();
        assert!(debouncer.update(5000, true).is_none());
    }

    #[test]
    fn test_each_accepted_flip_emits_exactly_one_event() {
        let mut debouncer = DetectionDebouncer::new(COOLDOWN);
        let mut events = 0;
        let signals = [true, true, false, false, true, true];
        for (i, &sig) in signals.iter().enumerate() {
            // One tick every 1100 ms: every differing signal lands outside
            // the cooldown window
            if debouncer.update(i as u64 * 1100, sig).is_some() {
                events += 1;
            }
        }
        // Unset->P, P->N, N->P
        assert_eq!(events, 3);
    }

    #[test]
    fn test_reset_returns_to_unset() {
        let mut debouncer = DetectionDebouncer::new(COOLDOWN);
        debouncer.update(0, true).unwrap();
        debouncer.reset();
        assert_eq!(debouncer.state(), DetectionState::Unset);
        assert!(debouncer.update(1, false).is_some());
    }
}
