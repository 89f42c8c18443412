//! Single-flight cue scheduler
//!
//! One logical lock covers both cue categories: at most one notification
//! track is ever audible. New requests interrupt the active track rather
//! than queueing behind it, a shared cooldown spaces out cue starts across
//! categories, and positive picks avoid repeating the previous positive
//! pick. When a track finishes while its triggering state still holds, the
//! scheduler asks for a replay after a short settle delay instead of
//! starting playback from inside the completion callback; the session tick
//! loop carries out the decision, which keeps the timing policy testable
//! without real audio.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::DetectionState;
use crate::config::CueConfig;
use crate::cue::playback::CuePlayer;
use crate::error::{log_cue_error, CueError};

/// The two mutually exclusive cue categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueCategory {
    Positive,
    Negative,
}

impl CueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueCategory::Positive => "positive",
            CueCategory::Negative => "negative",
        }
    }

    /// Whether the given stable state is the one this category cues for.
    pub fn triggered_by(&self, state: DetectionState) -> bool {
        match self {
            CueCategory::Positive => state.signal() == Some(true),
            CueCategory::Negative => state.signal() == Some(false),
        }
    }
}

/// Why a non-forced request did not start playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// stop() was called; terminal for the session
    Stopped,
    /// No user gesture has unlocked audio yet
    AwaitingUserGesture,
    /// The shared cooldown since the last cue start has not elapsed
    CooldownActive { remaining_ms: u64 },
}

/// Result of a play request. Blocked requests are ordinary outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    Started { track: String },
    Blocked(BlockReason),
}

/// What to do after a track finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDecision {
    /// Re-request the same category with force after the settle delay
    Replay {
        category: CueCategory,
        delay_ms: u64,
    },
    Idle,
}

#[derive(Debug, Clone)]
struct ActiveCue {
    category: CueCategory,
    track: String,
}

/// Serializes cue playback behind one logical audio lock.
pub struct CueScheduler {
    config: CueConfig,
    active: Option<ActiveCue>,
    last_start_ms: Option<u64>,
    last_positive_index: Option<usize>,
    gesture_ready: bool,
    stopped: bool,
    rng: StdRng,
}

impl CueScheduler {
    pub fn new(config: CueConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic construction for tests.
    pub fn with_seed(config: CueConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: CueConfig, rng: StdRng) -> Self {
        Self {
            config,
            active: None,
            last_start_ms: None,
            last_positive_index: None,
            gesture_ready: false,
            stopped: false,
            rng,
        }
    }

    /// One-way unlock, set on the first user gesture.
    pub fn mark_user_gesture(&mut self) {
        self.gesture_ready = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Track currently holding the lock, if any.
    pub fn active_track(&self) -> Option<&str> {
        self.active.as_ref().map(|cue| cue.track.as_str())
    }

    /// Request playback of a cue from the given category.
    ///
    /// Without `force` the request passes the gesture gate and the shared
    /// cooldown; a chained replay passes `force` and skips both. Either
    /// way the active track, if any, is interrupted before the new one
    /// starts, so at most one cue is ever audible.
    pub fn request_play(
        &mut self,
        category: CueCategory,
        force: bool,
        now_ms: u64,
        player: &dyn CuePlayer,
    ) -> Result<PlayOutcome, CueError> {
        if self.stopped {
            return Ok(PlayOutcome::Blocked(BlockReason::Stopped));
        }

        if !force {
            if !self.gesture_ready {
                log::warn!("[CueScheduler] audio not ready: waiting for user gesture");
                return Ok(PlayOutcome::Blocked(BlockReason::AwaitingUserGesture));
            }
            if let Some(last) = self.last_start_ms {
                let elapsed = now_ms.saturating_sub(last);
                if elapsed < self.config.global_cooldown_ms {
                    log::debug!("[CueScheduler] blocked by global cooldown");
                    return Ok(PlayOutcome::Blocked(BlockReason::CooldownActive {
                        remaining_ms: self.config.global_cooldown_ms - elapsed,
                    }));
                }
            }
        }

        // Interrupt, never queue
        if let Some(active) = self.active.take() {
            log::debug!("[CueScheduler] interrupting '{}'", active.track);
            player.stop(&active.track);
        }

        let track = self.pick_track(category)?;

        // Take the lock before attempting playback so a re-entrant request
        // observes the system as busy
        self.active = Some(ActiveCue {
            category,
            track: track.clone(),
        });
        log::info!("[CueScheduler] starting {} cue '{}'", category.as_str(), track);

        match player.start(&track, self.config.volume) {
            Ok(()) => {
                self.last_start_ms = Some(now_ms);
                Ok(PlayOutcome::Started { track })
            }
            Err(err) => {
                self.active = None;
                log_cue_error(&err, "request_play");
                Err(err)
            }
        }
    }

    /// A track finished on its own. Clears the lock and decides whether
    /// the category should chain.
    ///
    /// Stale completions (for a track that was already interrupted) leave
    /// the current lock holder alone.
    pub fn on_playback_ended(&mut self, track: &str, stable_state: DetectionState) -> ChainDecision {
        let finished = match self.active.take() {
            Some(cue) if cue.track == track => cue,
            other => {
                self.active = other;
                return ChainDecision::Idle;
            }
        };
        log::debug!("[CueScheduler] '{}' finished", finished.track);

        if !self.stopped && self.gesture_ready && finished.category.triggered_by(stable_state) {
            ChainDecision::Replay {
                category: finished.category,
                delay_ms: self.config.chain_delay_ms,
            }
        } else {
            ChainDecision::Idle
        }
    }

    /// A track failed mid-play. Clears the lock; the chain is not re-armed.
    pub fn on_playback_error(&mut self, track: &str) {
        let holds_lock = self
            .active
            .as_ref()
            .map(|cue| cue.track == track)
            .unwrap_or(false);
        if holds_lock {
            self.active = None;
            log::warn!("[CueScheduler] playback error on '{}', lock released", track);
        }
    }

    /// Terminal stop: silences the active track and rejects everything
    /// from here on, forced requests included.
    pub fn stop(&mut self, player: &dyn CuePlayer) {
        self.stopped = true;
        if let Some(active) = self.active.take() {
            player.stop(&active.track);
        }
    }

    fn pick_track(&mut self, category: CueCategory) -> Result<String, CueError> {
        let len = match category {
            CueCategory::Positive => self.config.positive_tracks.len(),
            CueCategory::Negative => self.config.negative_tracks.len(),
        };
        if len == 0 {
            return Err(CueError::NoTracksConfigured {
                category: category.as_str().to_string(),
            });
        }

        let index = match category {
            CueCategory::Positive => {
                // Avoid repeating the previous positive pick when there is a choice
                let mut index = self.rng.gen_range(0..len);
                while len > 1 && Some(index) == self.last_positive_index {
                    index = self.rng.gen_range(0..len);
                }
                self.last_positive_index = Some(index);
                index
            }
            CueCategory::Negative => self.rng.gen_range(0..len),
        };

        let track = match category {
            CueCategory::Positive => &self.config.positive_tracks[index],
            CueCategory::Negative => &self.config.negative_tracks[index],
        };
        Ok(track.clone())
    }
}
