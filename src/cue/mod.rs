// Cue subsystem: playback trait seam and the single-flight scheduler

pub mod playback;
pub mod scheduler;

pub use playback::{CuePlayer, NullPlayer, PlayerCall, RecordingPlayer};
pub use scheduler::{BlockReason, ChainDecision, CueCategory, CueScheduler, PlayOutcome};
