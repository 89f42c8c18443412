// Cue playback error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Cue error code constants
///
/// Error code range: 2001-2002
pub struct CueErrorCodes {}

impl CueErrorCodes {
    /// Audio track failed to start or aborted mid-play
    pub const PLAYBACK_FAILED: i32 = 2001;

    /// A cue category has an empty track list
    pub const NO_TRACKS_CONFIGURED: i32 = 2002;
}

/// Log a cue error with structured context
pub fn log_cue_error(err: &CueError, context: &str) {
    error!(
        "Cue error in {}: code={}, component=CueScheduler, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Cue playback errors
///
/// Playback failures release the audio lock and are never retried; the
/// chain is not re-armed. Blocked requests (cooldown, gesture gate,
/// stopped scheduler) are ordinary outcomes, not errors.
///
/// Error code range: 2001-2002
#[derive(Debug, Clone, PartialEq)]
pub enum CueError {
    /// Audio track failed to start or aborted mid-play
    PlaybackFailed { track: String, reason: String },

    /// A cue category has an empty track list
    NoTracksConfigured { category: String },
}

impl ErrorCode for CueError {
    fn code(&self) -> i32 {
        match self {
            CueError::PlaybackFailed { .. } => CueErrorCodes::PLAYBACK_FAILED,
            CueError::NoTracksConfigured { .. } => CueErrorCodes::NO_TRACKS_CONFIGURED,
        }
    }

    fn message(&self) -> String {
        match self {
            CueError::PlaybackFailed { track, reason } => {
                format!("Playback of '{}' failed: {}", track, reason)
            }
            CueError::NoTracksConfigured { category } => {
                format!("No tracks configured for the {} cue category", category)
            }
        }
    }
}

impl fmt::Display for CueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CueError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for CueError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_error_codes() {
        assert_eq!(
            CueError::PlaybackFailed {
                track: "a.mp3".to_string(),
                reason: "decoder".to_string()
            }
            .code(),
            CueErrorCodes::PLAYBACK_FAILED
        );
        assert_eq!(
            CueError::NoTracksConfigured {
                category: "positive".to_string()
            }
            .code(),
            CueErrorCodes::NO_TRACKS_CONFIGURED
        );
    }

    #[test]
    fn test_display_includes_track() {
        let err = CueError::PlaybackFailed {
            track: "assets/chug.mp3".to_string(),
            reason: "not found".to_string(),
        };
        assert!(err.to_string().contains("assets/chug.mp3"));
    }
}
