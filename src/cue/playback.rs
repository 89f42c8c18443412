//! Playback backend seam
//!
//! Real audio output is a platform concern; the scheduler only needs a
//! start/stop pair keyed by track identifier. Completion and error events
//! flow back through the session's `on_playback_ended`/`on_playback_error`
//! entry points, not through this trait.
//!
//! Two stub players ship with the crate so the scheduler and the CLI can
//! run without audio hardware, mirroring how the engine is tested on
//! machines without a microphone.

use std::sync::Mutex;

use crate::error::CueError;

/// Trait implemented by platform audio players.
pub trait CuePlayer: Send + Sync {
    /// Begin playback of a track. Returns an error when the track cannot
    /// start; the scheduler releases its lock and does not retry.
    fn start(&self, track: &str, volume: f32) -> Result<(), CueError>;

    /// Silence a track immediately. Must be safe to call for a track that
    /// already finished.
    fn stop(&self, track: &str);
}

/// Player that only logs; used by the CLI simulate harness.
#[derive(Debug, Default)]
pub struct NullPlayer {}

impl NullPlayer {
    pub fn new() -> Self {
        Self {}
    }
}

impl CuePlayer for NullPlayer {
    fn start(&self, track: &str, volume: f32) -> Result<(), CueError> {
        log::info!("[NullPlayer] start '{}' at volume {:.2}", track, volume);
        Ok(())
    }

    fn stop(&self, track: &str) {
        log::info!("[NullPlayer] stop '{}'", track);
    }
}

/// One observed player call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Started { track: String, volume: f32 },
    Stopped { track: String },
}

/// Player that records every call, with optional failure injection.
///
/// State changes are tracked behind a mutex so tests can share the player
/// with the engine via `Arc` and still assert on call order afterwards.
#[derive(Debug, Default)]
pub struct RecordingPlayer {
    calls: Mutex<Vec<PlayerCall>>,
    failing_tracks: Mutex<Vec<String>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start` fail for the given track.
    pub fn fail_track(&self, track: &str) {
        self.failing_tracks.lock().unwrap().push(track.to_string());
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Tracks passed to `start`, in order, successful or not.
    pub fn started_tracks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlayerCall::Started { track, .. } => Some(track),
                PlayerCall::Stopped { .. } => None,
            })
            .collect()
    }

    /// Tracks passed to `stop`, in order.
    pub fn stopped_tracks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlayerCall::Stopped { track } => Some(track),
                PlayerCall::Started { .. } => None,
            })
            .collect()
    }

    pub fn start_count(&self) -> usize {
        self.started_tracks().len()
    }
}

impl CuePlayer for RecordingPlayer {
    fn start(&self, track: &str, volume: f32) -> Result<(), CueError> {
        self.calls.lock().unwrap().push(PlayerCall::Started {
            track: track.to_string(),
            volume,
        });
        if self
            .failing_tracks
            .lock()
            .unwrap()
            .iter()
            .any(|t| t == track)
        {
            return Err(CueError::PlaybackFailed {
                track: track.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn stop(&self, track: &str) {
        self.calls.lock().unwrap().push(PlayerCall::Stopped {
            track: track.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_player_tracks_calls_in_order() {
        let player = RecordingPlayer::new();
        player.start("a.mp3", 0.8).unwrap();
        player.stop("a.mp3");
        player.start("b.mp3", 0.8).unwrap();

        assert_eq!(player.started_tracks(), vec!["a.mp3", "b.mp3"]);
        assert_eq!(player.stopped_tracks(), vec!["a.mp3"]);
        assert_eq!(player.start_count(), 2);
    }

    #[test]
    fn test_failure_injection() {
        let player = RecordingPlayer::new();
        player.fail_track("broken.mp3");

        assert!(player.start("fine.mp3", 0.8).is_ok());
        assert!(matches!(
            player.start("broken.mp3", 0.8),
            Err(CueError::PlaybackFailed { .. })
        ));
        // The failed attempt is still recorded
        assert_eq!(player.start_count(), 2);
    }
}
