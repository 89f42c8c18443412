// SessionChannels: centralized tokio broadcast channel management
// Single Responsibility: broadcast channel lifecycle and subscription

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::events::{CueCommand, DetectionEvent, ScoreUpdate};

/// Manages the session's broadcast channels
///
/// Channels are created lazily when the session starts; subscribing before
/// initialization returns `None`. Multiple subscribers each receive an
/// independent copy of every message, and a lagging subscriber drops old
/// messages rather than blocking the tick loop.
///
/// # Channel Types
/// - Detection: accepted state transitions (one per debounced flip)
/// - Score: per-tick score updates
/// - Cue: visual/playback commands and the terminal stop marker
pub struct SessionChannels {
    detection: Arc<Mutex<Option<broadcast::Sender<DetectionEvent>>>>,
    score: Arc<Mutex<Option<broadcast::Sender<ScoreUpdate>>>>,
    cue: Arc<Mutex<Option<broadcast::Sender<CueCommand>>>>,
}

impl SessionChannels {
    pub fn new() -> Self {
        Self {
            detection: Arc::new(Mutex::new(None)),
            score: Arc::new(Mutex::new(None)),
            cue: Arc::new(Mutex::new(None)),
        }
    }

    /// Initialize the detection channel, returning the sender.
    ///
    /// Buffer size 32: transitions are debounced to at most one per second,
    /// so even a parked subscriber has half a minute of slack.
    pub fn init_detection(&self) -> broadcast::Sender<DetectionEvent> {
        let (tx, _) = broadcast::channel(32);
        *self.detection.lock().unwrap() = Some(tx.clone());
        tx
    }

    pub fn subscribe_detection(&self) -> Option<broadcast::Receiver<DetectionEvent>> {
        self.detection.lock().unwrap().as_ref().map(|tx| tx.subscribe())
    }

    /// Initialize the score channel, returning the sender.
    ///
    /// Buffer size 256: one update per processed tick at display refresh
    /// rate; a few seconds of slack for slow consumers.
    pub fn init_score(&self) -> broadcast::Sender<ScoreUpdate> {
        let (tx, _) = broadcast::channel(256);
        *self.score.lock().unwrap() = Some(tx.clone());
        tx
    }

    pub fn subscribe_score(&self) -> Option<broadcast::Receiver<ScoreUpdate>> {
        self.score.lock().unwrap().as_ref().map(|tx| tx.subscribe())
    }

    /// Initialize the cue command channel, returning the sender.
    pub fn init_cue(&self) -> broadcast::Sender<CueCommand> {
        let (tx, _) = broadcast::channel(32);
        *self.cue.lock().unwrap() = Some(tx.clone());
        tx
    }

    pub fn subscribe_cue(&self) -> Option<broadcast::Receiver<CueCommand>> {
        self.cue.lock().unwrap().as_ref().map(|tx| tx.subscribe())
    }
}

impl Default for SessionChannels {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DetectionState;

    #[test]
    fn test_channels_start_uninitialized() {
        let channels = SessionChannels::new();
        assert!(channels.subscribe_detection().is_none());
        assert!(channels.subscribe_score().is_none());
        assert!(channels.subscribe_cue().is_none());
    }

    #[test]
    fn test_detection_channel_lifecycle() {
        let channels = SessionChannels::new();
        let tx = channels.init_detection();
        let mut rx = channels.subscribe_detection().unwrap();

        tx.send(DetectionEvent {
            timestamp_ms: 10,
            state: DetectionState::Positive { since_ms: 10 },
            ratio: 0.5,
        })
        .unwrap();

        assert_eq!(rx.try_recv().unwrap().timestamp_ms, 10);
    }

    #[test]
    fn test_multiple_cue_subscribers_each_receive() {
        let channels = SessionChannels::new();
        let tx = channels.init_cue();
        let mut rx1 = channels.subscribe_cue().unwrap();
        let mut rx2 = channels.subscribe_cue().unwrap();

        tx.send(CueCommand::SessionStopped).unwrap();

        assert_eq!(rx1.try_recv().unwrap(), CueCommand::SessionStopped);
        assert_eq!(rx2.try_recv().unwrap(), CueCommand::SessionStopped);
    }
}
