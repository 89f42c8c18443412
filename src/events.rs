//! Event payloads published by the session engine
//!
//! Everything here is serde-serializable so UI bindings and the CLI can
//! forward events as JSON without reshaping them.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::DetectionState;

/// Emitted once per accepted detection state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub timestamp_ms: u64,
    pub state: DetectionState,
    /// Occupancy ratio of the frame that caused the transition
    pub ratio: f64,
}

/// Emitted every processed tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub timestamp_ms: u64,
    /// Full-precision accumulator value
    pub points: f64,
    /// Rounded value for display
    pub display: i64,
}

/// Commands for the presentation layer and playback observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueCommand {
    /// Show the visual cue now (no parameters beyond the asset to show)
    ShowVisual { asset: String },
    /// A cue track started playing
    PlaybackStarted { track: String },
    /// The session was stopped; nothing further will be emitted
    SessionStopped,
}

/// Adapt a broadcast receiver into a `Stream`, dropping lag errors.
///
/// Subscribers that fall behind skip messages rather than erroring out,
/// which is the right behavior for UI consumers of a per-frame feed.
pub fn into_stream<T: Clone + Send + 'static>(
    rx: broadcast::Receiver<T>,
) -> impl Stream<Item = T> {
    BroadcastStream::new(rx).filter_map(|item| futures::future::ready(item.ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payloads_serialize() {
        let event = DetectionEvent {
            timestamp_ms: 1200,
            state: DetectionState::Positive { since_ms: 1200 },
            ratio: 0.25,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("1200"));

        let command = CueCommand::ShowVisual {
            asset: "assets/mascot1.png".to_string(),
        };
        let json = serde_json::to_string(&command).unwrap();
        let parsed: CueCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, command);
    }

    #[tokio::test]
    async fn test_into_stream_yields_sent_items() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(1u32).unwrap();
        tx.send(2u32).unwrap();
        drop(tx);

        let items: Vec<u32> = into_stream(rx).collect().await;
        assert_eq!(items, vec![1, 2]);
    }
}
