//! SessionEngine: the tick-driven detection session.
//!
//! All process-wide mutable state (debounced detection state, score, audio
//! lock, pending chain replay) lives in this one struct, owned by whoever
//! drives the tick loop. Collaborators are injected at construction: a
//! [FrameSource] for rasters, a [CuePlayer] for audio, and per-tick
//! timestamps from the caller's clock, so every piece is testable with
//! scripted inputs and a synthetic clock.
//!
//! Nothing escapes a tick: frame acquisition gaps, blocked cue requests,
//! and playback failures are absorbed into outcomes and log lines. `stop`
//! is the session's teardown and is terminal.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::analysis::{DetectionDebouncer, DetectionState, FrameAssessment, StateChange};
use crate::config::AppConfig;
use crate::cue::{ChainDecision, CueCategory, CuePlayer, CueScheduler, PlayOutcome};
use crate::engine::channels::SessionChannels;
use crate::engine::frame_source::{FramePoll, FrameSource};
use crate::error::DetectorError;
use crate::events::{CueCommand, DetectionEvent, ScoreUpdate};
use crate::scoring::ScoreAccumulator;

/// A chain replay waiting for its settle delay to elapse.
#[derive(Debug, Clone, Copy)]
struct PendingChain {
    category: CueCategory,
    due_ms: u64,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session was stopped; ticks are inert from here on
    Stopped,
    /// start() has not been called yet
    NotRunning,
    /// The frame source produced nothing this tick
    NotReady,
    /// A frame was classified
    Processed {
        ratio: f64,
        detected: bool,
        state_change: Option<StateChange>,
    },
}

/// Owns and drives the whole detection/score/cue pipeline.
pub struct SessionEngine {
    config: AppConfig,
    source: Box<dyn FrameSource>,
    player: Arc<dyn CuePlayer>,
    channels: SessionChannels,
    debouncer: DetectionDebouncer,
    score: ScoreAccumulator,
    scheduler: CueScheduler,
    pending_chain: Option<PendingChain>,
    last_tick_ms: Option<u64>,
    detection_tx: Option<broadcast::Sender<DetectionEvent>>,
    score_tx: Option<broadcast::Sender<ScoreUpdate>>,
    cue_tx: Option<broadcast::Sender<CueCommand>>,
    running: bool,
    stopped: bool,
}

impl SessionEngine {
    /// Build a session from validated configuration and injected
    /// collaborators. Cue selection is seeded from entropy.
    pub fn new(
        config: AppConfig,
        source: Box<dyn FrameSource>,
        player: Arc<dyn CuePlayer>,
    ) -> Result<Self, DetectorError> {
        config.detection.validate()?;
        let scheduler = CueScheduler::new(config.cues.clone());
        Ok(Self::assemble(config, source, player, scheduler))
    }

    /// Like [SessionEngine::new] but with deterministic cue selection, for
    /// harnesses and tests that need reproducible track picks.
    pub fn new_seeded(
        config: AppConfig,
        source: Box<dyn FrameSource>,
        player: Arc<dyn CuePlayer>,
        seed: u64,
    ) -> Result<Self, DetectorError> {
        config.detection.validate()?;
        let scheduler = CueScheduler::with_seed(config.cues.clone(), seed);
        Ok(Self::assemble(config, source, player, scheduler))
    }

    fn assemble(
        config: AppConfig,
        source: Box<dyn FrameSource>,
        player: Arc<dyn CuePlayer>,
        scheduler: CueScheduler,
    ) -> Self {
        let debouncer = DetectionDebouncer::new(config.detection.state_cooldown_ms);
        let score = ScoreAccumulator::new(config.scoring.clone());
        Self {
            config,
            source,
            player,
            channels: SessionChannels::new(),
            debouncer,
            score,
            scheduler,
            pending_chain: None,
            last_tick_ms: None,
            detection_tx: None,
            score_tx: None,
            cue_tx: None,
            running: false,
            stopped: false,
        }
    }

    /// Open the frame source and initialize the event channels.
    pub fn start(&mut self) -> Result<(), DetectorError> {
        if self.stopped {
            return Err(DetectorError::SessionTerminated);
        }
        if self.running {
            return Err(DetectorError::AlreadyRunning);
        }

        self.source.open()?;
        self.detection_tx = Some(self.channels.init_detection());
        self.score_tx = Some(self.channels.init_score());
        self.cue_tx = Some(self.channels.init_cue());
        self.running = true;
        log::info!("[SessionEngine] session started");
        Ok(())
    }

    /// Record that a user gesture unlocked audio playback.
    pub fn mark_user_gesture(&mut self) {
        self.scheduler.mark_user_gesture();
    }

    /// Process one tick at the given timestamp.
    ///
    /// Never returns an error and never panics across the tick boundary;
    /// failures surface as outcomes, events, and log lines.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        if self.stopped {
            return TickOutcome::Stopped;
        }
        if !self.running {
            return TickOutcome::NotRunning;
        }

        let dt_secs = match self.last_tick_ms {
            Some(last) => now_ms.saturating_sub(last) as f64 / 1000.0,
            None => 0.0,
        };
        self.last_tick_ms = Some(now_ms);

        self.service_pending_chain(now_ms);

        let frame = match self.source.poll() {
            FramePoll::Frame(frame) => frame,
            FramePoll::NotReady => return TickOutcome::NotReady,
        };

        let assessment = FrameAssessment::assess(&frame, &self.config.detection);

        // Scoring reacts to the raw per-frame signal; cues wait for the
        // debounced transition below.
        self.score.integrate(dt_secs, assessment.detected);
        self.emit_score(ScoreUpdate {
            timestamp_ms: now_ms,
            points: self.score.value(),
            display: self.score.display(),
        });

        let state_change = self.debouncer.update(now_ms, assessment.detected);
        if let Some(change) = state_change {
            self.emit_detection(DetectionEvent {
                timestamp_ms: now_ms,
                state: change.state,
                ratio: assessment.ratio,
            });
            if change.state.is_positive() {
                self.emit_cue(CueCommand::ShowVisual {
                    asset: self.config.cues.visual_cue_asset.clone(),
                });
                self.request_play(CueCategory::Positive, false, now_ms);
            } else {
                self.request_play(CueCategory::Negative, false, now_ms);
            }
        }

        TickOutcome::Processed {
            ratio: assessment.ratio,
            detected: assessment.detected,
            state_change,
        }
    }

    /// Completion callback from the playback service.
    ///
    /// A replay decision is parked until its settle delay elapses and is
    /// carried out by a later tick, never from inside this callback.
    pub fn on_playback_ended(&mut self, track: &str, now_ms: u64) {
        if self.stopped {
            return;
        }
        match self.scheduler.on_playback_ended(track, self.debouncer.state()) {
            ChainDecision::Replay { category, delay_ms } => {
                self.pending_chain = Some(PendingChain {
                    category,
                    due_ms: now_ms + delay_ms,
                });
            }
            ChainDecision::Idle => {}
        }
    }

    /// Error callback from the playback service. Releases the lock and
    /// does not re-arm the chain.
    pub fn on_playback_error(&mut self, track: &str) {
        self.scheduler.on_playback_error(track);
    }

    /// Terminal teardown: silences playback, cancels any pending chain,
    /// and makes every later tick and request inert.
    pub fn stop(&mut self) -> Result<(), DetectorError> {
        if !self.running {
            return Err(DetectorError::NotRunning);
        }
        let player = Arc::clone(&self.player);
        self.scheduler.stop(player.as_ref());
        self.pending_chain = None;
        self.emit_cue(CueCommand::SessionStopped);
        self.running = false;
        self.stopped = true;
        log::info!("[SessionEngine] session stopped");
        Ok(())
    }

    fn service_pending_chain(&mut self, now_ms: u64) {
        let due = match self.pending_chain {
            Some(chain) if now_ms >= chain.due_ms => chain,
            _ => return,
        };
        self.pending_chain = None;
        self.request_play(due.category, true, now_ms);
    }

    fn request_play(&mut self, category: CueCategory, force: bool, now_ms: u64) {
        let player = Arc::clone(&self.player);
        match self
            .scheduler
            .request_play(category, force, now_ms, player.as_ref())
        {
            Ok(PlayOutcome::Started { track }) => {
                self.emit_cue(CueCommand::PlaybackStarted { track });
            }
            Ok(PlayOutcome::Blocked(reason)) => {
                log::debug!(
                    "[SessionEngine] {} cue blocked: {:?}",
                    category.as_str(),
                    reason
                );
            }
            // Already logged by the scheduler; the lock is released and
            // the tick carries on
            Err(_) => {}
        }
    }

    fn emit_detection(&self, event: DetectionEvent) {
        if let Some(tx) = &self.detection_tx {
            let _ = tx.send(event);
        }
    }

    fn emit_score(&self, update: ScoreUpdate) {
        if let Some(tx) = &self.score_tx {
            let _ = tx.send(update);
        }
    }

    fn emit_cue(&self, command: CueCommand) {
        if let Some(tx) = &self.cue_tx {
            let _ = tx.send(command);
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn detection_state(&self) -> DetectionState {
        self.debouncer.state()
    }

    pub fn score(&self) -> f64 {
        self.score.value()
    }

    pub fn score_display(&self) -> i64 {
        self.score.display()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn subscribe_detection(&self) -> Option<broadcast::Receiver<DetectionEvent>> {
        self.channels.subscribe_detection()
    }

    pub fn subscribe_score(&self) -> Option<broadcast::Receiver<ScoreUpdate>> {
        self.channels.subscribe_score()
    }

    pub fn subscribe_cue(&self) -> Option<broadcast::Receiver<CueCommand>> {
        self.channels.subscribe_cue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PixelFrame;
    use crate::cue::RecordingPlayer;
    use crate::engine::frame_source::ScriptedFrameSource;

    const BLUE: (u8, u8, u8) = (20, 60, 230);
    const GRAY: (u8, u8, u8) = (128, 128, 128);

    fn blue_frame() -> Option<PixelFrame> {
        Some(PixelFrame::solid(4, 4, BLUE))
    }

    fn gray_frame() -> Option<PixelFrame> {
        Some(PixelFrame::solid(4, 4, GRAY))
    }

    fn engine_with(steps: Vec<Option<PixelFrame>>) -> (SessionEngine, Arc<RecordingPlayer>) {
        let player = Arc::new(RecordingPlayer::new());
        let engine = SessionEngine::new_seeded(
            AppConfig::default(),
            Box::new(ScriptedFrameSource::new(steps)),
            player.clone(),
            42,
        )
        .unwrap();
        (engine, player)
    }

    #[test]
    fn test_tick_before_start_is_not_running() {
        let (mut engine, _) = engine_with(vec![blue_frame()]);
        assert_eq!(engine.tick(0), TickOutcome::NotRunning);
    }

    #[test]
    fn test_double_start_fails() {
        let (mut engine, _) = engine_with(vec![]);
        engine.start().unwrap();
        assert_eq!(engine.start(), Err(DetectorError::AlreadyRunning));
    }

    #[test]
    fn test_open_failure_propagates_permission_denied() {
        let player = Arc::new(RecordingPlayer::new());
        let mut engine = SessionEngine::new(
            AppConfig::default(),
            Box::new(ScriptedFrameSource::new(vec![]).with_open_failure()),
            player,
        )
        .unwrap();
        assert_eq!(engine.start(), Err(DetectorError::PermissionDenied));
        assert!(!engine.is_running());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = AppConfig::default();
        config.detection.occupancy_threshold = 2.0;
        let result = SessionEngine::new(
            config,
            Box::new(ScriptedFrameSource::new(vec![])),
            Arc::new(RecordingPlayer::new()),
        );
        assert!(matches!(result, Err(DetectorError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_not_ready_tick_is_a_noop() {
        let (mut engine, player) = engine_with(vec![None, blue_frame()]);
        engine.start().unwrap();
        engine.mark_user_gesture();

        assert_eq!(engine.tick(0), TickOutcome::NotReady);
        assert_eq!(engine.detection_state(), DetectionState::Unset);
        assert_eq!(engine.score(), 0.0);
        assert_eq!(player.start_count(), 0);
    }

    #[test]
    fn test_first_positive_frame_triggers_visual_and_audio() {
        let (mut engine, player) = engine_with(vec![blue_frame()]);
        engine.start().unwrap();
        engine.mark_user_gesture();
        let mut cue_rx = engine.subscribe_cue().unwrap();

        let outcome = engine.tick(0);
        match outcome {
            TickOutcome::Processed {
                ratio,
                detected,
                state_change,
            } => {
                assert_eq!(ratio, 1.0);
                assert!(detected);
                assert!(state_change.is_some());
            }
            other => panic!("expected Processed, got {:?}", other),
        }

        assert!(engine.detection_state().is_positive());
        assert_eq!(player.start_count(), 1);
        assert!(matches!(
            cue_rx.try_recv().unwrap(),
            CueCommand::ShowVisual { .. }
        ));
        assert!(matches!(
            cue_rx.try_recv().unwrap(),
            CueCommand::PlaybackStarted { .. }
        ));
    }

    #[test]
    fn test_negative_transition_has_no_visual_cue() {
        let (mut engine, _player) = engine_with(vec![blue_frame(), gray_frame()]);
        engine.start().unwrap();
        engine.mark_user_gesture();
        engine.tick(0);
        let mut cue_rx = engine.subscribe_cue().unwrap();

        // Past the detection cooldown the flip is accepted; the negative
        // cue request is blocked by the shared audio cooldown but the
        // transition itself is emitted.
        let outcome = engine.tick(1000);
        assert!(matches!(
            outcome,
            TickOutcome::Processed {
                state_change: Some(_),
                ..
            }
        ));
        assert!(!engine.detection_state().is_positive());
        assert!(cue_rx.try_recv().is_err(), "no visual cue for negative");
    }

    #[test]
    fn test_score_integrates_raw_signal_every_tick() {
        // Alternating frames flip faster than the detection cooldown, so
        // the stable state stays positive while the raw signal drives the
        // score both directions.
        let (mut engine, _) = engine_with(vec![
            blue_frame(),
            blue_frame(),
            gray_frame(),
            blue_frame(),
        ]);
        engine.start().unwrap();

        engine.tick(0);
        engine.tick(100); // +0.1
        engine.tick(200); // -0.1
        engine.tick(300); // +0.1
        assert!((engine.score() - 0.1).abs() < 1e-9);
        assert!(engine.detection_state().is_positive());
    }

    #[test]
    fn test_chain_replay_after_settle_delay() {
        let (mut engine, player) = engine_with(vec![blue_frame(); 10]);
        engine.start().unwrap();
        engine.mark_user_gesture();

        engine.tick(0);
        assert_eq!(player.start_count(), 1);
        let track = player.started_tracks()[0].clone();

        engine.on_playback_ended(&track, 2000);
        // Before the 50 ms settle delay nothing plays
        engine.tick(2020);
        assert_eq!(player.start_count(), 1);
        // At/after the delay the chain fires with force, bypassing the
        // 3500 ms global cooldown
        engine.tick(2060);
        assert_eq!(player.start_count(), 2);
    }

    #[test]
    fn test_chain_not_armed_when_state_no_longer_matches() {
        let (mut engine, player) = engine_with(vec![
            blue_frame(),
            gray_frame(),
            blue_frame(),
            blue_frame(),
        ]);
        engine.start().unwrap();
        engine.mark_user_gesture();

        engine.tick(0);
        let track = player.started_tracks()[0].clone();
        // State flips to negative before the track ends
        engine.tick(1000);
        engine.on_playback_ended(&track, 1500);
        engine.tick(1600);
        engine.tick(1700);
        // Only the original positive start; no chain for a flipped state
        assert_eq!(player.start_count(), 1);
    }

    #[test]
    fn test_stop_cancels_pending_chain_and_is_terminal() {
        let (mut engine, player) = engine_with(vec![blue_frame(); 10]);
        engine.start().unwrap();
        engine.mark_user_gesture();

        engine.tick(0);
        let track = player.started_tracks()[0].clone();
        engine.on_playback_ended(&track, 1000);

        engine.stop().unwrap();
        let starts_at_stop = player.start_count();

        for i in 0..5 {
            assert_eq!(engine.tick(1100 + i * 100), TickOutcome::Stopped);
        }
        assert_eq!(player.start_count(), starts_at_stop);
        assert!(!engine.is_running());
        assert_eq!(engine.start(), Err(DetectorError::SessionTerminated));
    }

    #[test]
    fn test_stop_without_start_fails() {
        let (mut engine, _) = engine_with(vec![]);
        assert_eq!(engine.stop(), Err(DetectorError::NotRunning));
    }

    #[test]
    fn test_playback_error_does_not_chain() {
        let (mut engine, player) = engine_with(vec![blue_frame(); 10]);
        engine.start().unwrap();
        engine.mark_user_gesture();

        engine.tick(0);
        let track = player.started_tracks()[0].clone();
        engine.on_playback_error(&track);
        engine.tick(100);
        engine.tick(200);
        assert_eq!(player.start_count(), 1);
    }
}
