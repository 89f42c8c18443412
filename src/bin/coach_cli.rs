use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use beverage_coach::analysis::{frame_contains_target, sample_occupancy, PixelFrame};
use beverage_coach::config::AppConfig;
use beverage_coach::cue::NullPlayer;
use beverage_coach::engine::{ScriptedFrameSource, SessionEngine};
use beverage_coach::events::{CueCommand, DetectionEvent, ScoreUpdate};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "coach_cli",
    about = "Deterministic detection harness for Beverage Coach"
)]
struct Cli {
    /// Override path to the JSON config file (defaults to assets/coach_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a still image and report its occupancy ratio
    Classify {
        /// Image file (PNG/JPEG/BMP)
        image: PathBuf,
    },
    /// Drive a scripted detection pattern through a full session,
    /// streaming events to stdout as JSON lines
    Simulate {
        /// Per-tick signal pattern: 'P' target present, 'N' absent,
        /// '-' source not ready (e.g. "--PPPPPPNNNPPP")
        pattern: String,
        /// Milliseconds between ticks
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
        /// Simulated track duration before the ended callback fires
        #[arg(long, default_value_t = 1500)]
        track_duration_ms: u64,
        /// Seed for reproducible cue selection
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Print the effective configuration
    DumpConfig,
}

fn main() -> ExitCode {
    beverage_coach::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Classify { image } => run_classify(&config, &image),
        Commands::Simulate {
            pattern,
            tick_ms,
            track_duration_ms,
            seed,
        } => run_simulate(config, &pattern, tick_ms, track_duration_ms, seed),
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

#[derive(Serialize)]
struct ClassifyReport<'a> {
    image: &'a str,
    width: u32,
    height: u32,
    ratio: f64,
    detected: bool,
}

fn run_classify(config: &AppConfig, image_path: &PathBuf) -> Result<ExitCode> {
    let image = image::open(image_path)
        .with_context(|| format!("decoding {}", image_path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    anyhow::ensure!(width > 0 && height > 0, "image has no pixels");

    let frame = PixelFrame::from_rgb(width, height, image.into_raw());
    let ratio = sample_occupancy(&frame, &config.detection);
    let detected = frame_contains_target(ratio, &config.detection);

    let name = image_path.display().to_string();
    let report = ClassifyReport {
        image: &name,
        width,
        height,
        ratio,
        detected,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(if detected { 0 } else { 2 }))
}

/// One JSON line per observed event.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventLine {
    Detection(DetectionEvent),
    Score(ScoreUpdate),
    Cue(CueCommand),
}

fn run_simulate(
    config: AppConfig,
    pattern: &str,
    tick_ms: u64,
    track_duration_ms: u64,
    seed: u64,
) -> Result<ExitCode> {
    let target = PixelFrame::solid(8, 8, (20, 60, 230));
    let empty = PixelFrame::solid(8, 8, (128, 128, 128));

    let steps = pattern
        .chars()
        .map(|ch| match ch {
            'P' | 'p' => Ok(Some(target.clone())),
            'N' | 'n' => Ok(Some(empty.clone())),
            '-' => Ok(None),
            other => anyhow::bail!("pattern char '{}' (expected P, N or -)", other),
        })
        .collect::<Result<Vec<_>>>()?;
    let tick_count = steps.len() as u64;

    let mut engine = SessionEngine::new_seeded(
        config,
        Box::new(ScriptedFrameSource::new(steps)),
        Arc::new(NullPlayer::new()),
        seed,
    )?;
    engine.start()?;
    engine.mark_user_gesture();

    let mut detection_rx = engine.subscribe_detection().expect("started");
    let mut score_rx = engine.subscribe_score().expect("started");
    let mut cue_rx = engine.subscribe_cue().expect("started");

    // The NullPlayer never finishes a track on its own; synthesize the
    // ended callback after the configured duration so chaining is visible.
    let mut playing: Option<(String, u64)> = None;

    for i in 0..tick_count {
        let now_ms = i * tick_ms;

        if let Some((track, started_at)) = playing.take() {
            if now_ms.saturating_sub(started_at) >= track_duration_ms {
                engine.on_playback_ended(&track, now_ms);
            } else {
                playing = Some((track, started_at));
            }
        }

        engine.tick(now_ms);

        while let Ok(event) = detection_rx.try_recv() {
            println!("{}", serde_json::to_string(&EventLine::Detection(event))?);
        }
        while let Ok(update) = score_rx.try_recv() {
            println!("{}", serde_json::to_string(&EventLine::Score(update))?);
        }
        while let Ok(command) = cue_rx.try_recv() {
            if let CueCommand::PlaybackStarted { track } = &command {
                playing = Some((track.clone(), now_ms));
            }
            println!("{}", serde_json::to_string(&EventLine::Cue(command))?);
        }
    }

    engine.stop()?;
    eprintln!(
        "final score: {} ({:.3} points)",
        engine.score_display(),
        engine.score()
    );
    Ok(ExitCode::from(0))
}
