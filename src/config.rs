//! Configuration management for detection and cue tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling parameter iteration without recompilation. Detection band
//! bounds, scoring rates, and cue timing can all be adjusted via the
//! config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DetectorError;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
    pub cues: CueConfig,
}

/// Color-band detection parameters
///
/// The hue band is wrap-around capable: `hue_min > hue_max` denotes a band
/// that crosses the 0°/360° seam (e.g. 350..10 for reds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Hue band lower bound in degrees [0, 360)
    pub hue_min: f32,
    /// Hue band upper bound in degrees [0, 360)
    pub hue_max: f32,
    /// Minimum saturation on the 0-100 scale
    pub saturation_min: f32,
    /// Minimum brightness on the 0-100 scale
    pub brightness_min: f32,
    /// Fraction of matching pixels required to call the frame positive, in [0, 1]
    pub occupancy_threshold: f64,
    /// Minimum dwell time before a detection flip is accepted as stable
    pub state_cooldown_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            // Narrow blue band tuned for a can label seen at arm's length
            hue_min: 210.0,
            hue_max: 240.0,
            saturation_min: 60.0,
            brightness_min: 60.0,
            // Low threshold so a small or distant can still registers
            occupancy_threshold: 0.001,
            state_cooldown_ms: 1000,
        }
    }
}

impl DetectionConfig {
    /// Check that every bound is inside its valid range.
    pub fn validate(&self) -> Result<(), DetectorError> {
        let invalid = |reason: &str| {
            Err(DetectorError::ConfigInvalid {
                reason: reason.to_string(),
            })
        };

        if !(0.0..360.0).contains(&self.hue_min) || !(0.0..360.0).contains(&self.hue_max) {
            return invalid("hue bounds must be in [0, 360)");
        }
        if !(0.0..=100.0).contains(&self.saturation_min) {
            return invalid("saturation_min must be in [0, 100]");
        }
        if !(0.0..=100.0).contains(&self.brightness_min) {
            return invalid("brightness_min must be in [0, 100]");
        }
        if !(0.0..=1.0).contains(&self.occupancy_threshold) {
            return invalid("occupancy_threshold must be in [0, 1]");
        }
        Ok(())
    }
}

/// Continuous scoring parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points added per second while the target is in frame
    pub points_per_second_detected: f64,
    /// Points removed per second while the target is missing
    pub points_per_second_missing: f64,
    /// Per-tick dt cap in seconds, bounds the effect of frame hitches
    pub max_frame_dt_secs: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_per_second_detected: 1.0,
            points_per_second_missing: 1.0,
            max_frame_dt_secs: 0.1,
        }
    }
}

/// Cue playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueConfig {
    /// Tracks played when the target appears
    pub positive_tracks: Vec<String>,
    /// Tracks played when the target goes missing
    pub negative_tracks: Vec<String>,
    /// Image asset shown alongside the positive cue
    pub visual_cue_asset: String,
    /// Minimum gap between ANY two cue starts, shared across both categories
    pub global_cooldown_ms: u64,
    /// Settle delay before a chained replay is issued
    pub chain_delay_ms: u64,
    /// Playback volume in [0, 1]
    pub volume: f32,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            positive_tracks: vec![
                "assets/chug.mp3".to_string(),
                "assets/good_choice.mp3".to_string(),
                "assets/keep_it_up.mp3".to_string(),
            ],
            negative_tracks: vec![
                "assets/you_want_it.mp3".to_string(),
                "assets/wheres_your_drink.mp3".to_string(),
            ],
            visual_cue_asset: "assets/mascot1.png".to_string(),
            global_cooldown_ms: 3500,
            chain_delay_ms: 50,
            volume: 0.8,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            scoring: ScoringConfig::default(),
            cues: CueConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Falls back to defaults (with a logged warning) if the file is
    /// missing or does not parse; a session should never fail to start
    /// because a tuning file is absent.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/coach_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.hue_min, 210.0);
        assert_eq!(config.detection.hue_max, 240.0);
        assert_eq!(config.detection.occupancy_threshold, 0.001);
        assert_eq!(config.detection.state_cooldown_ms, 1000);
        assert_eq!(config.cues.global_cooldown_ms, 3500);
        assert_eq!(config.cues.chain_delay_ms, 50);
        assert_eq!(config.scoring.max_frame_dt_secs, 0.1);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AppConfig::default().detection.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = DetectionConfig::default();
        config.occupancy_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wraparound_band_is_valid() {
        let mut config = DetectionConfig::default();
        config.hue_min = 350.0;
        config.hue_max = 10.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.detection.hue_min, config.detection.hue_min);
        assert_eq!(
            parsed.detection.occupancy_threshold,
            config.detection.occupancy_threshold
        );
        assert_eq!(parsed.cues.positive_tracks, config.cues.positive_tracks);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("does/not/exist.json");
        assert_eq!(
            config.detection.occupancy_threshold,
            AppConfig::default().detection.occupancy_threshold
        );
    }
}
