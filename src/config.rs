//! Timing knobs for the reel animations, loadable from a JSON file.

use crate::error::ConfigError;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Most visible steps a lever run animates per reel, whatever the distance.
pub const MAX_LEVER_STEPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Card slide duration (ms)
    pub animation_duration_ms: u64,
    /// Delay between pulling the lever and the first reel moving (ms)
    pub lever_pre_delay_ms: u64,
    /// Delay between successive reels starting their lever runs (ms)
    pub inter_reel_stagger_ms: u64,
    /// Gap between chained steps inside one reel's lever run (ms)
    pub inter_step_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            animation_duration_ms: 150,
            lever_pre_delay_ms: 75,
            inter_reel_stagger_ms: 50,
            inter_step_delay_ms: 30,
        }
    }
}

impl TimingConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        info!("Loaded timing from {:?}", path);
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)?;
        info!("Timing saved to {:?}", path);
        Ok(())
    }

    /// Slides must take at least 1 ms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.animation_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "animation_duration_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Scale every delay by `factor` (< 1.0 = faster). Slides never drop below 1 ms.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| (ms as f64 * factor.max(0.0)).round() as u64;
        Self {
            animation_duration_ms: scale(self.animation_duration_ms).max(1),
            lever_pre_delay_ms: scale(self.lever_pre_delay_ms),
            inter_reel_stagger_ms: scale(self.inter_reel_stagger_ms),
            inter_step_delay_ms: scale(self.inter_step_delay_ms),
        }
    }

    /// Longest possible lever pull, from cue to the last reel settling.
    pub fn worst_case_lever_ms(&self, reel_count: usize) -> u64 {
        let steps = MAX_LEVER_STEPS as u64;
        self.lever_pre_delay_ms
            + reel_count.saturating_sub(1) as u64 * self.inter_reel_stagger_ms
            + steps * self.animation_duration_ms
            + (steps - 1) * self.inter_step_delay_ms
    }
}
