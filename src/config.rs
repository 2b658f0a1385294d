// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline configuration
//!
//! Loaded from an optional JSON file; every field has a default so a
//! partial file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::ConfigError;
use crate::pipeline::effect::EffectKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Preview mixer retained-count hint
    pub mixer_retained_hint: usize,
    /// Preview depth converter retained-count hint
    pub depth_converter_retained_hint: usize,
    /// Still-capture depth converter retained-count hint
    pub photo_converter_retained_hint: usize,
    /// Still-capture mixer retained-count hint
    pub photo_mixer_retained_hint: usize,
    /// Mix factor at startup; the UI toggle flips between 0.0 and 1.0
    pub initial_mix_factor: f32,
    /// Whether the depth leg runs at startup
    pub depth_visualization_enabled: bool,
    /// Color-leg effect applied before mixing
    pub effect: EffectKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mixer_retained_hint: constants::DEFAULT_MIXER_RETAINED_HINT,
            depth_converter_retained_hint: constants::DEFAULT_DEPTH_CONVERTER_RETAINED_HINT,
            photo_converter_retained_hint: constants::DEFAULT_PHOTO_CONVERTER_RETAINED_HINT,
            photo_mixer_retained_hint: constants::DEFAULT_PHOTO_MIXER_RETAINED_HINT,
            initial_mix_factor: 0.0,
            depth_visualization_enabled: true,
            effect: EffectKind::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a configuration file, validating field ranges
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.initial_mix_factor) {
            return Err(ConfigError::Invalid(format!(
                "initial_mix_factor {} outside [0.0, 1.0]",
                self.initial_mix_factor
            )));
        }
        for (name, hint) in [
            ("mixer_retained_hint", self.mixer_retained_hint),
            (
                "depth_converter_retained_hint",
                self.depth_converter_retained_hint,
            ),
            (
                "photo_converter_retained_hint",
                self.photo_converter_retained_hint,
            ),
            ("photo_mixer_retained_hint", self.photo_mixer_retained_hint),
        ] {
            if hint == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}
