//! Engine configuration
//!
//! `EngineConfig` aggregates the configuration of every subsystem. Invalid values
//! are never fatal: [`EngineConfig::sanitized`] corrects them and reports each
//! correction so callers can surface it.

use crate::audio::{DetectorConfig, DetectorKind, SpectrumConfig};
use crate::clearance::ClearanceConfig;
use crate::color::ColorConfig;
use crate::file_format;
use crate::fusion::{FallbackValues, FusionConfig, OutputRanges};
use crate::glow::GlowConfig;
use crate::profile::ProfileConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Complete configuration surface of the control engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Band extraction and smoothing
    pub spectrum: SpectrumConfig,
    /// Beat detector (input: raw bass)
    pub beat: DetectorConfig,
    /// Volume-spike detector (input: total spectrum energy)
    #[serde(deserialize_with = "crate::audio::detector::deserialize_volume_spike")]
    pub volume_spike: DetectorConfig,
    /// Spatial clearance solver
    pub clearance: ClearanceConfig,
    /// Color strategy
    pub color: ColorConfig,
    /// Parameter fusion
    pub fusion: FusionConfig,
    /// Output ranges for every numeric parameter
    pub ranges: OutputRanges,
    /// Values written when there is no audio signal
    pub fallback: FallbackValues,
    /// Glow driver (disabled by default)
    pub glow: GlowConfig,
    /// Orb state profiles (disabled by default)
    pub profiles: ProfileConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spectrum: SpectrumConfig::default(),
            beat: DetectorConfig::beat(),
            volume_spike: DetectorConfig::volume_spike(),
            clearance: ClearanceConfig::default(),
            color: ColorConfig::default(),
            fusion: FusionConfig::default(),
            ranges: OutputRanges::default(),
            fallback: FallbackValues::default(),
            glow: GlowConfig::default(),
            profiles: ProfileConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration file (`.ron`, `.json` or `.toml`).
    ///
    /// The loaded values are not sanitized; the engine does that on construction.
    pub fn load(path: &Path) -> Result<Self> {
        file_format::load(path)
    }

    /// Save the configuration, choosing the format by extension
    pub fn save(&self, path: &Path) -> Result<()> {
        file_format::save(self, path)
    }

    /// Return a corrected copy of this configuration and the list of corrections made
    pub fn sanitized(&self) -> (Self, Vec<ConfigCorrection>) {
        let mut config = self.clone();
        let mut corrections = Vec::new();

        config.spectrum.sanitize(&mut corrections);
        config.beat.sanitize(DetectorKind::Beat, &mut corrections);
        config
            .volume_spike
            .sanitize(DetectorKind::VolumeSpike, &mut corrections);
        config.clearance.sanitize(&mut corrections);
        config.color.sanitize(&mut corrections);
        config.fusion.sanitize(&mut corrections);
        config.ranges.sanitize(&mut corrections);
        // Fallbacks are clamped against the already-corrected ranges
        config.fallback.sanitize(&config.ranges, &mut corrections);
        config.glow.sanitize(&mut corrections);
        config.profiles.sanitize(&mut corrections);

        (config, corrections)
    }
}

/// A single value corrected during sanitization
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigCorrection {
    /// Dotted path of the corrected field, e.g. `clearance.padding`
    pub field: String,
    /// Value found in the configuration
    pub original: f32,
    /// Value used instead
    pub corrected: f32,
}

impl fmt::Display for ConfigCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.field, self.original, self.corrected
        )
    }
}

/// Record a correction if `corrected` differs from `value`, returning the value to keep.
pub(crate) fn fix(
    corrections: &mut Vec<ConfigCorrection>,
    field: &str,
    value: f32,
    corrected: f32,
) -> f32 {
    if value == corrected {
        return value;
    }
    warn!("Config corrected: {} = {} -> {}", field, value, corrected);
    corrections.push(ConfigCorrection {
        field: field.to_string(),
        original: value,
        corrected,
    });
    corrected
}

/// `value` if finite, otherwise `default`
pub(crate) fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        default
    }
}
