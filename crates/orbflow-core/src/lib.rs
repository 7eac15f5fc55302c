//! Orbflow Core - Per-frame control-signal engine
//!
//! This crate turns two live inputs into the small parameter set consumed by a renderer:
//! - Spatial clearance around a moving anchor (bounded binary search over a collision oracle)
//! - Audio spectrum analysis (band energies, beat / volume-spike detectors)
//! - Color strategies (spectrum cycle, preset gradients, frequency mapping)
//! - Parameter fusion with a static fallback when no audio is present

#![warn(missing_docs)]

pub use glam::Vec3;
use thiserror::Error;

pub mod audio;
pub mod clearance;
pub mod color;
pub mod config;
pub mod engine;
pub mod file_format;
pub mod fusion;
pub mod glow;
pub mod logging;
pub mod profile;
pub mod sink;

// --- Re-exports grouped by category ---

// Audio
pub use audio::{
    AdaptiveDetector, AudioAnalyzer, AudioFeatures, BandBoundaries, BandEnergies, BandExtractor,
    BandValues, DetectorConfig, DetectorKind, DetectorState, DisabledHistory, FftSourceConfig,
    FftSpectrumSource, Playback, SpectralFrame, SpectralSource, SpectrumConfig, SpectrumInput,
    TempoEstimator,
};

// Clearance
pub use clearance::{
    ClearanceConfig, ClearanceQuery, ClearanceSolver, CollisionOracle, Hit, LayerMask, Obstacle,
    ObstacleScene, OwnerId, RadiusState, SearchOutcome, SearchReport, Shape,
};

// Color
pub use color::{
    ColorConfig, ColorEngine, ColorPreset, ColorStrategy, ColorStrategyKind, ColorTriple,
    Gradient, GradientBlend, GradientKey, Rgba,
};

// Engine & Fusion
pub use config::{ConfigCorrection, EngineConfig};
pub use engine::{AnalysisSnapshot, ControlEngine};
pub use fusion::{
    FallbackValues, FusionConfig, FusionInputs, OutputParameterSet, OutputRanges, ParamRange,
    RadiusStrategy,
};

// Auxiliary drivers
pub use glow::{GlowConfig, GlowDriver, GlowOutput};
pub use profile::{OrbState, ProfileConfig, StateProfile, StateProfileDriver};

// Output
pub use logging::LogConfig;
pub use sink::{NullSink, ParamValue, ParameterTable, RenderParameterSink};

/// Core error types
///
/// Ticking the engine never fails; these cover configuration and preset I/O only.
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON deserialization error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// File extension not recognized
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the load limit
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// Actual file size in bytes
        size: u64,
        /// Allowed size in bytes
        limit: u64,
    },

    /// No built-in color preset with this name
    #[error("Unknown color preset: {0}")]
    UnknownPreset(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Replace NaN/Inf with 0.0
pub(crate) fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Smoothstep: 3t² - 2t³ on t clamped to [0, 1]
pub(crate) fn smoothstep(t: f32) -> f32 {
    let t = finite_or_zero(t).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Frame-rate independent approach factor for `dt` seconds at `rate` per second
pub(crate) fn approach_factor(dt: f32, rate: f32) -> f32 {
    finite_or_zero(dt * rate).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(-3.0), 0.0);
        assert_eq!(smoothstep(f32::NAN), 0.0);
    }

    #[test]
    fn test_approach_factor_is_clamped() {
        assert_eq!(approach_factor(1.0, 10.0), 1.0);
        assert_eq!(approach_factor(-0.1, 10.0), 0.0);
        assert!((approach_factor(0.01, 10.0) - 0.1).abs() < 1e-6);
        assert_eq!(approach_factor(f32::INFINITY, 1.0), 0.0);
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::UnsupportedFormat("txt".to_string());
        assert_eq!(err.to_string(), "Unsupported file format: txt");

        let err = CoreError::FileTooLarge {
            size: 2048,
            limit: 1024,
        };
        let text = err.to_string();
        assert!(text.contains("2048"));
        assert!(text.contains("1024"));
    }
}
