//! Glow driver - smoothed bass glow, treble amount and hover highlight

use crate::audio::BandValues;
use crate::config::{finite_or, fix, ConfigCorrection};
use crate::sink::{names, RenderParameterSink};
use crate::{approach_factor, finite_or_zero};
use serde::{Deserialize, Serialize};

/// Glow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowConfig {
    /// Whether the engine drives glow parameters
    pub enabled: bool,
    /// Approach rate per second for both glow values
    pub smoothing: f32,
    /// Glow pulse at full bass
    pub max_glow_from_bass: f32,
    /// Treble amount at full treble
    pub max_treble_influence: f32,
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smoothing: 10.0,
            max_glow_from_bass: 1.0,
            max_treble_influence: 1.0,
        }
    }
}

impl GlowConfig {
    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();
        let smoothing = finite_or(self.smoothing, d.smoothing).max(0.0);
        self.smoothing = fix(c, "glow.smoothing", self.smoothing, smoothing);
        let bass = finite_or(self.max_glow_from_bass, d.max_glow_from_bass).max(0.0);
        self.max_glow_from_bass = fix(c, "glow.max_glow_from_bass", self.max_glow_from_bass, bass);
        let treble = finite_or(self.max_treble_influence, d.max_treble_influence).max(0.0);
        self.max_treble_influence = fix(
            c,
            "glow.max_treble_influence",
            self.max_treble_influence,
            treble,
        );
    }
}

/// Values written by the glow driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GlowOutput {
    /// Smoothed bass glow
    pub glow_pulse: f32,
    /// Smoothed treble amount
    pub treble_amount: f32,
    /// 1.0 while hovered, otherwise 0.0
    pub hover: f32,
}

/// Drives the glow parameters from smoothed band values
#[derive(Debug, Clone)]
pub struct GlowDriver {
    config: GlowConfig,
    output: GlowOutput,
}

impl GlowDriver {
    /// Create a driver at rest
    pub fn new(config: GlowConfig) -> Self {
        Self {
            config,
            output: GlowOutput::default(),
        }
    }

    /// Move toward the band targets; silence lets both values fall back to zero
    pub fn update(&mut self, dt: f32, bands: &BandValues) -> GlowOutput {
        let k = approach_factor(dt, self.config.smoothing);
        let glow = finite_or_zero(bands.bass).clamp(0.0, 1.0) * self.config.max_glow_from_bass;
        let treble =
            finite_or_zero(bands.treble).clamp(0.0, 1.0) * self.config.max_treble_influence;

        self.output.glow_pulse += (glow - self.output.glow_pulse) * k;
        self.output.treble_amount += (treble - self.output.treble_amount) * k;
        self.output
    }

    /// Set the hover highlight
    pub fn set_hover(&mut self, hovered: bool) {
        self.output.hover = if hovered { 1.0 } else { 0.0 };
    }

    /// Write the current values to the sink
    pub fn write(&self, sink: &mut dyn RenderParameterSink) {
        sink.set_float(names::GLOW_PULSE, self.output.glow_pulse);
        sink.set_float(names::TREBLE_AMOUNT, self.output.treble_amount);
        sink.set_float(names::HOVER, self.output.hover);
    }

    /// Current values
    pub fn output(&self) -> GlowOutput {
        self.output
    }

    /// Configuration
    pub fn config(&self) -> &GlowConfig {
        &self.config
    }
}
