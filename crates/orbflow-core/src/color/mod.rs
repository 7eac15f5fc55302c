//! Color strategies
//!
//! Produces the primary / secondary / accent colors each tick under one of a
//! fixed set of strategies:
//!
//! - **SpectrumCycle**: hue rotation driven by track progress or a free-running phase.
//! - **PresetGradient**: three authored gradients sampled at the same phase.
//! - **FrequencyMapped**: smoothed bands permuted across the RGB channels.

pub mod gradient;
pub mod preset;

pub use gradient::{Gradient, GradientBlend, GradientKey};
pub use preset::ColorPreset;

use crate::audio::{BandValues, Playback};
use crate::config::{finite_or, fix, ConfigCorrection};
use crate::finite_or_zero;
use palette::{FromColor, Hsv, Srgb};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Linear RGBA color with components nominally in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Rgba {
    /// Opaque blue
    pub const BLUE: Rgba = Rgba::rgb(0.0, 0.0, 1.0);
    /// Opaque red
    pub const RED: Rgba = Rgba::rgb(1.0, 0.0, 0.0);
    /// Opaque white
    pub const WHITE: Rgba = Rgba::rgb(1.0, 1.0, 1.0);
    /// Opaque black
    pub const BLACK: Rgba = Rgba::rgb(0.0, 0.0, 0.0);

    /// Opaque color from RGB
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque color from hue (turns, wrapped into [0, 1)), saturation and value
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let hue = finite_or_zero(hue).rem_euclid(1.0);
        let hsv: Hsv = Hsv::new(
            hue * 360.0,
            finite_or_zero(saturation).clamp(0.0, 1.0),
            finite_or_zero(value).clamp(0.0, 1.0),
        );
        let rgb: Srgb = Srgb::from_color(hsv);
        Self::rgb(rgb.red, rgb.green, rgb.blue)
    }

    /// Component-wise linear interpolation
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Components clamped into [0, 1] (NaN becomes 0)
    pub fn clamped(self) -> Rgba {
        let c = |v: f32| finite_or_zero(v).clamp(0.0, 1.0);
        Rgba {
            r: c(self.r),
            g: c(self.g),
            b: c(self.b),
            a: c(self.a),
        }
    }

    /// `[r, g, b, a]`
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// The three output colors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorTriple {
    /// Primary color
    pub primary: Rgba,
    /// Secondary color
    pub secondary: Rgba,
    /// Accent color
    pub accent: Rgba,
}

impl Default for ColorTriple {
    fn default() -> Self {
        Self {
            primary: Rgba::BLUE,
            secondary: Rgba::RED,
            accent: Rgba::WHITE,
        }
    }
}

impl ColorTriple {
    /// Every component clamped into [0, 1]
    pub fn clamped(self) -> Self {
        Self {
            primary: self.primary.clamped(),
            secondary: self.secondary.clamped(),
            accent: self.accent.clamped(),
        }
    }
}

/// Strategy selection in the configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorStrategyKind {
    /// Hue rotation
    #[default]
    SpectrumCycle,
    /// Preset gradients
    PresetGradient,
    /// Bands mapped onto RGB
    FrequencyMapped,
}

/// Color strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Active strategy
    pub strategy: ColorStrategyKind,
    /// Built-in preset used by `PresetGradient`
    pub preset: Option<String>,
    /// Preset file; takes precedence over `preset`
    pub preset_path: Option<PathBuf>,
    /// Phase speed multiplier
    pub cycle_speed: f32,
    /// Saturation of the hue cycle
    pub saturation: f32,
    /// Brightness of the hue cycle
    pub brightness: f32,
    /// Hue step between primary, secondary and accent (turns)
    pub hue_offset: f32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            strategy: ColorStrategyKind::SpectrumCycle,
            preset: Some("Rainbow Spectrum".to_string()),
            preset_path: None,
            cycle_speed: 1.0,
            saturation: 0.8,
            brightness: 1.0,
            hue_offset: 0.1,
        }
    }
}

impl ColorConfig {
    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();

        let speed = finite_or(self.cycle_speed, d.cycle_speed);
        self.cycle_speed = fix(c, "color.cycle_speed", self.cycle_speed, speed);

        let saturation = finite_or(self.saturation, d.saturation).clamp(0.0, 1.0);
        self.saturation = fix(c, "color.saturation", self.saturation, saturation);

        let brightness = finite_or(self.brightness, d.brightness).clamp(0.1, 1.0);
        self.brightness = fix(c, "color.brightness", self.brightness, brightness);

        let offset = finite_or(self.hue_offset, d.hue_offset);
        self.hue_offset = fix(c, "color.hue_offset", self.hue_offset, offset);
    }

    /// Resolve the preset for `PresetGradient`: the file if set, else the
    /// named built-in. Failures are logged and yield `None`.
    pub fn resolve_preset(&self) -> Option<ColorPreset> {
        if let Some(path) = &self.preset_path {
            match ColorPreset::load(path) {
                Ok(preset) => return Some(preset),
                Err(e) => warn!("Failed to load color preset {:?}: {}", path, e),
            }
        }
        let name = self.preset.as_deref()?;
        match ColorPreset::builtin_named(name) {
            Ok(preset) => Some(preset),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}

/// Runtime color strategy
#[derive(Debug, Clone, PartialEq)]
pub enum ColorStrategy {
    /// Hue rotation
    SpectrumCycle,
    /// Preset gradients; without a preset this behaves like `SpectrumCycle`
    PresetGradient(Option<ColorPreset>),
    /// Bands mapped onto RGB
    FrequencyMapped,
}

impl ColorStrategy {
    /// Build the strategy selected by a configuration
    pub fn from_config(config: &ColorConfig) -> Self {
        match config.strategy {
            ColorStrategyKind::SpectrumCycle => Self::SpectrumCycle,
            ColorStrategyKind::PresetGradient => Self::PresetGradient(config.resolve_preset()),
            ColorStrategyKind::FrequencyMapped => Self::FrequencyMapped,
        }
    }

    fn kind(&self) -> ColorStrategyKind {
        match self {
            Self::SpectrumCycle => ColorStrategyKind::SpectrumCycle,
            Self::PresetGradient(_) => ColorStrategyKind::PresetGradient,
            Self::FrequencyMapped => ColorStrategyKind::FrequencyMapped,
        }
    }
}

/// Runs the active color strategy
pub struct ColorEngine {
    config: ColorConfig,
    strategy: ColorStrategy,
    accumulator: f32,
    current: ColorTriple,
}

impl ColorEngine {
    /// Create an engine with an explicit strategy
    pub fn new(config: ColorConfig, strategy: ColorStrategy) -> Self {
        if matches!(strategy, ColorStrategy::PresetGradient(None)) {
            debug!("No color preset bound; using the spectrum cycle");
        }
        Self {
            config,
            strategy,
            accumulator: 0.0,
            current: ColorTriple::default(),
        }
    }

    /// Create an engine with the strategy the configuration selects
    pub fn from_config(config: ColorConfig) -> Self {
        let strategy = ColorStrategy::from_config(&config);
        Self::new(config, strategy)
    }

    /// Switch strategy; entering `SpectrumCycle` restarts the free-running phase
    pub fn set_strategy(&mut self, strategy: ColorStrategy) {
        if strategy.kind() == ColorStrategyKind::SpectrumCycle
            && self.strategy.kind() != ColorStrategyKind::SpectrumCycle
        {
            self.accumulator = 0.0;
        }
        debug!("Color strategy: {:?}", strategy.kind());
        self.strategy = strategy;
    }

    /// Produce this tick's colors
    pub fn update(
        &mut self,
        dt: f32,
        bands: &BandValues,
        playback: Option<Playback>,
    ) -> ColorTriple {
        let phase = match self.strategy {
            ColorStrategy::FrequencyMapped => 0.0,
            _ => self.advance_phase(dt, playback),
        };
        self.current = match &self.strategy {
            ColorStrategy::FrequencyMapped => frequency_mapped(bands),
            ColorStrategy::PresetGradient(Some(preset)) => preset.sample(wrap_phase(phase)),
            ColorStrategy::SpectrumCycle | ColorStrategy::PresetGradient(None) => {
                self.spectrum_cycle(phase)
            }
        };
        self.current
    }

    fn advance_phase(&mut self, dt: f32, playback: Option<Playback>) -> f32 {
        match playback.and_then(|p| p.progress()) {
            Some(progress) => progress * self.config.cycle_speed,
            None => {
                let step = finite_or_zero(dt).max(0.0) * self.config.cycle_speed * 0.1;
                self.accumulator = (self.accumulator + step).rem_euclid(1.0);
                self.accumulator
            }
        }
    }

    fn spectrum_cycle(&self, phase: f32) -> ColorTriple {
        let ColorConfig {
            saturation,
            brightness,
            hue_offset,
            ..
        } = self.config;
        ColorTriple {
            primary: Rgba::from_hsv(phase, saturation, brightness),
            secondary: Rgba::from_hsv(phase + hue_offset, saturation, brightness),
            accent: Rgba::from_hsv(phase + 2.0 * hue_offset, saturation, brightness),
        }
    }

    /// Colors of the last update
    pub fn current(&self) -> ColorTriple {
        self.current
    }

    /// Active strategy
    pub fn strategy(&self) -> &ColorStrategy {
        &self.strategy
    }

    /// Free-running phase in [0, 1)
    pub fn phase(&self) -> f32 {
        self.accumulator
    }
}

fn wrap_phase(phase: f32) -> f32 {
    // Keep the end of the track on the last key instead of wrapping to the first
    if phase > 0.0 && phase.rem_euclid(1.0) == 0.0 {
        1.0
    } else {
        phase.rem_euclid(1.0)
    }
}

fn frequency_mapped(bands: &BandValues) -> ColorTriple {
    let (b, m, t) = (bands.bass, bands.mid, bands.treble);
    ColorTriple {
        primary: Rgba::rgb(b, m, t),
        secondary: Rgba::rgb(t, b, m),
        accent: Rgba::rgb(m, t, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgba, b: Rgba) -> bool {
        a.to_array()
            .iter()
            .zip(b.to_array())
            .all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn test_hsv_primaries() {
        assert!(close(Rgba::from_hsv(0.0, 1.0, 1.0), Rgba::RED));
        assert!(close(Rgba::from_hsv(1.0 / 3.0, 1.0, 1.0), Rgba::rgb(0.0, 1.0, 0.0)));
        assert!(close(Rgba::from_hsv(2.0 / 3.0, 1.0, 1.0), Rgba::BLUE));
        assert!(close(Rgba::from_hsv(1.0, 1.0, 1.0), Rgba::RED));
        assert!(close(Rgba::from_hsv(0.3, 0.0, 1.0), Rgba::WHITE));
    }

    #[test]
    fn test_frequency_mapped_permutation() {
        let mut engine = ColorEngine::new(ColorConfig::default(), ColorStrategy::FrequencyMapped);
        let bands = BandValues {
            bass: 0.9,
            mid: 0.5,
            treble: 0.1,
        };
        let colors = engine.update(0.016, &bands, None);
        assert_eq!(colors.primary, Rgba::rgb(0.9, 0.5, 0.1));
        assert_eq!(colors.secondary, Rgba::rgb(0.1, 0.9, 0.5));
        assert_eq!(colors.accent, Rgba::rgb(0.5, 0.1, 0.9));
    }

    #[test]
    fn test_spectrum_cycle_uses_track_progress() {
        let config = ColorConfig {
            saturation: 1.0,
            hue_offset: 0.25,
            ..Default::default()
        };
        let mut engine = ColorEngine::new(config, ColorStrategy::SpectrumCycle);
        let playback = Playback {
            position: 0.0,
            duration: Some(60.0),
        };
        let colors = engine.update(0.016, &BandValues::default(), Some(playback));
        assert!(close(colors.primary, Rgba::RED));
        // 0.5 turns: cyan
        assert!(close(colors.accent, Rgba::rgb(0.0, 1.0, 1.0)));
        assert_eq!(engine.phase(), 0.0);
    }

    #[test]
    fn test_free_running_phase() {
        let mut engine = ColorEngine::new(ColorConfig::default(), ColorStrategy::SpectrumCycle);
        engine.update(1.0, &BandValues::default(), None);
        assert!((engine.phase() - 0.1).abs() < 1e-6);

        // Wraps around
        for _ in 0..10 {
            engine.update(1.0, &BandValues::default(), None);
        }
        assert!((engine.phase() - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_switching_into_cycle_resets_phase() {
        let mut engine = ColorEngine::new(ColorConfig::default(), ColorStrategy::SpectrumCycle);
        engine.update(2.0, &BandValues::default(), None);
        assert!(engine.phase() > 0.0);

        engine.set_strategy(ColorStrategy::FrequencyMapped);
        engine.set_strategy(ColorStrategy::SpectrumCycle);
        assert_eq!(engine.phase(), 0.0);
    }

    #[test]
    fn test_preset_without_binding_falls_back_to_cycle() {
        let mut unbound =
            ColorEngine::new(ColorConfig::default(), ColorStrategy::PresetGradient(None));
        let mut cycle = ColorEngine::new(ColorConfig::default(), ColorStrategy::SpectrumCycle);
        let a = unbound.update(0.5, &BandValues::default(), None);
        let b = cycle.update(0.5, &BandValues::default(), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_preset_gradient_samples_progress() {
        let preset = ColorPreset::warm_sunset();
        let mut engine = ColorEngine::new(
            ColorConfig::default(),
            ColorStrategy::PresetGradient(Some(preset.clone())),
        );
        let end = Playback {
            position: 120.0,
            duration: Some(120.0),
        };
        let colors = engine.update(0.016, &BandValues::default(), Some(end));
        assert_eq!(colors, preset.sample(1.0));
    }

    #[test]
    fn test_resolve_unknown_preset() {
        let config = ColorConfig {
            strategy: ColorStrategyKind::PresetGradient,
            preset: Some("Nope".to_string()),
            ..Default::default()
        };
        assert_eq!(ColorStrategy::from_config(&config), ColorStrategy::PresetGradient(None));
    }

    #[test]
    fn test_sanitize_brightness_and_saturation() {
        let mut config = ColorConfig {
            saturation: 1.5,
            brightness: 0.0,
            ..Default::default()
        };
        let mut corrections = Vec::new();
        config.sanitize(&mut corrections);
        assert_eq!(config.saturation, 1.0);
        assert_eq!(config.brightness, 0.1);
        assert_eq!(corrections.len(), 2);
    }
}
