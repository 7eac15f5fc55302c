//! Parameter Fusion - combines band energies, event pulses, the clearance
//! radius and the color triple into the final clamped parameter set.
//!
//! Every field is clamped into its configured range as the last step, so the
//! sink always sees an in-range, fully populated set.

use crate::audio::BandValues;
use crate::color::{ColorTriple, Rgba};
use crate::config::{finite_or, fix, ConfigCorrection};
use crate::sink::{names, RenderParameterSink};
use crate::smoothstep;
use serde::{Deserialize, Serialize};

/// Inclusive output range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl ParamRange {
    /// Create a range
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Map `t` in [0, 1] linearly onto the range (`t` is clamped, NaN is 0)
    pub fn remap(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.min + (self.max - self.min) * t
    }

    /// Clamp into the range; NaN becomes `min`
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Whether `value` lies in the range
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn sanitize(&mut self, field: &str, default: ParamRange, c: &mut Vec<ConfigCorrection>) {
        let min = finite_or(self.min, default.min);
        self.min = fix(c, &format!("{field}.min"), self.min, min);
        let max = finite_or(self.max, default.max);
        self.max = fix(c, &format!("{field}.max"), self.max, max);

        if self.min > self.max {
            let (min, max) = (self.max, self.min);
            self.min = fix(c, &format!("{field}.min"), self.min, min);
            self.max = fix(c, &format!("{field}.max"), self.max, max);
        }
    }
}

/// Output range of every numeric parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputRanges {
    /// `AudioBass`
    pub bass: ParamRange,
    /// `AudioMid`
    pub mid: ParamRange,
    /// `AudioTreble`
    pub treble: ParamRange,
    /// `Energy`
    pub energy: ParamRange,
    /// `TurbulenceIntensity`
    pub turbulence: ParamRange,
    /// Outer radius
    pub outer_radius: ParamRange,
    /// Inner radius
    pub inner_radius: ParamRange,
}

impl Default for OutputRanges {
    fn default() -> Self {
        Self {
            bass: ParamRange::new(0.0, 1.0),
            mid: ParamRange::new(0.0, 1.0),
            treble: ParamRange::new(0.0, 1.0),
            energy: ParamRange::new(50.0, 400.0),
            turbulence: ParamRange::new(0.5, 5.0),
            outer_radius: ParamRange::new(0.2, 1.5),
            inner_radius: ParamRange::new(0.8, 1.8),
        }
    }
}

impl OutputRanges {
    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();
        self.bass.sanitize("ranges.bass", d.bass, c);
        self.mid.sanitize("ranges.mid", d.mid, c);
        self.treble.sanitize("ranges.treble", d.treble, c);
        self.energy.sanitize("ranges.energy", d.energy, c);
        self.turbulence.sanitize("ranges.turbulence", d.turbulence, c);
        self.outer_radius.sanitize("ranges.outer_radius", d.outer_radius, c);
        self.inner_radius.sanitize("ranges.inner_radius", d.inner_radius, c);
    }
}

/// Values written when there is no audio, or for disabled modulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackValues {
    /// `AudioBass`
    pub bass: f32,
    /// `AudioMid`
    pub mid: f32,
    /// `AudioTreble`
    pub treble: f32,
    /// `Energy`
    pub energy: f32,
    /// `TurbulenceIntensity`
    pub turbulence: f32,
    /// Outer radius
    pub outer_radius: f32,
    /// Inner radius (also used while audio is present)
    pub inner_radius: f32,
    /// Colors
    pub colors: ColorTriple,
}

impl Default for FallbackValues {
    fn default() -> Self {
        Self {
            bass: 0.1,
            mid: 0.1,
            treble: 0.1,
            energy: 100.0,
            turbulence: 1.0,
            outer_radius: 0.4,
            inner_radius: 1.6,
            colors: ColorTriple::default(),
        }
    }
}

impl FallbackValues {
    pub(crate) fn sanitize(&mut self, ranges: &OutputRanges, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();
        let mut value = |field: &str, v: &mut f32, default: f32, range: ParamRange| {
            let corrected = range.clamp(finite_or(*v, range.clamp(default)));
            *v = fix(c, field, *v, corrected);
        };
        value("fallback.bass", &mut self.bass, d.bass, ranges.bass);
        value("fallback.mid", &mut self.mid, d.mid, ranges.mid);
        value("fallback.treble", &mut self.treble, d.treble, ranges.treble);
        value("fallback.energy", &mut self.energy, d.energy, ranges.energy);
        value("fallback.turbulence", &mut self.turbulence, d.turbulence, ranges.turbulence);
        value("fallback.outer_radius", &mut self.outer_radius, d.outer_radius, ranges.outer_radius);
        value("fallback.inner_radius", &mut self.inner_radius, d.inner_radius, ranges.inner_radius);

        let colors = &mut self.colors;
        for (name, color) in [
            ("primary", &mut colors.primary),
            ("secondary", &mut colors.secondary),
            ("accent", &mut colors.accent),
        ] {
            let clamped = color.clamped();
            for (channel, v, corrected) in [
                ("r", &mut color.r, clamped.r),
                ("g", &mut color.g, clamped.g),
                ("b", &mut color.b, clamped.b),
                ("a", &mut color.a, clamped.a),
            ] {
                *v = fix(c, &format!("fallback.colors.{name}.{channel}"), *v, corrected);
            }
        }
    }
}

/// How the outer radius is produced while audio is present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadiusStrategy {
    /// Smoothed bass remapped into the outer radius range
    #[default]
    BassMapped,
    /// Clearance solver radius plus an eased volume-spike pulse
    ClearanceModulated,
}

/// Fusion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Drive the band outputs from audio
    pub update_bands: bool,
    /// Drive the colors from the color strategy
    pub update_colors: bool,
    /// Drive energy from audio
    pub modulate_energy: bool,
    /// Drive turbulence from audio
    pub modulate_turbulence: bool,
    /// Drive the outer radius from audio
    pub modulate_radius: bool,
    /// Energy before any modulation
    pub base_energy: f32,
    /// Scales the weighted band term
    pub energy_multiplier: f32,
    /// Bass weight in the energy term
    pub bass_weight: f32,
    /// Mid weight in the energy term
    pub mid_weight: f32,
    /// Scale of the weighted band term
    pub energy_scale: f32,
    /// Energy added at full beat pulse
    pub beat_pulse_magnitude: f32,
    /// Turbulence before modulation
    pub turbulence_base: f32,
    /// Scales `mid + treble` in the turbulence term
    pub turbulence_scale: f32,
    /// Outer radius strategy
    pub radius_strategy: RadiusStrategy,
    /// Radius added at full volume-spike pulse (`ClearanceModulated`)
    pub radius_pulse_amount: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            update_bands: true,
            update_colors: true,
            modulate_energy: true,
            modulate_turbulence: true,
            modulate_radius: true,
            base_energy: 100.0,
            energy_multiplier: 2.0,
            bass_weight: 0.8,
            mid_weight: 0.3,
            energy_scale: 50.0,
            beat_pulse_magnitude: 200.0,
            turbulence_base: 1.0,
            turbulence_scale: 2.0,
            radius_strategy: RadiusStrategy::BassMapped,
            radius_pulse_amount: 0.3,
        }
    }
}

impl FusionConfig {
    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();
        let mut finite = |field: &str, v: &mut f32, default: f32| {
            *v = fix(c, field, *v, finite_or(*v, default));
        };
        finite("fusion.base_energy", &mut self.base_energy, d.base_energy);
        finite("fusion.energy_multiplier", &mut self.energy_multiplier, d.energy_multiplier);
        finite("fusion.bass_weight", &mut self.bass_weight, d.bass_weight);
        finite("fusion.mid_weight", &mut self.mid_weight, d.mid_weight);
        finite("fusion.energy_scale", &mut self.energy_scale, d.energy_scale);
        finite("fusion.turbulence_base", &mut self.turbulence_base, d.turbulence_base);
        finite("fusion.turbulence_scale", &mut self.turbulence_scale, d.turbulence_scale);

        let magnitude = finite_or(self.beat_pulse_magnitude, d.beat_pulse_magnitude).max(0.0);
        self.beat_pulse_magnitude = fix(
            c,
            "fusion.beat_pulse_magnitude",
            self.beat_pulse_magnitude,
            magnitude,
        );
        let amount = finite_or(self.radius_pulse_amount, d.radius_pulse_amount).max(0.0);
        self.radius_pulse_amount = fix(
            c,
            "fusion.radius_pulse_amount",
            self.radius_pulse_amount,
            amount,
        );
    }
}

/// Everything fusion reads in one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionInputs {
    /// Smoothed bands in [0, 1]
    pub bands: BandValues,
    /// Normalized beat pulse
    pub beat_pulse: f32,
    /// Normalized volume-spike pulse
    pub spike_pulse: f32,
    /// Whether volume-spike detection is enabled
    pub spike_enabled: bool,
    /// Clearance solver's current radius, if a solver is attached
    pub clearance_radius: Option<f32>,
    /// Colors for this tick
    pub colors: ColorTriple,
}

/// The fixed-shape parameter set written to the sink every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputParameterSet {
    /// `AudioBass`
    pub bass: f32,
    /// `AudioMid`
    pub mid: f32,
    /// `AudioTreble`
    pub treble: f32,
    /// `Energy`
    pub energy: f32,
    /// `TurbulenceIntensity`
    pub turbulence: f32,
    /// `ParticleBoundary_radius`
    pub outer_radius: f32,
    /// `ParticleInternal_radius`
    pub inner_radius: f32,
    /// `PrimaryColor`
    pub primary: Rgba,
    /// `SecondaryColor`
    pub secondary: Rgba,
    /// `AccentColor`
    pub accent: Rgba,
}

impl OutputParameterSet {
    /// The static set used while there is no signal
    pub fn fallback(fallback: &FallbackValues, ranges: &OutputRanges) -> Self {
        Self {
            bass: fallback.bass,
            mid: fallback.mid,
            treble: fallback.treble,
            energy: fallback.energy,
            turbulence: fallback.turbulence,
            outer_radius: fallback.outer_radius,
            inner_radius: fallback.inner_radius,
            primary: fallback.colors.primary,
            secondary: fallback.colors.secondary,
            accent: fallback.colors.accent,
        }
        .clamped(ranges)
    }

    /// Fuse one tick of audio-driven inputs
    pub fn fuse(
        config: &FusionConfig,
        ranges: &OutputRanges,
        fallback: &FallbackValues,
        inputs: &FusionInputs,
    ) -> Self {
        let bands = inputs.bands;

        let (bass, mid, treble) = if config.update_bands {
            (
                ranges.bass.remap(bands.bass),
                ranges.mid.remap(bands.mid),
                ranges.treble.remap(bands.treble),
            )
        } else {
            (fallback.bass, fallback.mid, fallback.treble)
        };

        let energy = if config.modulate_energy {
            let weighted = bands.bass * config.bass_weight + bands.mid * config.mid_weight;
            config.base_energy
                + inputs.beat_pulse * config.beat_pulse_magnitude
                + weighted * config.energy_multiplier * config.energy_scale
        } else {
            fallback.energy
        };

        let turbulence = if config.modulate_turbulence {
            config.turbulence_base + (bands.mid + bands.treble) * config.turbulence_scale
        } else {
            fallback.turbulence
        };

        let outer_radius = if !config.modulate_radius {
            fallback.outer_radius
        } else {
            match (config.radius_strategy, inputs.clearance_radius) {
                (RadiusStrategy::BassMapped, _) => ranges.outer_radius.remap(bands.bass),
                (RadiusStrategy::ClearanceModulated, Some(base)) if inputs.spike_enabled => {
                    base + smoothstep(inputs.spike_pulse) * config.radius_pulse_amount
                }
                (RadiusStrategy::ClearanceModulated, _) => fallback.outer_radius,
            }
        };

        Self {
            bass,
            mid,
            treble,
            energy,
            turbulence,
            outer_radius,
            inner_radius: fallback.inner_radius,
            primary: inputs.colors.primary,
            secondary: inputs.colors.secondary,
            accent: inputs.colors.accent,
        }
        .clamped(ranges)
    }

    /// Every field clamped into its range, colors into [0, 1]
    pub fn clamped(self, ranges: &OutputRanges) -> Self {
        Self {
            bass: ranges.bass.clamp(self.bass),
            mid: ranges.mid.clamp(self.mid),
            treble: ranges.treble.clamp(self.treble),
            energy: ranges.energy.clamp(self.energy),
            turbulence: ranges.turbulence.clamp(self.turbulence),
            outer_radius: ranges.outer_radius.clamp(self.outer_radius),
            inner_radius: ranges.inner_radius.clamp(self.inner_radius),
            primary: self.primary.clamped(),
            secondary: self.secondary.clamped(),
            accent: self.accent.clamped(),
        }
    }

    /// Whether every numeric field lies in its range
    pub fn is_within(&self, ranges: &OutputRanges) -> bool {
        let colors_ok = [self.primary, self.secondary, self.accent]
            .iter()
            .flat_map(|c| c.to_array())
            .all(|v| (0.0..=1.0).contains(&v));

        ranges.bass.contains(self.bass)
            && ranges.mid.contains(self.mid)
            && ranges.treble.contains(self.treble)
            && ranges.energy.contains(self.energy)
            && ranges.turbulence.contains(self.turbulence)
            && ranges.outer_radius.contains(self.outer_radius)
            && ranges.inner_radius.contains(self.inner_radius)
            && colors_ok
    }

    /// Write every field to the sink
    pub fn write_to(&self, sink: &mut dyn RenderParameterSink) {
        sink.set_float(names::AUDIO_BASS, self.bass);
        sink.set_float(names::AUDIO_MID, self.mid);
        sink.set_float(names::AUDIO_TREBLE, self.treble);
        sink.set_float(names::ENERGY, self.energy);
        sink.set_float(names::TURBULENCE, self.turbulence);
        sink.set_float(names::OUTER_RADIUS, self.outer_radius);
        sink.set_float(names::INNER_RADIUS, self.inner_radius);
        sink.set_color(names::PRIMARY_COLOR, self.primary);
        sink.set_color(names::SECONDARY_COLOR, self.secondary);
        sink.set_color(names::ACCENT_COLOR, self.accent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ParameterTable;

    fn inputs(bands: BandValues) -> FusionInputs {
        FusionInputs {
            bands,
            beat_pulse: 0.0,
            spike_pulse: 0.0,
            spike_enabled: true,
            clearance_radius: None,
            colors: ColorTriple::default(),
        }
    }

    fn fuse(config: &FusionConfig, inputs: &FusionInputs) -> OutputParameterSet {
        OutputParameterSet::fuse(
            config,
            &OutputRanges::default(),
            &FallbackValues::default(),
            inputs,
        )
    }

    #[test]
    fn test_energy_formula() {
        let config = FusionConfig::default();
        let mut i = inputs(BandValues {
            bass: 0.5,
            mid: 0.5,
            treble: 0.0,
        });
        // 100 + (0.4 + 0.15) * 2 * 50
        assert!((fuse(&config, &i).energy - 155.0).abs() < 1e-3);

        i.beat_pulse = 0.5;
        assert!((fuse(&config, &i).energy - 255.0).abs() < 1e-3);

        i.beat_pulse = 1.0;
        i.bands = BandValues::splat(1.0);
        assert_eq!(fuse(&config, &i).energy, 400.0);
    }

    #[test]
    fn test_turbulence_formula() {
        let config = FusionConfig::default();
        let out = fuse(
            &config,
            &inputs(BandValues {
                bass: 0.0,
                mid: 0.25,
                treble: 0.5,
            }),
        );
        assert!((out.turbulence - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_bass_mapped_radius() {
        let config = FusionConfig::default();
        let out = fuse(&config, &inputs(BandValues::splat(0.5)));
        assert!((out.outer_radius - 0.85).abs() < 1e-6);
        assert_eq!(out.inner_radius, 1.6);
    }

    #[test]
    fn test_clearance_modulated_radius() {
        let config = FusionConfig {
            radius_strategy: RadiusStrategy::ClearanceModulated,
            ..Default::default()
        };
        let mut i = inputs(BandValues::splat(1.0));
        i.clearance_radius = Some(0.5);
        assert_eq!(fuse(&config, &i).outer_radius, 0.5);

        i.spike_pulse = 1.0;
        assert!((fuse(&config, &i).outer_radius - 0.8).abs() < 1e-6);

        i.spike_enabled = false;
        assert_eq!(fuse(&config, &i).outer_radius, 0.4);

        i.spike_enabled = true;
        i.clearance_radius = None;
        assert_eq!(fuse(&config, &i).outer_radius, 0.4);
    }

    #[test]
    fn test_disabled_modulation_uses_fallback() {
        let config = FusionConfig {
            update_bands: false,
            modulate_energy: false,
            modulate_turbulence: false,
            modulate_radius: false,
            ..Default::default()
        };
        let out = fuse(&config, &inputs(BandValues::splat(1.0)));
        let fallback = OutputParameterSet::fallback(
            &FallbackValues::default(),
            &OutputRanges::default(),
        );
        assert_eq!(out, fallback);
    }

    #[test]
    fn test_nan_inputs_stay_in_range() {
        let config = FusionConfig::default();
        let mut i = inputs(BandValues::splat(f32::NAN));
        i.beat_pulse = f32::NAN;
        i.colors.primary.r = f32::NAN;
        let out = fuse(&config, &i);
        assert!(out.is_within(&OutputRanges::default()));
    }

    #[test]
    fn test_range_sanitize_swaps() {
        let mut range = ParamRange::new(5.0, 1.0);
        let mut corrections = Vec::new();
        range.sanitize("ranges.x", ParamRange::new(0.0, 1.0), &mut corrections);
        assert_eq!(range, ParamRange::new(1.0, 5.0));
        assert_eq!(corrections.len(), 2);
    }

    #[test]
    fn test_fallback_colors_are_clamped() {
        let mut fallback = FallbackValues::default();
        fallback.colors.accent.g = 2.0;
        let mut corrections = Vec::new();
        fallback.sanitize(&OutputRanges::default(), &mut corrections);
        assert_eq!(fallback.colors.accent.g, 1.0);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].field, "fallback.colors.accent.g");
    }

    #[test]
    fn test_write_to_sink() {
        let mut table = ParameterTable::new();
        let set = OutputParameterSet::fallback(&FallbackValues::default(), &OutputRanges::default());
        set.write_to(&mut table);

        assert_eq!(table.len(), 10);
        assert_eq!(table.float(names::OUTER_RADIUS), Some(0.4));
        assert_eq!(table.float(names::INNER_RADIUS), Some(1.6));
        assert_eq!(table.color(names::SECONDARY_COLOR), Some(Rgba::RED));
    }
}
