//! Render parameter sink - where the engine writes its outputs by name

use crate::color::Rgba;
use serde::Serialize;
use std::collections::BTreeMap;

/// Parameter names written to the sink
pub mod names {
    /// Smoothed bass, remapped
    pub const AUDIO_BASS: &str = "AudioBass";
    /// Smoothed mid, remapped
    pub const AUDIO_MID: &str = "AudioMid";
    /// Smoothed treble, remapped
    pub const AUDIO_TREBLE: &str = "AudioTreble";
    /// Primary color
    pub const PRIMARY_COLOR: &str = "PrimaryColor";
    /// Secondary color
    pub const SECONDARY_COLOR: &str = "SecondaryColor";
    /// Accent color
    pub const ACCENT_COLOR: &str = "AccentColor";
    /// Energy
    pub const ENERGY: &str = "Energy";
    /// Turbulence
    pub const TURBULENCE: &str = "TurbulenceIntensity";
    /// Outer radius
    pub const OUTER_RADIUS: &str = "ParticleBoundary_radius";
    /// Inner radius
    pub const INNER_RADIUS: &str = "ParticleInternal_radius";

    /// Glow pulse from bass
    pub const GLOW_PULSE: &str = "GlowPulse";
    /// Treble amount
    pub const TREBLE_AMOUNT: &str = "TrebleAmount";
    /// Hover highlight
    pub const HOVER: &str = "Hover";

    /// State profile radius
    pub const RADIUS: &str = "Radius";
    /// State profile spawn rate
    pub const SPAWN_RATE: &str = "SpawnRate";
    /// State profile particle size
    pub const PARTICLE_SIZE: &str = "ParticleSize";
    /// State profile turbulence
    pub const TURBULENCE_STRENGTH: &str = "TurbulenceStrength";
    /// State profile vortex
    pub const VORTEX_STRENGTH: &str = "VortexStrength";
    /// Current orb state as an integer
    pub const ORB_STATE: &str = "OrbState";
}

/// Receives named parameters every tick
pub trait RenderParameterSink {
    /// Set a float parameter
    fn set_float(&mut self, name: &str, value: f32);

    /// Set a color parameter
    fn set_color(&mut self, name: &str, value: Rgba);

    /// Set an integer parameter; written as a float unless overridden
    fn set_int(&mut self, name: &str, value: i32) {
        self.set_float(name, value as f32);
    }
}

impl<T: RenderParameterSink + ?Sized> RenderParameterSink for &mut T {
    fn set_float(&mut self, name: &str, value: f32) {
        (**self).set_float(name, value);
    }

    fn set_color(&mut self, name: &str, value: Rgba) {
        (**self).set_color(name, value);
    }

    fn set_int(&mut self, name: &str, value: i32) {
        (**self).set_int(name, value);
    }
}

impl<T: RenderParameterSink + ?Sized> RenderParameterSink for Box<T> {
    fn set_float(&mut self, name: &str, value: f32) {
        (**self).set_float(name, value);
    }

    fn set_color(&mut self, name: &str, value: Rgba) {
        (**self).set_color(name, value);
    }

    fn set_int(&mut self, name: &str, value: i32) {
        (**self).set_int(name, value);
    }
}

/// A parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Float
    Float(f32),
    /// Color
    Color(Rgba),
    /// Integer
    Int(i32),
}

/// Sink that keeps the latest value of every parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterTable {
    values: BTreeMap<String, ParamValue>,
    #[serde(skip)]
    writes: u64,
}

impl ParameterTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a parameter
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    /// Float parameter (integers are converted)
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            ParamValue::Float(v) => Some(v),
            ParamValue::Int(v) => Some(v as f32),
            ParamValue::Color(_) => None,
        }
    }

    /// Color parameter
    pub fn color(&self, name: &str) -> Option<Rgba> {
        match self.get(name)? {
            ParamValue::Color(c) => Some(c),
            _ => None,
        }
    }

    /// Integer parameter
    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Total number of writes received
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Number of distinct parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Remove every parameter
    pub fn clear(&mut self) {
        self.values.clear();
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        self.writes += 1;
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl RenderParameterSink for ParameterTable {
    fn set_float(&mut self, name: &str, value: f32) {
        self.insert(name, ParamValue::Float(value));
    }

    fn set_color(&mut self, name: &str, value: Rgba) {
        self.insert(name, ParamValue::Color(value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.insert(name, ParamValue::Int(value));
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderParameterSink for NullSink {
    fn set_float(&mut self, _name: &str, _value: f32) {}

    fn set_color(&mut self, _name: &str, _value: Rgba) {}
}
