//! Color gradients - time-ordered color keys sampled in [0, 1]

use super::Rgba;
use serde::{Deserialize, Serialize};

/// How colors between two keys are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientBlend {
    /// Linear interpolation
    #[default]
    Blend,
    /// Hold the earlier key until the next one
    Fixed,
}

/// A color at a position in the gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientKey {
    /// Position in [0, 1]
    pub time: f32,
    /// Color at this position
    pub color: Rgba,
}

impl GradientKey {
    /// Create a key
    pub fn new(time: f32, color: Rgba) -> Self {
        Self { time, color }
    }
}

/// Color gradient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    keys: Vec<GradientKey>,
    #[serde(default)]
    blend: GradientBlend,
}

impl Gradient {
    /// Build a gradient; keys are sorted and their times clamped into [0, 1]
    pub fn new(keys: Vec<GradientKey>, blend: GradientBlend) -> Self {
        let mut gradient = Self { keys, blend };
        gradient.normalize();
        gradient
    }

    /// Blended gradient from `(time, color)` pairs
    pub fn from_stops(stops: &[(f32, Rgba)]) -> Self {
        Self::new(
            stops
                .iter()
                .map(|&(time, color)| GradientKey::new(time, color))
                .collect(),
            GradientBlend::Blend,
        )
    }

    /// Drop keys with non-finite times, clamp the rest and sort them
    pub fn normalize(&mut self) {
        self.keys.retain(|key| key.time.is_finite());
        for key in &mut self.keys {
            key.time = key.time.clamp(0.0, 1.0);
        }
        self.keys.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Color at `t` (clamped into [0, 1]); white for an empty gradient
    pub fn evaluate(&self, t: f32) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Rgba::WHITE,
        };
        if t <= first.time {
            return first.color;
        }
        if t >= last.time {
            return last.color;
        }

        // keys[i].time <= t < keys[i + 1].time
        let next = self.keys.partition_point(|key| key.time <= t);
        let (a, b) = (&self.keys[next - 1], &self.keys[next]);

        match self.blend {
            GradientBlend::Fixed => a.color,
            GradientBlend::Blend => {
                let span = b.time - a.time;
                let local = if span > 0.0 { (t - a.time) / span } else { 0.0 };
                a.color.lerp(b.color, local)
            }
        }
    }

    /// Keys in time order
    pub fn keys(&self) -> &[GradientKey] {
        &self.keys
    }

    /// Blend mode
    pub fn blend(&self) -> GradientBlend {
        self.blend
    }
}
