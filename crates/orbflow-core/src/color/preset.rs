//! Color presets - three gradients sampled at the same phase

use super::gradient::Gradient;
use super::{ColorTriple, Rgba};
use crate::{file_format, CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A named set of primary / secondary / accent gradients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPreset {
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Primary color curve
    pub primary: Gradient,
    /// Secondary color curve
    pub secondary: Gradient,
    /// Accent color curve
    pub accent: Gradient,
}

const fn rgb(r: f32, g: f32, b: f32) -> Rgba {
    Rgba { r, g, b, a: 1.0 }
}

impl ColorPreset {
    /// Sample all three gradients at `t`
    pub fn sample(&self, t: f32) -> ColorTriple {
        ColorTriple {
            primary: self.primary.evaluate(t),
            secondary: self.secondary.evaluate(t),
            accent: self.accent.evaluate(t),
        }
    }

    /// Full hue sweep on every curve, each starting at a different hue
    pub fn rainbow_spectrum() -> Self {
        let red = rgb(1.0, 0.0, 0.0);
        let orange = rgb(1.0, 0.5, 0.0);
        let yellow = rgb(1.0, 1.0, 0.0);
        let green = rgb(0.0, 1.0, 0.0);
        let cyan = rgb(0.0, 1.0, 1.0);
        let blue = rgb(0.0, 0.0, 1.0);
        let purple = rgb(0.5, 0.0, 1.0);
        let magenta = rgb(1.0, 0.0, 1.0);

        Self {
            name: "Rainbow Spectrum".to_string(),
            description: "Full color cycle through the track".to_string(),
            primary: Gradient::from_stops(&[
                (0.0, red),
                (0.17, orange),
                (0.33, yellow),
                (0.5, green),
                (0.67, blue),
                (0.83, purple),
                (1.0, red),
            ]),
            secondary: Gradient::from_stops(&[
                (0.0, blue),
                (0.17, purple),
                (0.33, red),
                (0.5, orange),
                (0.67, yellow),
                (0.83, green),
                (1.0, blue),
            ]),
            accent: Gradient::from_stops(&[
                (0.0, yellow),
                (0.17, green),
                (0.33, cyan),
                (0.5, rgb(0.0, 0.5, 1.0)),
                (0.67, magenta),
                (0.83, rgb(1.0, 0.5, 0.5)),
                (1.0, yellow),
            ]),
        }
    }

    /// Orange through pink into deep purple
    pub fn warm_sunset() -> Self {
        Self {
            name: "Warm Sunset".to_string(),
            description: "Orange and pink fading into purple".to_string(),
            primary: Gradient::from_stops(&[
                (0.0, rgb(1.0, 0.4, 0.0)),
                (0.25, rgb(1.0, 0.2, 0.2)),
                (0.5, rgb(1.0, 0.0, 0.5)),
                (0.75, rgb(0.6, 0.0, 0.8)),
                (1.0, rgb(0.2, 0.0, 0.5)),
            ]),
            secondary: Gradient::from_stops(&[
                (0.0, rgb(1.0, 0.6, 0.2)),
                (0.25, rgb(1.0, 0.3, 0.3)),
                (0.5, rgb(1.0, 0.2, 0.6)),
                (0.75, rgb(0.7, 0.2, 0.9)),
                (1.0, rgb(0.3, 0.1, 0.6)),
            ]),
            accent: Gradient::from_stops(&[
                (0.0, rgb(1.0, 0.8, 0.4)),
                (0.5, rgb(1.0, 0.5, 0.7)),
                (1.0, rgb(0.8, 0.4, 1.0)),
            ]),
        }
    }

    /// Cyan and blue sinking into dark teal
    pub fn cool_ocean() -> Self {
        Self {
            name: "Cool Ocean".to_string(),
            description: "Bright cyan descending into deep teal".to_string(),
            primary: Gradient::from_stops(&[
                (0.0, rgb(0.0, 0.8, 1.0)),
                (0.25, rgb(0.0, 0.5, 1.0)),
                (0.5, rgb(0.0, 0.3, 0.8)),
                (0.75, rgb(0.0, 0.5, 0.5)),
                (1.0, rgb(0.0, 0.3, 0.3)),
            ]),
            secondary: Gradient::from_stops(&[
                (0.0, rgb(0.2, 1.0, 1.0)),
                (0.25, rgb(0.2, 0.7, 1.0)),
                (0.5, rgb(0.1, 0.5, 0.9)),
                (0.75, rgb(0.2, 0.7, 0.7)),
                (1.0, rgb(0.1, 0.4, 0.4)),
            ]),
            accent: Gradient::from_stops(&[
                (0.0, rgb(0.5, 1.0, 1.0)),
                (0.5, rgb(0.3, 0.8, 1.0)),
                (1.0, rgb(0.4, 1.0, 0.8)),
            ]),
        }
    }

    /// All built-in presets
    pub fn builtins() -> Vec<ColorPreset> {
        vec![
            Self::rainbow_spectrum(),
            Self::warm_sunset(),
            Self::cool_ocean(),
        ]
    }

    /// Built-in preset by name (case-insensitive)
    pub fn builtin_named(name: &str) -> Result<ColorPreset> {
        Self::builtins()
            .into_iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| CoreError::UnknownPreset(name.to_string()))
    }

    /// Load a preset file (`.ron` or `.json`)
    pub fn load(path: &Path) -> Result<Self> {
        let mut preset: ColorPreset = file_format::load(path)?;
        preset.primary.normalize();
        preset.secondary.normalize();
        preset.accent.normalize();
        info!("Loaded color preset '{}' from {:?}", preset.name, path);
        Ok(preset)
    }

    /// Save the preset, choosing the format by extension
    pub fn save(&self, path: &Path) -> Result<()> {
        file_format::save(self, path)
    }
}
