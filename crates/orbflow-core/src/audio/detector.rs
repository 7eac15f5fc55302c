//! Adaptive-threshold event detector
//!
//! One implementation serves both the beat detector (input: raw bass) and the
//! volume-spike detector (input: total energy). An event fires when the input
//! exceeds its own moving average by a multiplier and the cooldown has passed.

use crate::config::{finite_or, fix, ConfigCorrection};
use crate::{approach_factor, finite_or_zero};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// What happens to the moving average while detection is disabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisabledHistory {
    /// Keep updating the average from the input
    #[default]
    Track,
    /// Drop the history; the next enabled tick reseeds it from the input
    Reset,
    /// Keep the average exactly as it was when disabled
    Freeze,
}

/// Which signal a detector watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// Beat detection on raw bass energy
    Beat,
    /// Volume-spike detection on total energy
    VolumeSpike,
}

impl DetectorKind {
    /// Configuration section name
    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Beat => "beat",
            DetectorKind::VolumeSpike => "volume_spike",
        }
    }

    /// Default configuration for this kind
    pub fn default_config(self) -> DetectorConfig {
        match self {
            DetectorKind::Beat => DetectorConfig::beat(),
            DetectorKind::VolumeSpike => DetectorConfig::volume_spike(),
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detection on/off
    pub enabled: bool,
    /// Input must exceed `moving_average * threshold_multiplier`
    pub threshold_multiplier: f32,
    /// Minimum seconds between two events
    pub cooldown_seconds: f32,
    /// Length of the pulse following an event
    pub pulse_duration_seconds: f32,
    /// Response rate of the moving average (per second)
    pub average_rate: f32,
    /// Input must also exceed this floor
    pub min_input: f32,
    /// History policy while disabled
    pub disabled_history: DisabledHistory,
}

/// A volume-spike section; absent fields keep the volume-spike defaults
#[derive(Debug, Deserialize)]
#[serde(default)]
struct VolumeSpikeSection {
    enabled: bool,
    threshold_multiplier: f32,
    cooldown_seconds: f32,
    pulse_duration_seconds: f32,
    average_rate: f32,
    min_input: f32,
    disabled_history: DisabledHistory,
}

impl Default for VolumeSpikeSection {
    fn default() -> Self {
        DetectorConfig::volume_spike().into()
    }
}

impl From<DetectorConfig> for VolumeSpikeSection {
    fn from(c: DetectorConfig) -> Self {
        Self {
            enabled: c.enabled,
            threshold_multiplier: c.threshold_multiplier,
            cooldown_seconds: c.cooldown_seconds,
            pulse_duration_seconds: c.pulse_duration_seconds,
            average_rate: c.average_rate,
            min_input: c.min_input,
            disabled_history: c.disabled_history,
        }
    }
}

impl From<VolumeSpikeSection> for DetectorConfig {
    fn from(s: VolumeSpikeSection) -> Self {
        Self {
            enabled: s.enabled,
            threshold_multiplier: s.threshold_multiplier,
            cooldown_seconds: s.cooldown_seconds,
            pulse_duration_seconds: s.pulse_duration_seconds,
            average_rate: s.average_rate,
            min_input: s.min_input,
            disabled_history: s.disabled_history,
        }
    }
}

/// Deserialize a detector section on top of [`DetectorConfig::volume_spike`]
pub fn deserialize_volume_spike<'de, D>(deserializer: D) -> Result<DetectorConfig, D::Error>
where
    D: Deserializer<'de>,
{
    VolumeSpikeSection::deserialize(deserializer).map(DetectorConfig::from)
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::beat()
    }
}

impl DetectorConfig {
    /// Beat detector defaults
    pub fn beat() -> Self {
        Self {
            enabled: true,
            threshold_multiplier: 1.3,
            cooldown_seconds: 0.2,
            pulse_duration_seconds: 0.1,
            average_rate: 2.0,
            min_input: 0.0,
            disabled_history: DisabledHistory::Track,
        }
    }

    /// Volume-spike detector defaults
    pub fn volume_spike() -> Self {
        Self {
            threshold_multiplier: 1.5,
            cooldown_seconds: 0.15,
            pulse_duration_seconds: 0.4,
            ..Self::beat()
        }
    }

    pub(crate) fn sanitize(&mut self, kind: DetectorKind, c: &mut Vec<ConfigCorrection>) {
        let d = kind.default_config();
        let section = kind.name();

        let threshold = finite_or(self.threshold_multiplier, d.threshold_multiplier).max(1.0);
        self.threshold_multiplier = fix(
            c,
            &format!("{section}.threshold_multiplier"),
            self.threshold_multiplier,
            threshold,
        );

        let cooldown = finite_or(self.cooldown_seconds, d.cooldown_seconds).max(0.0);
        self.cooldown_seconds = fix(
            c,
            &format!("{section}.cooldown_seconds"),
            self.cooldown_seconds,
            cooldown,
        );

        let pulse = finite_or(self.pulse_duration_seconds, d.pulse_duration_seconds).max(0.0);
        self.pulse_duration_seconds = fix(
            c,
            &format!("{section}.pulse_duration_seconds"),
            self.pulse_duration_seconds,
            pulse,
        );

        let rate = finite_or(self.average_rate, d.average_rate).max(0.0);
        self.average_rate = fix(c, &format!("{section}.average_rate"), self.average_rate, rate);

        let floor = finite_or(self.min_input, d.min_input);
        self.min_input = fix(c, &format!("{section}.min_input"), self.min_input, floor);
    }
}

/// Mutable detector state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorState {
    /// Exponential moving average of the input
    pub moving_average: f32,
    /// Time of the last event (negative infinity before the first)
    pub last_event_time: f64,
    /// Seconds of pulse left
    pub pulse_remaining: f32,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self {
            moving_average: 0.0,
            last_event_time: f64::NEG_INFINITY,
            pulse_remaining: 0.0,
        }
    }
}

/// Adaptive-threshold detector
#[derive(Debug, Clone)]
pub struct AdaptiveDetector {
    kind: DetectorKind,
    config: DetectorConfig,
    state: DetectorState,
    seeded: bool,
    event_count: u64,
}

impl AdaptiveDetector {
    /// Create a detector
    pub fn new(kind: DetectorKind, config: DetectorConfig) -> Self {
        Self {
            kind,
            config,
            state: DetectorState::default(),
            seeded: false,
            event_count: 0,
        }
    }

    /// Feed one input sample at time `now`; returns true when an event fires
    pub fn update(&mut self, input: f32, now: f64, dt: f32) -> bool {
        let input = finite_or_zero(input);
        let dt = finite_or_zero(dt).max(0.0);

        if !self.config.enabled {
            self.state.pulse_remaining = 0.0;
            match self.config.disabled_history {
                DisabledHistory::Track => self.track(input, dt),
                DisabledHistory::Reset => {
                    self.seeded = false;
                    self.state.moving_average = 0.0;
                }
                DisabledHistory::Freeze => {}
            }
            return false;
        }

        self.decay(dt);

        // First sample seeds the average so there is no trigger from empty history
        if !self.seeded {
            self.track(input, dt);
            return false;
        }

        let threshold = self.state.moving_average * self.config.threshold_multiplier;
        let fired = input > threshold
            && input > self.config.min_input
            && now - self.state.last_event_time > self.config.cooldown_seconds as f64;

        if fired {
            self.state.last_event_time = now;
            self.state.pulse_remaining = self.config.pulse_duration_seconds;
            self.event_count += 1;
            debug!(
                "{:?} event at {:.3}s: input={:.3}, average={:.3}",
                self.kind, now, input, self.state.moving_average
            );
        }

        self.track(input, dt);
        fired
    }

    /// Count down the pulse without feeding input
    pub fn decay(&mut self, dt: f32) {
        let dt = finite_or_zero(dt).max(0.0);
        self.state.pulse_remaining = (self.state.pulse_remaining - dt).max(0.0);
    }

    fn track(&mut self, input: f32, dt: f32) {
        if self.seeded {
            let t = approach_factor(dt, self.config.average_rate);
            let average = &mut self.state.moving_average;
            *average += (input - *average) * t;
        } else {
            self.state.moving_average = input;
            self.seeded = true;
        }
    }

    /// Normalized pulse in [0, 1]; 0 when idle or disabled
    pub fn pulse(&self) -> f32 {
        let duration = self.config.pulse_duration_seconds;
        if !self.config.enabled || duration <= 0.0 {
            return 0.0;
        }
        (self.state.pulse_remaining / duration).clamp(0.0, 1.0)
    }

    /// Enable or disable detection
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            debug!("{:?} detection {}", self.kind, if enabled { "enabled" } else { "disabled" });
        }
        self.config.enabled = enabled;
        if !enabled {
            self.state.pulse_remaining = 0.0;
        }
    }

    /// Whether detection is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Clear all history
    pub fn reset(&mut self) {
        self.state = DetectorState::default();
        self.seeded = false;
    }

    /// Detector kind
    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Current state
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Configuration in use
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Events fired since creation
    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}
