//! Orb state profiles
//!
//! Each [`OrbState`] has a [`StateProfile`]. Changing state starts a timed
//! transition that eases the written values from the current profile toward
//! the target one.

use crate::config::{finite_or, fix, ConfigCorrection};
use crate::finite_or_zero;
use crate::sink::{names, RenderParameterSink};
use crate::smoothstep;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle state of the orb
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbState {
    /// Just created
    Spawned,
    /// Moving between two states
    Transition,
    /// Loading content
    Load,
    /// Reacting to audio
    Reactive,
    /// Waiting
    #[default]
    Idle,
}

impl OrbState {
    /// All states in declaration order
    pub const ALL: [OrbState; 5] = [
        OrbState::Spawned,
        OrbState::Transition,
        OrbState::Load,
        OrbState::Reactive,
        OrbState::Idle,
    ];

    /// Integer written as `OrbState`
    pub fn as_int(self) -> i32 {
        match self {
            OrbState::Spawned => 0,
            OrbState::Transition => 1,
            OrbState::Load => 2,
            OrbState::Reactive => 3,
            OrbState::Idle => 4,
        }
    }
}

/// Renderer values for one state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateProfile {
    /// Orb radius
    pub radius: f32,
    /// Particles per second
    pub spawn_rate: f32,
    /// Particle size
    pub particle_size: f32,
    /// Turbulence strength
    pub turbulence: f32,
    /// Vortex strength
    pub vortex: f32,
}

impl StateProfile {
    /// Linear blend toward `other`
    pub fn lerp(&self, other: &StateProfile, t: f32) -> StateProfile {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        StateProfile {
            radius: mix(self.radius, other.radius),
            spawn_rate: mix(self.spawn_rate, other.spawn_rate),
            particle_size: mix(self.particle_size, other.particle_size),
            turbulence: mix(self.turbulence, other.turbulence),
            vortex: mix(self.vortex, other.vortex),
        }
    }

    fn sanitize(&mut self, section: &str, default: StateProfile, c: &mut Vec<ConfigCorrection>) {
        for (field, v, d) in [
            ("radius", &mut self.radius, default.radius),
            ("spawn_rate", &mut self.spawn_rate, default.spawn_rate),
            ("particle_size", &mut self.particle_size, default.particle_size),
            ("turbulence", &mut self.turbulence, default.turbulence),
            ("vortex", &mut self.vortex, default.vortex),
        ] {
            let corrected = finite_or(*v, d).max(0.0);
            *v = fix(c, &format!("{section}.{field}"), *v, corrected);
        }
    }
}

/// State profile configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Whether the engine writes profile parameters
    pub enabled: bool,
    /// Seconds a state change takes; zero or less snaps
    pub transition_time: f32,
    /// `Spawned` profile
    pub spawned: StateProfile,
    /// `Transition` profile
    pub transition: StateProfile,
    /// `Load` profile
    pub load: StateProfile,
    /// `Reactive` profile
    pub reactive: StateProfile,
    /// `Idle` profile
    pub idle: StateProfile,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        let profile = |radius, spawn_rate, particle_size, turbulence, vortex| StateProfile {
            radius,
            spawn_rate,
            particle_size,
            turbulence,
            vortex,
        };
        Self {
            enabled: false,
            transition_time: 0.4,
            spawned: profile(0.25, 250.0, 0.5, 0.8, 0.1),
            transition: profile(0.15, 200.0, 0.4, 0.5, 0.2),
            load: profile(0.4, 500.0, 0.8, 1.8, 1.0),
            reactive: profile(0.6, 900.0, 1.0, 2.0, 0.3),
            idle: profile(0.7, 350.0, 0.9, 0.9, 0.2),
        }
    }
}

impl ProfileConfig {
    /// Profile of a state
    pub fn profile(&self, state: OrbState) -> StateProfile {
        match state {
            OrbState::Spawned => self.spawned,
            OrbState::Transition => self.transition,
            OrbState::Load => self.load,
            OrbState::Reactive => self.reactive,
            OrbState::Idle => self.idle,
        }
    }

    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();
        // Negative durations are allowed and mean "snap"
        let time = finite_or(self.transition_time, d.transition_time);
        self.transition_time = fix(c, "profiles.transition_time", self.transition_time, time);

        self.spawned.sanitize("profiles.spawned", d.spawned, c);
        self.transition.sanitize("profiles.transition", d.transition, c);
        self.load.sanitize("profiles.load", d.load, c);
        self.reactive.sanitize("profiles.reactive", d.reactive, c);
        self.idle.sanitize("profiles.idle", d.idle, c);
    }
}

/// Blends between state profiles over time
#[derive(Debug, Clone)]
pub struct StateProfileDriver {
    config: ProfileConfig,
    state: OrbState,
    current: StateProfile,
    start: StateProfile,
    progress: f32,
}

impl StateProfileDriver {
    /// Create a driver resting in the `Idle` profile
    pub fn new(config: ProfileConfig) -> Self {
        let idle = config.profile(OrbState::Idle);
        Self {
            config,
            state: OrbState::Idle,
            current: idle,
            start: idle,
            progress: 1.0,
        }
    }

    /// Switch state; the blend starts from the values currently written
    pub fn set_state(&mut self, state: OrbState) {
        if state == self.state {
            return;
        }
        debug!("Orb state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.start = self.current;
        if self.config.transition_time <= 0.0 {
            self.current = self.config.profile(state);
            self.progress = 1.0;
        } else {
            self.progress = 0.0;
        }
    }

    /// Advance the blend by `dt` seconds
    pub fn update(&mut self, dt: f32) -> StateProfile {
        let target = self.config.profile(self.state);
        if self.config.transition_time <= 0.0 {
            self.progress = 1.0;
        } else {
            let step = finite_or_zero(dt).max(0.0) / self.config.transition_time;
            self.progress = (self.progress + step).min(1.0);
        }
        self.current = if self.progress >= 1.0 {
            target
        } else {
            self.start.lerp(&target, smoothstep(self.progress))
        };
        self.current
    }

    /// Whether a transition is still running
    pub fn is_transitioning(&self) -> bool {
        self.progress < 1.0
    }

    /// Target state
    pub fn state(&self) -> OrbState {
        self.state
    }

    /// Values currently written
    pub fn current(&self) -> StateProfile {
        self.current
    }

    /// Write the current values to the sink
    pub fn write(&self, sink: &mut dyn RenderParameterSink) {
        sink.set_float(names::RADIUS, self.current.radius);
        sink.set_float(names::SPAWN_RATE, self.current.spawn_rate);
        sink.set_float(names::PARTICLE_SIZE, self.current.particle_size);
        sink.set_float(names::TURBULENCE_STRENGTH, self.current.turbulence);
        sink.set_float(names::VORTEX_STRENGTH, self.current.vortex);
        sink.set_int(names::ORB_STATE, self.state.as_int());
    }

    /// Configuration
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ParameterTable;

    #[test]
    fn test_starts_idle() {
        let driver = StateProfileDriver::new(ProfileConfig::default());
        assert_eq!(driver.state(), OrbState::Idle);
        assert_eq!(driver.current(), ProfileConfig::default().idle);
        assert!(!driver.is_transitioning());
    }

    #[test]
    fn test_transition_reaches_target() {
        let config = ProfileConfig::default();
        let mut driver = StateProfileDriver::new(config.clone());
        driver.set_state(OrbState::Reactive);
        assert!(driver.is_transitioning());

        let halfway = driver.update(0.2);
        // smoothstep(0.5) = 0.5
        let expected = config.idle.lerp(&config.reactive, 0.5);
        assert!((halfway.spawn_rate - expected.spawn_rate).abs() < 1e-3);

        driver.update(0.3);
        assert!(!driver.is_transitioning());
        assert_eq!(driver.current(), config.reactive);
    }

    #[test]
    fn test_zero_duration_snaps() {
        let config = ProfileConfig {
            transition_time: 0.0,
            ..Default::default()
        };
        let mut driver = StateProfileDriver::new(config.clone());
        driver.set_state(OrbState::Load);
        assert_eq!(driver.current(), config.load);
        assert_eq!(driver.update(0.01), config.load);
    }

    #[test]
    fn test_interrupted_transition_starts_from_current() {
        let config = ProfileConfig::default();
        let mut driver = StateProfileDriver::new(config.clone());
        driver.set_state(OrbState::Reactive);
        let mid = driver.update(0.2);

        driver.set_state(OrbState::Spawned);
        let next = driver.update(0.0);
        assert_eq!(next, mid);
    }

    #[test]
    fn test_write_includes_state_int() {
        let mut driver = StateProfileDriver::new(ProfileConfig::default());
        driver.set_state(OrbState::Load);
        let mut table = ParameterTable::new();
        driver.write(&mut table);
        assert_eq!(table.int(names::ORB_STATE), Some(2));
        assert_eq!(table.len(), 6);
    }
}
