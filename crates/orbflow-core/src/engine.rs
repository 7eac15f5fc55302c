//! Control Engine - runs one tick of every subsystem in a fixed order
//!
//! Per tick:
//! 1. advance the clock
//! 2. clearance solver (recompute on its cadence, smooth every tick)
//! 3. poll the spectral source; analyze and fuse, or write the fallback set
//! 4. glow and state profile drivers
//! 5. write everything to the sink
//!
//! The spectral source, collision oracle and sink are injected, so the engine
//! can be driven deterministically in tests.

use crate::audio::{
    AudioAnalyzer, BandEnergies, BandValues, DetectorKind, DetectorState, SpectralSource,
};
use crate::clearance::{ClearanceSolver, CollisionOracle, RadiusState};
use crate::color::{ColorEngine, ColorStrategy, ColorTriple};
use crate::config::{ConfigCorrection, EngineConfig};
use crate::finite_or_zero;
use crate::fusion::{FusionInputs, OutputParameterSet};
use crate::glow::GlowDriver;
use crate::profile::{OrbState, StateProfileDriver};
use crate::sink::RenderParameterSink;
use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Analysis state after the last tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    /// Engine clock in seconds
    pub time: f64,
    /// Whether the source reported a signal
    pub signal_present: bool,
    /// Raw and smoothed bands and total volume
    pub bands: BandEnergies,
    /// A beat fired this tick
    pub beat: bool,
    /// A volume spike fired this tick
    pub volume_spike: bool,
    /// Beat detector state
    pub beat_state: DetectorState,
    /// Volume-spike detector state
    pub spike_state: DetectorState,
    /// Tempo estimate in BPM
    pub tempo_bpm: Option<f32>,
    /// Clearance solver state, if a solver is attached
    pub clearance: Option<RadiusState>,
}

struct Clearance {
    solver: ClearanceSolver,
    oracle: Box<dyn CollisionOracle>,
}

/// Per-frame control-signal engine
pub struct ControlEngine<S: SpectralSource, K: RenderParameterSink> {
    config: EngineConfig,
    corrections: Vec<ConfigCorrection>,
    source: S,
    sink: K,
    clearance: Option<Clearance>,
    analyzer: AudioAnalyzer,
    colors: ColorEngine,
    glow: GlowDriver,
    profile: StateProfileDriver,
    anchor: Vec3,
    time: f64,
    ticks: u64,
    signal_present: Option<bool>,
    output: OutputParameterSet,
}

impl<S: SpectralSource, K: RenderParameterSink> ControlEngine<S, K> {
    /// Create an engine; the configuration is sanitized first
    pub fn new(config: EngineConfig, source: S, sink: K) -> Self {
        let (config, corrections) = config.sanitized();
        if !corrections.is_empty() {
            warn!("{} configuration value(s) corrected", corrections.len());
        }

        let analyzer = AudioAnalyzer::new(
            config.spectrum.clone(),
            config.beat.clone(),
            config.volume_spike.clone(),
        );
        let colors = ColorEngine::from_config(config.color.clone());
        let glow = GlowDriver::new(config.glow.clone());
        let profile = StateProfileDriver::new(config.profiles.clone());
        let output = OutputParameterSet::fallback(&config.fallback, &config.ranges);

        info!(
            "Control engine created (radius strategy: {:?})",
            config.fusion.radius_strategy
        );

        Self {
            config,
            corrections,
            source,
            sink,
            clearance: None,
            analyzer,
            colors,
            glow,
            profile,
            anchor: Vec3::ZERO,
            time: 0.0,
            ticks: 0,
            signal_present: None,
            output,
        }
    }

    /// Attach a collision oracle, builder style
    pub fn with_clearance(mut self, oracle: impl CollisionOracle + 'static) -> Self {
        self.attach_clearance(Box::new(oracle));
        self
    }

    /// Attach a collision oracle; the solver is built from the clearance config
    pub fn attach_clearance(&mut self, oracle: Box<dyn CollisionOracle>) {
        let solver = ClearanceSolver::new(self.config.clearance.clone());
        debug!("Clearance solver attached");
        self.clearance = Some(Clearance { solver, oracle });
    }

    /// Remove the solver and its oracle
    pub fn detach_clearance(&mut self) -> Option<Box<dyn CollisionOracle>> {
        self.clearance.take().map(|c| c.oracle)
    }

    /// Move the point the clearance solver measures around
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    /// Run one tick of `dt` seconds and write the results to the sink
    pub fn tick(&mut self, dt: f32) -> &OutputParameterSet {
        let dt = finite_or_zero(dt).max(0.0);
        self.time += f64::from(dt);
        self.ticks += 1;

        let anchor = self.anchor;
        let clearance_radius = self
            .clearance
            .as_mut()
            .map(|c| c.solver.update(dt, anchor, c.oracle.as_ref()));

        let signal_present;
        let mut bands_for_glow = BandValues::default();

        match self.source.next_frame().frame() {
            Some(frame) => {
                signal_present = true;
                let features = self.analyzer.analyze(frame, self.time, dt);
                let smoothed = features.bands.smoothed;
                bands_for_glow = smoothed;

                let colors = if self.config.fusion.update_colors {
                    self.colors.update(dt, &smoothed, frame.playback)
                } else {
                    self.colors.current()
                };

                let inputs = FusionInputs {
                    bands: smoothed,
                    beat_pulse: features.beat_pulse,
                    spike_pulse: features.spike_pulse,
                    spike_enabled: self.analyzer.volume_spike().is_enabled(),
                    clearance_radius,
                    colors,
                };
                self.output = OutputParameterSet::fuse(
                    &self.config.fusion,
                    &self.config.ranges,
                    &self.config.fallback,
                    &inputs,
                );
            }
            None => {
                signal_present = false;
                self.analyzer.idle(dt);
                self.output =
                    OutputParameterSet::fallback(&self.config.fallback, &self.config.ranges);
            }
        }

        if self.signal_present != Some(signal_present) {
            if signal_present {
                info!("Audio signal present; driving parameters from analysis");
            } else {
                info!("No audio signal; writing fallback parameters");
            }
            self.signal_present = Some(signal_present);
        }

        if self.config.glow.enabled {
            self.glow.update(dt, &bands_for_glow);
        }
        if self.config.profiles.enabled {
            self.profile.update(dt);
        }

        self.write_outputs();
        &self.output
    }

    fn write_outputs(&mut self) {
        self.output.write_to(&mut self.sink);
        if self.config.glow.enabled {
            self.glow.write(&mut self.sink);
        }
        if self.config.profiles.enabled {
            self.profile.write(&mut self.sink);
        }
    }

    /// Parameter set written by the last tick
    pub fn output(&self) -> &OutputParameterSet {
        &self.output
    }

    /// Analysis state after the last tick
    pub fn snapshot(&self) -> AnalysisSnapshot {
        let features = self.analyzer.latest();
        AnalysisSnapshot {
            time: self.time,
            signal_present: self.signal_present.unwrap_or(false),
            bands: features.bands,
            beat: features.beat,
            volume_spike: features.volume_spike,
            beat_state: self.analyzer.beat().state(),
            spike_state: self.analyzer.volume_spike().state(),
            tempo_bpm: self.analyzer.tempo().bpm(),
            clearance: self.clearance.as_ref().map(|c| c.solver.state()),
        }
    }

    /// Colors produced by the last color update
    pub fn colors(&self) -> ColorTriple {
        self.colors.current()
    }

    /// Switch the color strategy at runtime
    pub fn set_color_strategy(&mut self, strategy: ColorStrategy) {
        self.colors.set_strategy(strategy);
    }

    /// Enable or disable beat detection
    pub fn set_beat_enabled(&mut self, enabled: bool) {
        self.analyzer
            .detector_mut(DetectorKind::Beat)
            .set_enabled(enabled);
    }

    /// Enable or disable volume-spike detection
    pub fn set_volume_spike_enabled(&mut self, enabled: bool) {
        self.analyzer
            .detector_mut(DetectorKind::VolumeSpike)
            .set_enabled(enabled);
    }

    /// Hover highlight for the glow driver
    pub fn set_hover(&mut self, hovered: bool) {
        self.glow.set_hover(hovered);
    }

    /// Change the orb state driving the profile blend
    pub fn set_orb_state(&mut self, state: OrbState) {
        self.profile.set_state(state);
    }

    /// Corrections applied to the configuration at construction
    pub fn corrections(&self) -> &[ConfigCorrection] {
        &self.corrections
    }

    /// Sanitized configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Spectral source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable spectral source, e.g. to push samples
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Render sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Mutable render sink
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Give back the injected source and sink
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpectralFrame, SpectrumInput};
    use crate::fusion::RadiusStrategy;
    use crate::sink::{names, ParameterTable};

    struct Silence;

    impl SpectralSource for Silence {
        fn next_frame(&mut self) -> SpectrumInput<'_> {
            SpectrumInput::NoSignal
        }
    }

    struct Constant(Vec<f32>);

    impl SpectralSource for Constant {
        fn next_frame(&mut self) -> SpectrumInput<'_> {
            SpectrumInput::Signal(SpectralFrame {
                bins: &self.0,
                sample_rate: 48_000.0,
                playback: None,
            })
        }
    }

    #[test]
    fn test_silence_writes_fallback() {
        let mut engine =
            ControlEngine::new(EngineConfig::default(), Silence, ParameterTable::new());
        let first = *engine.tick(1.0 / 60.0);
        assert_eq!(first.energy, 100.0);
        assert_eq!(first.outer_radius, 0.4);
        assert_eq!(engine.sink().float(names::ENERGY), Some(100.0));
        assert!(!engine.snapshot().signal_present);
    }

    #[test]
    fn test_signal_drives_bands() {
        let mut engine = ControlEngine::new(
            EngineConfig::default(),
            Constant(vec![0.01; 512]),
            ParameterTable::new(),
        );
        for _ in 0..30 {
            engine.tick(1.0 / 60.0);
        }
        let snapshot = engine.snapshot();
        assert!(snapshot.signal_present);
        assert!(snapshot.bands.smoothed.bass > 0.0);
        assert!(engine.output().is_within(&engine.config().ranges));
    }

    #[test]
    fn test_clearance_modulated_reads_solver() {
        struct Open;
        impl CollisionOracle for Open {
            fn overlap_sphere(
                &self,
                _center: Vec3,
                _radius: f32,
                _layers: crate::clearance::LayerMask,
            ) -> Vec<crate::clearance::Hit> {
                Vec::new()
            }
        }

        let mut config = EngineConfig::default();
        config.fusion.radius_strategy = RadiusStrategy::ClearanceModulated;
        let mut engine = ControlEngine::new(config, Constant(vec![0.0; 512]), ParameterTable::new())
            .with_clearance(Open);

        let out = *engine.tick(0.1);
        // Nothing blocks: solver sits at max radius, no spike pulse
        assert!((out.outer_radius - 0.6).abs() < 1e-6);
        assert_eq!(engine.snapshot().clearance.map(|s| s.target), Some(0.6));
    }

    #[test]
    fn test_corrections_are_kept() {
        let mut config = EngineConfig::default();
        config.clearance.padding = -1.0;
        let engine = ControlEngine::new(config, Silence, ParameterTable::new());
        assert_eq!(engine.corrections().len(), 1);
        assert_eq!(engine.config().clearance.padding, 0.0);
    }

    #[test]
    fn test_profile_and_glow_write_when_enabled() {
        let mut config = EngineConfig::default();
        config.glow.enabled = true;
        config.profiles.enabled = true;
        let mut engine = ControlEngine::new(config, Silence, ParameterTable::new());
        engine.set_orb_state(OrbState::Reactive);
        engine.set_hover(true);
        engine.tick(1.0);

        let sink = engine.sink();
        assert_eq!(sink.float(names::HOVER), Some(1.0));
        assert_eq!(sink.int(names::ORB_STATE), Some(OrbState::Reactive.as_int()));
        assert_eq!(sink.float(names::SPAWN_RATE), Some(900.0));
    }
}
