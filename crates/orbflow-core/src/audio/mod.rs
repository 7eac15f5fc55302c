//! Audio analysis
//!
//! Spectral frames flow through band extraction, smoothing and the two
//! adaptive event detectors. [`AudioAnalyzer`] wires these together and
//! produces one [`AudioFeatures`] per tick.

pub mod bands;
pub mod detector;
pub mod fft_source;
pub mod source;
pub mod tempo;

pub use bands::{
    BandBoundaries, BandEnergies, BandExtractor, BandSmoother, BandValues, SpectrumConfig,
};
pub use detector::{
    AdaptiveDetector, DetectorConfig, DetectorKind, DetectorState, DisabledHistory,
};
pub use fft_source::{FftSourceConfig, FftSpectrumSource};
pub use source::{Playback, SpectralFrame, SpectralSource, SpectrumInput};
pub use tempo::TempoEstimator;

use tracing::trace;

/// Everything the analyzer derived from one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    /// Raw and smoothed band energies
    pub bands: BandEnergies,
    /// A beat fired this tick
    pub beat: bool,
    /// A volume spike fired this tick
    pub volume_spike: bool,
    /// Normalized beat pulse
    pub beat_pulse: f32,
    /// Normalized volume-spike pulse
    pub spike_pulse: f32,
    /// Tempo estimate
    pub tempo_bpm: Option<f32>,
}

/// Band extraction, smoothing, detection and tempo tracking
pub struct AudioAnalyzer {
    extractor: BandExtractor,
    smoother: BandSmoother,
    beat: AdaptiveDetector,
    spike: AdaptiveDetector,
    tempo: TempoEstimator,
    latest: AudioFeatures,
    frames: u64,
}

impl AudioAnalyzer {
    /// Create an analyzer
    pub fn new(
        spectrum: SpectrumConfig,
        beat: DetectorConfig,
        volume_spike: DetectorConfig,
    ) -> Self {
        Self {
            smoother: BandSmoother::new(spectrum.smoothing_rate),
            extractor: BandExtractor::new(spectrum),
            beat: AdaptiveDetector::new(DetectorKind::Beat, beat),
            spike: AdaptiveDetector::new(DetectorKind::VolumeSpike, volume_spike),
            tempo: TempoEstimator::new(),
            latest: AudioFeatures::default(),
            frames: 0,
        }
    }

    /// Analyze one frame at time `now`, `dt` seconds after the previous tick
    pub fn analyze(&mut self, frame: &SpectralFrame<'_>, now: f64, dt: f32) -> AudioFeatures {
        let (raw, total) = self.extractor.extract(frame);
        let smoothed = self.smoother.update(raw, dt);

        let beat = self.beat.update(raw.bass, now, dt);
        let volume_spike = self.spike.update(total, now, dt);

        if beat {
            self.tempo.record_beat(now);
        }

        self.frames += 1;
        if self.frames % 300 == 0 {
            trace!(
                "Bands: bass={:.3} mid={:.3} treble={:.3} total={:.3}",
                smoothed.bass,
                smoothed.mid,
                smoothed.treble,
                total
            );
        }

        self.latest = AudioFeatures {
            bands: BandEnergies {
                raw,
                smoothed,
                total,
            },
            beat,
            volume_spike,
            beat_pulse: self.beat.pulse(),
            spike_pulse: self.spike.pulse(),
            tempo_bpm: self.tempo.bpm(),
        };
        self.latest
    }

    /// Tick without a signal: pulses run out, history is kept
    pub fn idle(&mut self, dt: f32) {
        self.beat.decay(dt);
        self.spike.decay(dt);
        self.latest.beat = false;
        self.latest.volume_spike = false;
        self.latest.beat_pulse = self.beat.pulse();
        self.latest.spike_pulse = self.spike.pulse();
    }

    /// Result of the last tick
    pub fn latest(&self) -> &AudioFeatures {
        &self.latest
    }

    /// Beat detector
    pub fn beat(&self) -> &AdaptiveDetector {
        &self.beat
    }

    /// Volume-spike detector
    pub fn volume_spike(&self) -> &AdaptiveDetector {
        &self.spike
    }

    /// Mutable access to a detector
    pub fn detector_mut(&mut self, kind: DetectorKind) -> &mut AdaptiveDetector {
        match kind {
            DetectorKind::Beat => &mut self.beat,
            DetectorKind::VolumeSpike => &mut self.spike,
        }
    }

    /// Tempo estimator
    pub fn tempo(&self) -> &TempoEstimator {
        &self.tempo
    }
}
