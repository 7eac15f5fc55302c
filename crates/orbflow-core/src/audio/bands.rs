//! Band extraction - bass / mid / treble sums from a magnitude spectrum
//!
//! Band edges are derived from the sample rate and the number of bins, so the
//! same cutoff frequencies hold for any FFT size.

use super::source::SpectralFrame;
use crate::config::{finite_or, fix, ConfigCorrection};
use crate::{approach_factor, finite_or_zero};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sample rate assumed when a frame reports an unusable one
const FALLBACK_SAMPLE_RATE: f32 = 48_000.0;

/// Band extraction and smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Expected number of magnitude bins per frame (half the FFT size)
    pub bin_count: usize,
    /// Upper edge of the bass band in Hz
    pub bass_cutoff_hz: f32,
    /// Upper edge of the mid band in Hz
    pub mid_cutoff_hz: f32,
    /// Gain applied to the bass sum
    pub bass_boost: f32,
    /// Gain applied to the mid sum
    pub mid_boost: f32,
    /// Gain applied to the treble sum
    pub treble_boost: f32,
    /// Global gain applied to every band and the total
    pub sensitivity: f32,
    /// Exponential smoothing rate of the [0, 1] band values (per second)
    pub smoothing_rate: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            bin_count: 512,
            bass_cutoff_hz: 250.0,
            mid_cutoff_hz: 2000.0,
            bass_boost: 1.5,
            mid_boost: 1.2,
            treble_boost: 1.0,
            sensitivity: 50.0,
            smoothing_rate: 10.0,
        }
    }
}

impl SpectrumConfig {
    pub(crate) fn sanitize(&mut self, c: &mut Vec<ConfigCorrection>) {
        let d = Self::default();

        if self.bin_count == 0 {
            fix(c, "spectrum.bin_count", 0.0, d.bin_count as f32);
            self.bin_count = d.bin_count;
        }

        let bass = finite_or(self.bass_cutoff_hz, d.bass_cutoff_hz);
        let bass = if bass > 0.0 { bass } else { d.bass_cutoff_hz };
        self.bass_cutoff_hz = fix(c, "spectrum.bass_cutoff_hz", self.bass_cutoff_hz, bass);

        let mid = finite_or(self.mid_cutoff_hz, d.mid_cutoff_hz).max(self.bass_cutoff_hz);
        self.mid_cutoff_hz = fix(c, "spectrum.mid_cutoff_hz", self.mid_cutoff_hz, mid);

        let gain = |value: f32, default: f32| finite_or(value, default).max(0.0);
        let bass_boost = gain(self.bass_boost, d.bass_boost);
        self.bass_boost = fix(c, "spectrum.bass_boost", self.bass_boost, bass_boost);
        let mid_boost = gain(self.mid_boost, d.mid_boost);
        self.mid_boost = fix(c, "spectrum.mid_boost", self.mid_boost, mid_boost);
        self.treble_boost = fix(
            c,
            "spectrum.treble_boost",
            self.treble_boost,
            gain(self.treble_boost, d.treble_boost),
        );
        self.sensitivity = fix(
            c,
            "spectrum.sensitivity",
            self.sensitivity,
            gain(self.sensitivity, d.sensitivity),
        );
        self.smoothing_rate = fix(
            c,
            "spectrum.smoothing_rate",
            self.smoothing_rate,
            gain(self.smoothing_rate, d.smoothing_rate),
        );
    }
}

/// Inclusive last bin index of the bass and mid bands
///
/// Bass covers `[0, bass_end]`, mid `(bass_end, mid_end]`, treble
/// `(mid_end, bin_count - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandBoundaries {
    /// Last bass bin
    pub bass_end: usize,
    /// Last mid bin
    pub mid_end: usize,
    /// Number of bins these boundaries were computed for
    pub bin_count: usize,
}

impl BandBoundaries {
    /// Derive boundaries from the sample rate and bin count
    pub fn compute(sample_rate: f32, bin_count: usize, bass_hz: f32, mid_hz: f32) -> Self {
        if bin_count == 0 {
            return Self {
                bass_end: 0,
                mid_end: 0,
                bin_count,
            };
        }

        let last = bin_count - 1;
        let hz_per_bin = (sample_rate * 0.5) / bin_count as f32;
        let edge = |hz: f32| {
            let bin = (hz / hz_per_bin).floor();
            if bin.is_finite() && bin > 0.0 {
                (bin as usize).min(last)
            } else {
                0
            }
        };

        let bass_end = edge(bass_hz).max(1).min(last);
        let mid_end = edge(mid_hz).max(bass_end + 1).min(last);

        Self {
            bass_end,
            mid_end,
            bin_count,
        }
    }
}

/// One value per band
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BandValues {
    /// Bass band
    pub bass: f32,
    /// Mid band
    pub mid: f32,
    /// Treble band
    pub treble: f32,
}

impl BandValues {
    /// All three bands set to `value`
    pub fn splat(value: f32) -> Self {
        Self {
            bass: value,
            mid: value,
            treble: value,
        }
    }
}

/// Band energies of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BandEnergies {
    /// Boosted sums, unbounded
    pub raw: BandValues,
    /// Smoothed values in [0, 1]
    pub smoothed: BandValues,
    /// Sum of all bins times sensitivity (volume-spike input)
    pub total: f32,
}

/// Maps magnitude bins into band sums
pub struct BandExtractor {
    config: SpectrumConfig,
    boundaries: Option<(BandBoundaries, u32)>,
    mismatch_reported: bool,
}

impl BandExtractor {
    /// Create an extractor
    pub fn new(config: SpectrumConfig) -> Self {
        Self {
            config,
            boundaries: None,
            mismatch_reported: false,
        }
    }

    /// Boundaries for the given frame shape, recomputed only when it changes
    pub fn boundaries(&mut self, sample_rate: f32, bin_count: usize) -> BandBoundaries {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            FALLBACK_SAMPLE_RATE
        };
        let key = sample_rate.to_bits();

        match self.boundaries {
            Some((boundaries, cached)) if cached == key && boundaries.bin_count == bin_count => {
                boundaries
            }
            _ => {
                let boundaries = BandBoundaries::compute(
                    sample_rate,
                    bin_count,
                    self.config.bass_cutoff_hz,
                    self.config.mid_cutoff_hz,
                );
                debug!(
                    "Band boundaries: sample_rate={}, bins={}, bass_end={}, mid_end={}",
                    sample_rate, bin_count, boundaries.bass_end, boundaries.mid_end
                );
                self.boundaries = Some((boundaries, key));
                boundaries
            }
        }
    }

    /// Boosted band sums and the total energy of a frame
    pub fn extract(&mut self, frame: &SpectralFrame<'_>) -> (BandValues, f32) {
        let bins = frame.bins;
        if bins.len() != self.config.bin_count && !self.mismatch_reported {
            warn!(
                "Spectral frame has {} bins, configured for {}",
                bins.len(),
                self.config.bin_count
            );
            self.mismatch_reported = true;
        }
        if bins.is_empty() {
            return (BandValues::default(), 0.0);
        }

        let b = self.boundaries(frame.sample_rate, bins.len());
        let magnitude = |v: &f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let sum = |range: &[f32]| range.iter().map(magnitude).sum::<f32>();

        let bass = sum(&bins[..=b.bass_end]);
        let mid = if b.mid_end > b.bass_end {
            sum(&bins[b.bass_end + 1..=b.mid_end])
        } else {
            0.0
        };
        let treble = if b.mid_end + 1 < bins.len() {
            sum(&bins[b.mid_end + 1..])
        } else {
            0.0
        };

        let s = self.config.sensitivity;
        let raw = BandValues {
            bass: bass * self.config.bass_boost * s,
            mid: mid * self.config.mid_boost * s,
            treble: treble * self.config.treble_boost * s,
        };
        let total = (bass + mid + treble) * s;

        (raw, total)
    }

    /// Configuration in use
    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }
}

/// Exponential smoother producing the [0, 1] band values
#[derive(Debug, Clone)]
pub struct BandSmoother {
    rate: f32,
    value: BandValues,
}

impl BandSmoother {
    /// Create a smoother at zero
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            value: BandValues::default(),
        }
    }

    /// Move toward `raw` and clamp into [0, 1]
    pub fn update(&mut self, raw: BandValues, dt: f32) -> BandValues {
        let t = approach_factor(dt, self.rate);
        let step = |current: f32, target: f32| {
            let target = if target.is_nan() { 0.0 } else { target.min(f32::MAX) };
            finite_or_zero(current + (target - current) * t).clamp(0.0, 1.0)
        };
        self.value = BandValues {
            bass: step(self.value.bass, raw.bass),
            mid: step(self.value.mid, raw.mid),
            treble: step(self.value.treble, raw.treble),
        };
        self.value
    }

    /// Last smoothed value
    pub fn value(&self) -> BandValues {
        self.value
    }

    /// Back to zero
    pub fn reset(&mut self) {
        self.value = BandValues::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bins: &[f32]) -> SpectralFrame<'_> {
        SpectralFrame {
            bins,
            sample_rate: 48_000.0,
            playback: None,
        }
    }

    #[test]
    fn test_boundaries_follow_sample_rate() {
        // 46.875 Hz per bin
        let b = BandBoundaries::compute(48_000.0, 512, 250.0, 2000.0);
        assert_eq!(b.bass_end, 5);
        assert_eq!(b.mid_end, 42);

        // Twice the bins, twice the indices
        let b = BandBoundaries::compute(48_000.0, 1024, 250.0, 2000.0);
        assert_eq!(b.bass_end, 10);
        assert_eq!(b.mid_end, 85);

        let b = BandBoundaries::compute(22_050.0, 512, 250.0, 2000.0);
        assert_eq!(b.bass_end, 11);
        assert_eq!(b.mid_end, 92);
    }

    #[test]
    fn test_boundaries_tiny_spectrum() {
        let b = BandBoundaries::compute(48_000.0, 1, 250.0, 2000.0);
        assert_eq!((b.bass_end, b.mid_end), (0, 0));

        let b = BandBoundaries::compute(48_000.0, 2, 250.0, 2000.0);
        assert_eq!((b.bass_end, b.mid_end), (1, 1));

        let b = BandBoundaries::compute(48_000.0, 4, 250.0, 2000.0);
        assert_eq!((b.bass_end, b.mid_end), (1, 2));
    }

    #[test]
    fn test_extract_partitions_bins() {
        let config = SpectrumConfig {
            bin_count: 512,
            bass_boost: 1.0,
            mid_boost: 1.0,
            treble_boost: 1.0,
            sensitivity: 1.0,
            ..Default::default()
        };
        let mut extractor = BandExtractor::new(config);
        let bins = vec![1.0; 512];

        let (raw, total) = extractor.extract(&frame(&bins));
        assert_eq!(raw.bass, 6.0);
        assert_eq!(raw.mid, 37.0);
        assert_eq!(raw.treble, 469.0);
        assert_eq!(total, 512.0);
    }

    #[test]
    fn test_extract_applies_boost_and_sensitivity() {
        let mut extractor = BandExtractor::new(SpectrumConfig::default());
        let mut bins = vec![0.0; 512];
        bins[0] = 0.01;
        bins[20] = 0.01;
        bins[100] = 0.01;

        let (raw, total) = extractor.extract(&frame(&bins));
        assert!((raw.bass - 0.01 * 1.5 * 50.0).abs() < 1e-5);
        assert!((raw.mid - 0.01 * 1.2 * 50.0).abs() < 1e-5);
        assert!((raw.treble - 0.01 * 50.0).abs() < 1e-5);
        assert!((total - 0.03 * 50.0).abs() < 1e-5);
    }

    #[test]
    fn test_extract_ignores_bad_bins() {
        let mut extractor = BandExtractor::new(SpectrumConfig::default());
        let mut bins = vec![0.0; 512];
        bins[0] = f32::NAN;
        bins[1] = f32::INFINITY;
        bins[2] = -5.0;

        let (raw, total) = extractor.extract(&frame(&bins));
        assert_eq!(raw, BandValues::default());
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_extract_empty_frame() {
        let mut extractor = BandExtractor::new(SpectrumConfig::default());
        let (raw, total) = extractor.extract(&frame(&[]));
        assert_eq!(raw, BandValues::default());
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_invalid_sample_rate_uses_fallback() {
        let mut extractor = BandExtractor::new(SpectrumConfig::default());
        let b = extractor.boundaries(f32::NAN, 512);
        assert_eq!(b, BandBoundaries::compute(FALLBACK_SAMPLE_RATE, 512, 250.0, 2000.0));
    }

    #[test]
    fn test_smoother_clamps() {
        let mut smoother = BandSmoother::new(10.0);
        let huge = BandValues::splat(1000.0);
        let v = smoother.update(huge, 1.0);
        assert_eq!(v, BandValues::splat(1.0));

        let v = smoother.update(BandValues::splat(f32::INFINITY), 0.016);
        assert_eq!(v, BandValues::splat(1.0));

        let v = smoother.update(BandValues::splat(-3.0), 1.0);
        assert_eq!(v, BandValues::splat(0.0));
    }

    #[test]
    fn test_smoother_rate() {
        let mut smoother = BandSmoother::new(10.0);
        let v = smoother.update(BandValues::splat(0.5), 0.05);
        assert!((v.bass - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_sanitize_negative_boost() {
        let mut config = SpectrumConfig {
            mid_boost: -1.0,
            mid_cutoff_hz: 100.0,
            ..Default::default()
        };
        let mut corrections = Vec::new();
        config.sanitize(&mut corrections);
        assert_eq!(config.mid_boost, 0.0);
        assert_eq!(config.mid_cutoff_hz, 250.0);
        assert_eq!(corrections.len(), 2);
    }
}
