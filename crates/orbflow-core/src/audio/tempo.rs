//! Tempo estimation from beat timestamps

use std::collections::VecDeque;
use tracing::trace;

/// Beats kept for the estimate
const HISTORY: usize = 16;
/// Beats needed before an estimate is produced
const MIN_BEATS: usize = 4;

/// Estimates BPM from the intervals between recent beats
#[derive(Debug, Clone, Default)]
pub struct TempoEstimator {
    beats: VecDeque<f64>,
    bpm: Option<f32>,
}

impl TempoEstimator {
    /// Create an empty estimator
    pub fn new() -> Self {
        Self {
            beats: VecDeque::with_capacity(HISTORY + 1),
            bpm: None,
        }
    }

    /// Record a beat at `timestamp` seconds and return the updated estimate
    pub fn record_beat(&mut self, timestamp: f64) -> Option<f32> {
        if !timestamp.is_finite() {
            return self.bpm;
        }
        // Clock went backwards: start over
        if self.beats.back().is_some_and(|&last| timestamp < last) {
            self.beats.clear();
        }

        self.beats.push_back(timestamp);
        while self.beats.len() > HISTORY {
            self.beats.pop_front();
        }

        self.bpm = self.estimate();
        trace!("Tempo estimate after {} beats: {:?}", self.beats.len(), self.bpm);
        self.bpm
    }

    fn estimate(&self) -> Option<f32> {
        if self.beats.len() < MIN_BEATS {
            return None;
        }

        let mut intervals: Vec<f64> = self
            .beats
            .iter()
            .zip(self.beats.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        intervals.sort_by(f64::total_cmp);

        // Trim a quarter from each end
        let trim = intervals.len() / 4;
        let kept = &intervals[trim..intervals.len() - trim];
        if kept.is_empty() {
            return None;
        }

        let mean = kept.iter().sum::<f64>() / kept.len() as f64;
        if mean <= 0.001 {
            return None;
        }

        let bpm = (60.0 / mean) as f32;
        let bpm = match bpm {
            b if (60.0..=200.0).contains(&b) => b,
            // Half-beats
            b if (200.0..=400.0).contains(&b) => b * 0.5,
            // Every other beat
            b if (30.0..60.0).contains(&b) => b * 2.0,
            _ => return None,
        };

        Some((bpm * 10.0).round() / 10.0)
    }

    /// Latest estimate
    pub fn bpm(&self) -> Option<f32> {
        self.bpm
    }

    /// Number of beats in the history
    pub fn beat_count(&self) -> usize {
        self.beats.len()
    }

    /// Forget all beats
    pub fn reset(&mut self) {
        self.beats.clear();
        self.bpm = None;
    }
}
