//! FFT Spectral Source - turns PCM sample blocks into magnitude spectra
//!
//! Samples go into a ring buffer; every hop a Hann-windowed forward FFT is
//! run (rustfft) and the positive-frequency magnitudes become the frame bins.
//! The source also tracks a simple transport so it can report "no signal"
//! when nothing is loaded or playback is stopped.

use super::source::{Playback, SpectralFrame, SpectralSource, SpectrumInput};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Configuration for [`FftSpectrumSource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FftSourceConfig {
    /// Sample rate of the incoming PCM in Hz
    pub sample_rate: u32,
    /// FFT window size (frames carry `fft_size / 2` bins)
    pub fft_size: usize,
    /// Window overlap (0.0 - 1.0)
    pub overlap: f32,
}

impl Default for FftSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 1024,
            overlap: 0.5,
        }
    }
}

impl FftSourceConfig {
    fn hop_size(&self) -> usize {
        let overlap = if self.overlap.is_finite() {
            self.overlap.clamp(0.0, 0.95)
        } else {
            0.5
        };
        (((1.0 - overlap) * self.fft_size as f32) as usize).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Empty,
    Stopped,
    Paused,
    Playing,
}

/// Spectral source fed with PCM samples
pub struct FftSpectrumSource {
    fft: Arc<dyn Fft<f32>>,
    config: FftSourceConfig,
    input_buffer: Vec<f32>,
    write_pos: usize,
    samples_since_fft: usize,
    samples_seen: usize,
    hop_size: usize,
    fft_buffer: Vec<Complex<f32>>,
    scratch_buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    magnitudes: Vec<f32>,
    fft_count: u64,
    transport: Transport,
    position: f32,
    duration: Option<f32>,
}

fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            let t = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
        })
        .collect()
}

impl FftSpectrumSource {
    /// Create a source with nothing loaded
    pub fn new(config: FftSourceConfig) -> Self {
        let mut config = config;
        config.fft_size = config.fft_size.max(2);
        config.sample_rate = config.sample_rate.max(1);

        let fft_size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let hop_size = config.hop_size();

        debug!(
            "FftSpectrumSource created: sample_rate={}, fft_size={}, hop_size={}",
            config.sample_rate, fft_size, hop_size
        );

        Self {
            fft: fft.clone(),
            input_buffer: vec![0.0; fft_size],
            write_pos: 0,
            samples_since_fft: 0,
            samples_seen: 0,
            hop_size,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()],
            window: hann_window(fft_size),
            magnitudes: vec![0.0; fft_size / 2],
            fft_count: 0,
            transport: Transport::Empty,
            position: 0.0,
            duration: None,
            config,
        }
    }

    /// Load material of the given length (if known); playback starts stopped
    pub fn load(&mut self, duration: Option<f32>) {
        self.reset();
        self.duration = duration.filter(|d| d.is_finite() && *d > 0.0);
        self.transport = Transport::Stopped;
        info!("Material loaded (duration: {:?})", self.duration);
    }

    /// Unload the material
    pub fn unload(&mut self) {
        self.reset();
        self.duration = None;
        self.transport = Transport::Empty;
        debug!("Material unloaded");
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        if self.transport != Transport::Empty {
            self.transport = Transport::Playing;
        }
    }

    /// Pause playback, keeping the position
    pub fn pause(&mut self) {
        if self.transport == Transport::Playing {
            self.transport = Transport::Paused;
        }
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) {
        if self.transport != Transport::Empty {
            self.reset();
            self.transport = Transport::Stopped;
        }
    }

    /// Jump to `position` seconds
    pub fn seek(&mut self, position: f32) {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        self.position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    /// Push PCM samples (mono). Ignored unless playing.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if self.transport != Transport::Playing || samples.is_empty() {
            return;
        }

        let size = self.config.fft_size;
        for &sample in samples {
            self.input_buffer[self.write_pos] = if sample.is_finite() { sample } else { 0.0 };
            self.write_pos = (self.write_pos + 1) % size;
            self.samples_since_fft += 1;
            self.samples_seen = self.samples_seen.saturating_add(1);

            if self.samples_since_fft >= self.hop_size && self.samples_seen >= size {
                self.perform_fft();
                self.samples_since_fft = 0;
            }
        }

        self.position += samples.len() as f32 / self.config.sample_rate as f32;
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.position = duration;
                self.transport = Transport::Stopped;
                info!("End of material reached");
            }
        }
    }

    fn perform_fft(&mut self) {
        self.fft_count += 1;

        let size = self.config.fft_size;
        // Oldest sample sits at the write position
        for i in 0..size {
            let sample = self.input_buffer[(self.write_pos + i) % size];
            self.fft_buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        let norm = 1.0 / size as f32;
        for (magnitude, bin) in self.magnitudes.iter_mut().zip(&self.fft_buffer) {
            *magnitude = bin.norm() * norm;
        }

        if self.fft_count % 100 == 0 {
            trace!("FFT #{}: position={:.2}s", self.fft_count, self.position);
        }
    }

    /// Current magnitudes
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Clear buffers and rewind
    pub fn reset(&mut self) {
        self.input_buffer.fill(0.0);
        self.magnitudes.fill(0.0);
        self.write_pos = 0;
        self.samples_since_fft = 0;
        self.samples_seen = 0;
        self.fft_count = 0;
        self.position = 0.0;
    }

    /// Change sample rate, FFT size or overlap
    pub fn update_config(&mut self, config: FftSourceConfig) {
        let mut config = config;
        config.fft_size = config.fft_size.max(2);
        config.sample_rate = config.sample_rate.max(1);

        if config.fft_size != self.config.fft_size {
            let size = config.fft_size;
            self.fft = FftPlanner::new().plan_fft_forward(size);
            self.input_buffer = vec![0.0; size];
            self.fft_buffer = vec![Complex::new(0.0, 0.0); size];
            let scratch_len = self.fft.get_inplace_scratch_len();
            self.scratch_buffer = vec![Complex::new(0.0, 0.0); scratch_len];
            self.window = hann_window(size);
            self.magnitudes = vec![0.0; size / 2];
            self.write_pos = 0;
            self.samples_since_fft = 0;
            self.samples_seen = 0;
        }

        self.hop_size = config.hop_size();
        self.config = config;
        debug!("FftSpectrumSource config updated, hop_size={}", self.hop_size);
    }

    /// Configuration in use
    pub fn config(&self) -> &FftSourceConfig {
        &self.config
    }
}

impl SpectralSource for FftSpectrumSource {
    fn next_frame(&mut self) -> SpectrumInput<'_> {
        if self.transport != Transport::Playing || self.samples_seen < self.config.fft_size {
            return SpectrumInput::NoSignal;
        }
        SpectrumInput::Signal(SpectralFrame {
            bins: &self.magnitudes,
            sample_rate: self.config.sample_rate as f32,
            playback: Some(Playback {
                position: self.position,
                duration: self.duration,
            }),
        })
    }
}
