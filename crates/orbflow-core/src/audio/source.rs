//! Spectral source contract

/// Playback position of the material feeding a source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    /// Seconds since the start of the material
    pub position: f32,
    /// Total length in seconds, if known
    pub duration: Option<f32>,
}

impl Playback {
    /// Normalized position in [0, 1], or `None` without a usable duration
    pub fn progress(&self) -> Option<f32> {
        match self.duration {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                let progress = self.position / duration;
                progress.is_finite().then(|| progress.clamp(0.0, 1.0))
            }
            _ => None,
        }
    }
}

/// One magnitude spectrum handed to the engine
#[derive(Debug, Clone, Copy)]
pub struct SpectralFrame<'a> {
    /// Magnitudes from 0 Hz up to the Nyquist frequency
    pub bins: &'a [f32],
    /// Sample rate of the analysed signal in Hz
    pub sample_rate: f32,
    /// Playback position, if the source knows it
    pub playback: Option<Playback>,
}

/// What a source produced this tick
#[derive(Debug, Clone, Copy)]
pub enum SpectrumInput<'a> {
    /// A spectrum is available
    Signal(SpectralFrame<'a>),
    /// Silent, stopped, or nothing loaded
    NoSignal,
}

impl<'a> SpectrumInput<'a> {
    /// The frame, if there is a signal
    pub fn frame(&self) -> Option<&SpectralFrame<'a>> {
        match self {
            SpectrumInput::Signal(frame) => Some(frame),
            SpectrumInput::NoSignal => None,
        }
    }
}

/// Supplies one spectrum per tick
pub trait SpectralSource {
    /// Fetch the spectrum for the current tick
    fn next_frame(&mut self) -> SpectrumInput<'_>;
}

impl<S: SpectralSource + ?Sized> SpectralSource for Box<S> {
    fn next_frame(&mut self) -> SpectrumInput<'_> {
        (**self).next_frame()
    }
}
