//! FFT analyser with byte-scaled frequency and time-domain readouts

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;
use thiserror::Error;

/// Transform size used when the advanced visualizer is active
pub const DEFAULT_FFT_SIZE: usize = 2048;
/// Smoothing time constant used when the advanced visualizer is active
pub const DEFAULT_SMOOTHING: f32 = 0.6;
/// Magnitude mapped to byte 0
pub const MIN_DECIBELS: f32 = -100.0;
/// Magnitude mapped to byte 255
pub const MAX_DECIBELS: f32 = -30.0;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Errors raised when configuring an analyser
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("FFT size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
}

/// Read-only sampling point in the signal graph
///
/// Both readouts fill at most `bin_count()` entries of the caller's
/// buffer, scaled to 0..=255.
pub trait AnalysisTap {
    /// Current transform size
    fn fft_size(&self) -> usize;

    /// Number of frequency bins (half the transform size)
    fn bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    /// Sample rate of the tapped signal
    fn sample_rate(&self) -> u32;

    /// Change the transform size
    fn set_fft_size(&mut self, size: usize) -> Result<(), AnalysisError>;

    /// Change the smoothing time constant (clamped to 0..=1)
    fn set_smoothing(&mut self, smoothing: f32);

    /// Fill `out` with smoothed spectrum magnitudes
    fn frequency_data(&mut self, out: &mut [u8]);

    /// Fill `out` with the most recent waveform samples
    fn time_domain_data(&mut self, out: &mut [u8]);
}

/// FFT analyser over a rolling window of mono samples
pub struct Analyser {
    sample_rate: u32,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothing: f32,
    /// Circular history of the last `fft_size` samples
    history: Vec<f32>,
    write_pos: usize,
    /// Smoothed linear magnitudes, one per bin
    magnitudes: Vec<f32>,
    /// Pre-allocated FFT buffer to avoid allocation per frame
    fft_buffer: Vec<Complex<f32>>,
}

impl Analyser {
    /// Create an analyser with the default transform size and smoothing
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(DEFAULT_FFT_SIZE);
        Self {
            sample_rate,
            fft_size: DEFAULT_FFT_SIZE,
            fft,
            window: blackman(DEFAULT_FFT_SIZE),
            smoothing: DEFAULT_SMOOTHING,
            history: vec![0.0; DEFAULT_FFT_SIZE],
            write_pos: 0,
            magnitudes: vec![0.0; DEFAULT_FFT_SIZE / 2],
            fft_buffer: vec![Complex::new(0.0, 0.0); DEFAULT_FFT_SIZE],
        }
    }

    /// Append mono samples to the rolling window
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Current smoothing time constant
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Zero the history and smoothed magnitudes
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.magnitudes.fill(0.0);
        self.write_pos = 0;
    }

    /// Sample `i` of the window in chronological order
    #[inline]
    fn ordered(&self, i: usize) -> f32 {
        self.history[(self.write_pos + i) % self.fft_size]
    }

    fn update_magnitudes(&mut self) {
        for i in 0..self.fft_size {
            let windowed = self.ordered(i) * self.window[i];
            self.fft_buffer[i] = Complex::new(windowed, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let scale = 1.0 / self.fft_size as f32;
        for (mag, bin) in self.magnitudes.iter_mut().zip(self.fft_buffer.iter()) {
            let current = bin.norm() * scale;
            *mag = self.smoothing * *mag + (1.0 - self.smoothing) * current;
        }
    }
}

impl AnalysisTap for Analyser {
    fn fft_size(&self) -> usize {
        self.fft_size
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_fft_size(&mut self, size: usize) -> Result<(), AnalysisError> {
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            return Err(AnalysisError::InvalidFftSize(size));
        }
        if size == self.fft_size {
            return Ok(());
        }

        let mut planner = FftPlanner::new();
        self.fft = planner.plan_fft_forward(size);
        self.fft_size = size;
        self.window = blackman(size);
        self.history = vec![0.0; size];
        self.write_pos = 0;
        self.magnitudes = vec![0.0; size / 2];
        self.fft_buffer = vec![Complex::new(0.0, 0.0); size];
        tracing::debug!(fft_size = size, "analyser resized");
        Ok(())
    }

    fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    fn frequency_data(&mut self, out: &mut [u8]) {
        self.update_magnitudes();

        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (byte, &mag) in out.iter_mut().zip(self.magnitudes.iter()) {
            let db = if mag > 0.0 { 20.0 * mag.log10() } else { f32::NEG_INFINITY };
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    fn time_domain_data(&mut self, out: &mut [u8]) {
        let count = out.len().min(self.fft_size);
        let start = self.fft_size - count;
        for (i, byte) in out.iter_mut().take(count).enumerate() {
            let sample = self.ordered(start + i);
            *byte = (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Blackman window (alpha = 0.16)
fn blackman(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32 / n;
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        })
        .collect()
}
