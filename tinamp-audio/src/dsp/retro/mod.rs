//! AM radio effect
//!
//! Signal path while enabled:
//! stereo -> mono fold (L + R) -> highpass 300 Hz -> lowpass 3 kHz
//! -> soft-clip waveshaper -> compressor -> + noise bed * 0.15 -> * 0.7
//! -> identical left and right.
//!
//! While disabled the stage is a passthrough and the noise bed is stopped.

mod compressor;
mod noise;
mod waveshaper;

pub use compressor::{Compressor, ATTACK_SECS, KNEE_DB, RATIO, RELEASE_SECS, THRESHOLD_DB};
pub use noise::{NoiseBed, CRACKLE_PROBABILITY, NOISE_SECONDS};
pub use waveshaper::{distortion_curve, Waveshaper, CURVE_LEN};

use super::biquad::{Biquad, BiquadKind};
use super::Effect;
use rand::Rng;

pub const HIGHPASS_HZ: f32 = 300.0;
pub const LOWPASS_HZ: f32 = 3000.0;
pub const BAND_Q: f32 = 0.7;
/// Level of the noise bed in the final mix
pub const NOISE_GAIN: f32 = 0.15;
/// Output trim applied after mixing
pub const OUTPUT_TRIM: f32 = 0.7;

pub struct RetroEffect {
    enabled: bool,
    highpass: Biquad,
    lowpass: Biquad,
    shaper: Waveshaper,
    compressor: Compressor,
    noise: NoiseBed,
}

impl RetroEffect {
    /// Build the effect (disabled) for `sample_rate`.
    ///
    /// Allocates the distortion table and the noise loop, so call it
    /// away from the audio thread.
    pub fn new<R: Rng>(sample_rate: u32, rng: &mut R) -> Self {
        let sr = sample_rate as f32;
        Self {
            enabled: false,
            highpass: Biquad::new(BiquadKind::HighPass, sr, HIGHPASS_HZ, BAND_Q),
            lowpass: Biquad::new(BiquadKind::LowPass, sr, LOWPASS_HZ, BAND_Q),
            shaper: Waveshaper::new(),
            compressor: Compressor::new(sr),
            noise: NoiseBed::generate(sample_rate, rng),
        }
    }

    pub fn noise_playing(&self) -> bool {
        self.noise.is_playing()
    }

    #[inline]
    fn process_mono(&mut self, mono: f32) -> f32 {
        let band_limited = self.lowpass.process_mono(self.highpass.process_mono(mono));
        let saturated = self.shaper.process(band_limited);
        let compressed = self.compressor.process(saturated);
        (compressed + self.noise.next_sample() * NOISE_GAIN) * OUTPUT_TRIM
    }
}

impl std::fmt::Debug for RetroEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetroEffect")
            .field("enabled", &self.enabled)
            .field("noise_len", &self.noise.len())
            .finish_non_exhaustive()
    }
}

impl Effect for RetroEffect {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            let out = self.process_mono(frame[0] + frame[1]);
            frame[0] = out;
            frame[1] = out;
        }
    }

    fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
        self.shaper.reset();
        self.compressor.reset();
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.reset();
            self.noise.start();
        } else {
            self.noise.stop();
        }
    }

    fn name(&self) -> &'static str {
        "AM Radio"
    }
}
