//! Ten-band graphic equalizer
//!
//! A frequency-ascending cascade of peaking filters. Gains change in
//! place; disabling skips the cascade entirely.

use super::biquad::{Biquad, BiquadKind};
use super::Effect;

/// Number of bands
pub const EQ_BANDS: usize = 10;
/// Centre frequency of each band in Hz
pub const EQ_FREQUENCIES: [f32; EQ_BANDS] = [
    60.0, 170.0, 310.0, 600.0, 1000.0, 3000.0, 6000.0, 12000.0, 14000.0, 16000.0,
];
/// Quality factor shared by every band
pub const EQ_Q: f32 = 1.0;
/// Band gains are clamped to +/- this many dB
pub const EQ_MAX_GAIN_DB: f32 = 20.0;

pub struct Equalizer {
    enabled: bool,
    bands: Vec<Biquad>,
}

impl Equalizer {
    /// Build a flat, enabled equalizer for `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        Self::with_gains(sample_rate, &[0.0; EQ_BANDS])
    }

    pub fn with_gains(sample_rate: f32, gains: &[f32; EQ_BANDS]) -> Self {
        let bands = EQ_FREQUENCIES
            .iter()
            .zip(gains.iter())
            .map(|(&freq, &gain)| {
                let gain_db = gain.clamp(-EQ_MAX_GAIN_DB, EQ_MAX_GAIN_DB);
                Biquad::new(BiquadKind::Peaking { gain_db }, sample_rate, freq, EQ_Q)
            })
            .collect();
        Self {
            enabled: true,
            bands,
        }
    }

    /// Set the gain of one band; out-of-range indices are ignored
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        if let Some(band) = self.bands.get_mut(index) {
            band.set_gain_db(gain_db.clamp(-EQ_MAX_GAIN_DB, EQ_MAX_GAIN_DB));
        }
    }

    /// Overwrite all band gains
    pub fn set_gains(&mut self, gains: &[f32; EQ_BANDS]) {
        for (index, &gain) in gains.iter().enumerate() {
            self.set_band_gain(index, gain);
        }
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(Biquad::gain_db)
    }

    pub fn gains(&self) -> [f32; EQ_BANDS] {
        let mut gains = [0.0; EQ_BANDS];
        for (gain, band) in gains.iter_mut().zip(self.bands.iter()) {
            *gain = band.gain_db();
        }
        gains
    }
}

impl std::fmt::Debug for Equalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Equalizer")
            .field("enabled", &self.enabled)
            .field("gains", &self.gains())
            .finish()
    }
}

impl Effect for Equalizer {
    fn process(&mut self, samples: &mut [f32]) {
        if !self.enabled {
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            let mut left = frame[0];
            let mut right = frame[1];
            for band in &mut self.bands {
                (left, right) = band.process_frame(left, right);
            }
            frame[0] = left;
            frame[1] = right;
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    fn name(&self) -> &'static str {
        "Equalizer"
    }
}
