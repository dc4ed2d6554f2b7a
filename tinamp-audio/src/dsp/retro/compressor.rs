//! Heavy soft-knee compressor
//!
//! Mirrors the browser dynamics compressor: gain computed from a dB
//! envelope with a quadratic knee, plus automatic makeup gain derived
//! from the curve's response to a full-scale signal.

pub const THRESHOLD_DB: f32 = -24.0;
pub const KNEE_DB: f32 = 30.0;
pub const RATIO: f32 = 12.0;
pub const ATTACK_SECS: f32 = 0.001;
pub const RELEASE_SECS: f32 = 0.25;

/// Makeup exponent applied to the inverse full-scale gain
const MAKEUP_EXPONENT: f32 = 0.6;

pub struct Compressor {
    attack_coeff: f32,
    release_coeff: f32,
    /// Level detector state in dB
    envelope_db: f32,
    makeup_gain: f32,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        let full_scale_gain_db = Self::compute_gain_reduction(0.0);
        let makeup_gain = (1.0 / db_to_linear(full_scale_gain_db)).powf(MAKEUP_EXPONENT);
        Self {
            attack_coeff: (-1.0 / (sample_rate * ATTACK_SECS)).exp(),
            release_coeff: (-1.0 / (sample_rate * RELEASE_SECS)).exp(),
            envelope_db: -120.0,
            makeup_gain,
        }
    }

    /// Static curve: gain change in dB (<= 0) for an input level in dB
    pub fn compute_gain_reduction(input_db: f32) -> f32 {
        let half_knee = KNEE_DB / 2.0;
        let over = input_db - THRESHOLD_DB;

        let output_db = if over <= -half_knee {
            input_db
        } else if over < half_knee {
            let x = over + half_knee;
            input_db + (1.0 / RATIO - 1.0) * x * x / (2.0 * KNEE_DB)
        } else {
            THRESHOLD_DB + over / RATIO
        };

        output_db - input_db
    }

    pub fn makeup_gain(&self) -> f32 {
        self.makeup_gain
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let level_db = linear_to_db(x.abs());
        let coeff = if level_db > self.envelope_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope_db = coeff * self.envelope_db + (1.0 - coeff) * level_db;

        let gain = db_to_linear(Self::compute_gain_reduction(self.envelope_db));
        x * gain * self.makeup_gain
    }

    pub fn reset(&mut self) {
        self.envelope_db = -120.0;
    }
}

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 1e-6 {
        20.0 * linear.log10()
    } else {
        -120.0
    }
}
