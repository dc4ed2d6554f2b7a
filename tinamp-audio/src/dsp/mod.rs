//! Data-plane processors run by the audio callback

mod biquad;
mod equalizer;
mod gain;
pub mod retro;

pub use biquad::{Biquad, BiquadKind};
pub use equalizer::{Equalizer, EQ_BANDS, EQ_FREQUENCIES, EQ_MAX_GAIN_DB, EQ_Q};
pub use gain::Gain;
pub use retro::RetroEffect;

/// Trait for audio processors
pub trait Effect: Send {
    /// Process audio samples in place (stereo interleaved)
    fn process(&mut self, samples: &mut [f32]);

    /// Reset effect state
    fn reset(&mut self);

    /// Check if effect is enabled
    fn is_enabled(&self) -> bool;

    /// Enable/disable the effect
    fn set_enabled(&mut self, enabled: bool);

    /// Get effect name
    fn name(&self) -> &'static str;
}
