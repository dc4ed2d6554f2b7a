//! Shared output gain with click-free volume changes

use super::Effect;

pub struct Gain {
    volume: f32,
    /// Smoothed volume (interpolates toward `volume` to prevent clicks)
    smoothed: f32,
}

impl Gain {
    /// Smoothing coefficient for volume (~5ms at 48kHz)
    const SMOOTH_COEFF: f32 = 0.995;

    pub fn new(volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        Self {
            volume,
            smoothed: volume,
        }
    }

    /// Set target volume (0.0 - 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Effect for Gain {
    fn process(&mut self, samples: &mut [f32]) {
        for frame in samples.chunks_exact_mut(2) {
            self.smoothed = Self::SMOOTH_COEFF * self.smoothed
                + (1.0 - Self::SMOOTH_COEFF) * self.volume;
            frame[0] *= self.smoothed;
            frame[1] *= self.smoothed;
        }
    }

    fn reset(&mut self) {
        self.smoothed = self.volume;
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn set_enabled(&mut self, _enabled: bool) {}

    fn name(&self) -> &'static str {
        "Gain"
    }
}
