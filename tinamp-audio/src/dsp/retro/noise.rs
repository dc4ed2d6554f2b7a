//! Looped static and crackle bed

use rand::Rng;

/// Length of the loop in seconds
pub const NOISE_SECONDS: usize = 2;
/// Base static amplitude
pub const BASE_AMPLITUDE: f32 = 0.02;
/// Per-sample probability of a crackle
pub const CRACKLE_PROBABILITY: f64 = 0.0001;
/// Crackle amplitude
pub const CRACKLE_AMPLITUDE: f32 = 0.1;
/// Constant high-frequency hiss amplitude
pub const HISS_AMPLITUDE: f32 = 0.005;

pub struct NoiseBed {
    buffer: Vec<f32>,
    position: usize,
    playing: bool,
}

impl NoiseBed {
    /// Generate a two-second loop for `sample_rate`
    pub fn generate<R: Rng>(sample_rate: u32, rng: &mut R) -> Self {
        let len = (sample_rate as usize * NOISE_SECONDS).max(1);
        let buffer = (0..len)
            .map(|_| {
                let mut noise = (rng.gen::<f32>() * 2.0 - 1.0) * BASE_AMPLITUDE;
                if rng.gen_bool(CRACKLE_PROBABILITY) {
                    noise += (rng.gen::<f32>() * 2.0 - 1.0) * CRACKLE_AMPLITUDE;
                }
                noise += (rng.gen::<f32>() * 2.0 - 1.0) * HISS_AMPLITUDE;
                noise
            })
            .collect();
        Self {
            buffer,
            position: 0,
            playing: false,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Start looping from the beginning
    pub fn start(&mut self) {
        self.position = 0;
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Next loop sample, or silence while stopped
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.playing {
            return 0.0;
        }
        let sample = self.buffer[self.position];
        self.position = (self.position + 1) % self.buffer.len();
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_two_seconds_long() {
        let mut rng = StdRng::seed_from_u64(7);
        let bed = NoiseBed::generate(44100, &mut rng);
        assert_eq!(bed.len(), 88200);
    }

    #[test]
    fn test_amplitude_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        let bed = NoiseBed::generate(48000, &mut rng);
        let max = BASE_AMPLITUDE + CRACKLE_AMPLITUDE + HISS_AMPLITUDE;
        assert!(bed.buffer.iter().all(|s| s.abs() <= max));
        // Without crackles nearly every sample stays under the base bound
        let quiet = bed
            .buffer
            .iter()
            .filter(|s| s.abs() <= BASE_AMPLITUDE + HISS_AMPLITUDE)
            .count();
        assert!(quiet as f32 / bed.len() as f32 > 0.999);
    }

    #[test]
    fn test_loops_and_stops() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut bed = NoiseBed::generate(10, &mut rng);
        assert_eq!(bed.next_sample(), 0.0);

        bed.start();
        let first: Vec<f32> = (0..20).map(|_| bed.next_sample()).collect();
        let second: Vec<f32> = (0..20).map(|_| bed.next_sample()).collect();
        assert_eq!(first, second);

        bed.stop();
        assert_eq!(bed.next_sample(), 0.0);
        assert!(!bed.is_playing());
    }
}
