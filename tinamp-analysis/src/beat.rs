//! Threshold-relative beat detection over bass energy

use std::collections::VecDeque;

/// Number of frames kept in the rolling energy history
pub const BEAT_HISTORY: usize = 30;
/// A beat fires when bass energy exceeds the rolling average times this
pub const BEAT_THRESHOLD: f32 = 0.8;
/// Minimum time between two fired beats
pub const BEAT_MIN_INTERVAL_MS: f64 = 200.0;

/// Number of low frequency bins averaged into bass energy
const BASS_BINS: usize = 10;

/// Average of the lowest frequency bins (0-255 scale)
pub fn bass_energy(frequency_data: &[u8]) -> f32 {
    let bins = &frequency_data[..frequency_data.len().min(BASS_BINS)];
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    sum as f32 / BASS_BINS as f32
}

/// Debounced beat detector
///
/// Energy is compared against the average of the last 30 frames,
/// including the current one.
pub struct BeatDetector {
    history: VecDeque<f32>,
    last_beat_ms: Option<f64>,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(BEAT_HISTORY),
            last_beat_ms: None,
        }
    }

    /// Feed one frame of bass energy observed at `now_ms`.
    /// Returns true when a beat fires on this frame.
    pub fn process(&mut self, energy: f32, now_ms: f64) -> bool {
        self.history.push_back(energy);
        if self.history.len() > BEAT_HISTORY {
            self.history.pop_front();
        }

        let average = self.history.iter().sum::<f32>() / self.history.len() as f32;

        let debounced = self
            .last_beat_ms
            .map_or(true, |last| now_ms - last > BEAT_MIN_INTERVAL_MS);

        if energy > average * BEAT_THRESHOLD && debounced {
            self.last_beat_ms = Some(now_ms);
            return true;
        }
        false
    }

    /// Rolling average of the energy history
    pub fn average(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    /// Time of the most recent fired beat
    pub fn last_beat_ms(&self) -> Option<f64> {
        self.last_beat_ms
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_beat_ms = None;
    }
}
