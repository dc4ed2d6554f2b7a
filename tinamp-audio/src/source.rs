//! Track source - the decoded media element feeding the chain

use std::sync::Arc;

/// Transport state of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Plays one decoded track (interleaved stereo) at the output rate
pub struct TrackSource {
    /// Audio samples (interleaved stereo), shared with the control thread
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    /// Identifier of the loaded track, echoed in events
    track_id: u64,
    /// Playback position in interleaved samples, always even
    position: usize,
    state: SourceState,
    /// Set when playback runs off the end, cleared by `take_ended`
    ended: bool,
}

impl TrackSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(Vec::new()),
            sample_rate,
            track_id: 0,
            position: 0,
            state: SourceState::Stopped,
            ended: false,
        }
    }

    /// Replace the loaded track. Playback stops at the start.
    pub fn load(&mut self, track_id: u64, samples: Arc<Vec<f32>>, sample_rate: u32) {
        self.samples = samples;
        self.sample_rate = sample_rate.max(1);
        self.track_id = track_id;
        self.position = 0;
        self.state = SourceState::Stopped;
        self.ended = false;
    }

    pub fn is_loaded(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn play(&mut self) {
        if !self.is_loaded() {
            return;
        }
        if self.position + 1 >= self.samples.len() {
            self.position = 0;
        }
        self.ended = false;
        self.state = SourceState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == SourceState::Playing {
            self.state = SourceState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = SourceState::Stopped;
        self.position = 0;
    }

    /// Jump to `position_secs`, clamped to the track
    pub fn seek(&mut self, position_secs: f64) {
        let frames = (position_secs.max(0.0) * self.sample_rate as f64) as usize;
        self.position = (frames * 2).min(self.samples.len() & !1);
    }

    pub fn duration_secs(&self) -> f64 {
        (self.samples.len() / 2) as f64 / self.sample_rate as f64
    }

    pub fn position_secs(&self) -> f64 {
        (self.position / 2) as f64 / self.sample_rate as f64
    }

    /// Returns true once after the track played to its end
    pub fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended)
    }

    /// Fill `output` with the next frames, silence when not playing
    pub fn process(&mut self, output: &mut [f32]) {
        if self.state != SourceState::Playing {
            output.fill(0.0);
            return;
        }

        let available = self.samples.len().saturating_sub(self.position) & !1;
        let count = available.min(output.len() & !1);
        output[..count].copy_from_slice(&self.samples[self.position..self.position + count]);
        output[count..].fill(0.0);
        self.position += count;

        if self.position + 1 >= self.samples.len() {
            self.state = SourceState::Stopped;
            self.ended = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Arc<Vec<f32>> {
        Arc::new((0..frames * 2).map(|i| (i / 2) as f32).collect())
    }

    #[test]
    fn test_silent_until_played() {
        let mut source = TrackSource::new(10);
        source.load(1, ramp(20), 10);
        let mut out = [1.0f32; 8];
        source.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_plays_and_ends() {
        let mut source = TrackSource::new(10);
        source.load(7, ramp(4), 10);
        source.play();
        let mut out = [0.0f32; 12];
        source.process(&mut out);
        assert_eq!(&out[..8], &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(&out[8..], &[0.0; 4]);
        assert_eq!(source.state(), SourceState::Stopped);
        assert!(source.take_ended());
        assert!(!source.take_ended());
    }

    #[test]
    fn test_play_after_end_restarts() {
        let mut source = TrackSource::new(10);
        source.load(1, ramp(2), 10);
        source.play();
        let mut out = [0.0f32; 4];
        source.process(&mut out);
        source.play();
        assert_eq!(source.position_secs(), 0.0);
    }

    #[test]
    fn test_seek_clamps() {
        let mut source = TrackSource::new(10);
        source.load(1, ramp(50), 10);
        assert_eq!(source.duration_secs(), 5.0);
        source.seek(2.5);
        assert_eq!(source.position_secs(), 2.5);
        source.seek(99.0);
        assert_eq!(source.position_secs(), 5.0);
        source.seek(-1.0);
        assert_eq!(source.position_secs(), 0.0);
    }

    #[test]
    fn test_pause_keeps_position() {
        let mut source = TrackSource::new(10);
        source.load(1, ramp(50), 10);
        source.play();
        let mut out = [0.0f32; 20];
        source.process(&mut out);
        source.pause();
        assert_eq!(source.state(), SourceState::Paused);
        assert_eq!(source.position_secs(), 1.0);
        source.stop();
        assert_eq!(source.position_secs(), 0.0);
    }
}
