//! Audio engine - runs the active chain on the audio thread
//!
//! The control side owns the topology; the audio thread only sees the
//! resulting [`ChainLayout`] plus the stage processors it was handed.

use crate::dsp::{Effect, Equalizer, Gain, RetroEffect, EQ_BANDS};
use crate::source::{SourceState, TrackSource};
use crate::stages::{ChainLayout, StageKind};
use crate::tap::TapWriter;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Commands sent to the audio engine
#[derive(Debug)]
pub enum AudioCommand {
    /// Replace the playing track. Samples are interleaved stereo at the engine rate.
    Load {
        track_id: u64,
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
    },
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetVolume(f32),

    /// Stages to run between the source and the gain
    SetChain(ChainLayout),

    // Equalizer stage
    InstallEqualizer(Box<Equalizer>),
    SetEqBandGain(usize, f32),
    SetEqGains([f32; EQ_BANDS]),
    SetEqEnabled(bool),

    // Retro stage
    InstallRetro(Box<RetroEffect>),
    SetRetroEnabled(bool),

    Shutdown,
}

/// Events sent from the audio engine
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// Output device is running at `sample_rate`
    Ready { sample_rate: u32 },
    /// No output device could be opened
    Unavailable(String),
    Position {
        track_id: u64,
        position_secs: f64,
        duration_secs: f64,
    },
    TrackEnded { track_id: u64 },
    Error(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("audio engine did not become ready within {0:?}")]
    Timeout(Duration),
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// Maximum buffer size for pre-allocated processing buffers
const MAX_BUFFER_SIZE: usize = 4096;

/// Interval between position reports
pub const STATE_UPDATE_INTERVAL: Duration = Duration::from_millis(33);

/// Audio engine state (held in audio thread)
pub struct EngineState {
    source: TrackSource,
    equalizer: Option<Box<Equalizer>>,
    retro: Option<Box<RetroEffect>>,
    gain: Gain,
    chain: ChainLayout,
    tap: Option<TapWriter>,
    sample_rate: u32,
    /// Pre-allocated block buffer (avoids allocation in audio callback)
    buffer: Vec<f32>,
}

impl EngineState {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            source: TrackSource::new(sample_rate),
            equalizer: None,
            retro: None,
            gain: Gain::default(),
            chain: ChainLayout::empty(),
            tap: None,
            sample_rate,
            buffer: vec![0.0; MAX_BUFFER_SIZE],
        }
    }

    /// Attach the analysis tap (fed post-chain, pre-gain)
    pub fn with_tap(mut self, tap: TapWriter) -> Self {
        self.tap = Some(tap);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn chain(&self) -> ChainLayout {
        self.chain
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    pub fn equalizer(&self) -> Option<&Equalizer> {
        self.equalizer.as_deref()
    }

    pub fn retro(&self) -> Option<&RetroEffect> {
        self.retro.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.gain.volume()
    }

    /// Process a command
    pub fn handle_command(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Load {
                track_id,
                samples,
                sample_rate,
            } => {
                if sample_rate != self.sample_rate {
                    tracing::warn!(
                        track_rate = sample_rate,
                        engine_rate = self.sample_rate,
                        "track sample rate differs from output"
                    );
                }
                self.source.load(track_id, samples, sample_rate);
            }
            AudioCommand::Play => self.source.play(),
            AudioCommand::Pause => self.source.pause(),
            AudioCommand::Stop => self.source.stop(),
            AudioCommand::Seek(secs) => self.source.seek(secs),
            AudioCommand::SetVolume(volume) => self.gain.set_volume(volume),

            AudioCommand::SetChain(layout) => {
                tracing::debug!(?layout, "chain updated");
                self.chain = layout;
            }

            AudioCommand::InstallEqualizer(eq) => self.equalizer = Some(eq),
            AudioCommand::SetEqBandGain(index, gain_db) => {
                if let Some(eq) = self.equalizer.as_mut() {
                    eq.set_band_gain(index, gain_db);
                }
            }
            AudioCommand::SetEqGains(gains) => {
                if let Some(eq) = self.equalizer.as_mut() {
                    eq.set_gains(&gains);
                }
            }
            AudioCommand::SetEqEnabled(enabled) => {
                if let Some(eq) = self.equalizer.as_mut() {
                    eq.set_enabled(enabled);
                }
            }

            AudioCommand::InstallRetro(retro) => self.retro = Some(retro),
            AudioCommand::SetRetroEnabled(enabled) => {
                if let Some(retro) = self.retro.as_mut() {
                    retro.set_enabled(enabled);
                }
            }

            // Handled by the command loop
            AudioCommand::Shutdown => {}
        }
    }

    /// Events the control side should see since the last call
    pub fn poll_events(&mut self, out: &mut Vec<AudioEvent>) {
        if !self.source.is_loaded() {
            return;
        }
        let track_id = self.source.track_id();
        if self.source.take_ended() {
            out.push(AudioEvent::TrackEnded { track_id });
        }
        if self.source.state() == SourceState::Playing || !out.is_empty() {
            out.push(AudioEvent::Position {
                track_id,
                position_secs: self.source.position_secs(),
                duration_secs: self.source.duration_secs(),
            });
        }
    }

    /// Process audio for output buffer (stereo interleaved)
    pub fn process(&mut self, output: &mut [f32]) {
        let len = output.len();

        // Should rarely happen after the first call
        if len > self.buffer.len() {
            self.buffer.resize(len, 0.0);
        }
        let block = &mut self.buffer[..len];

        self.source.process(block);

        for kind in self.chain.iter() {
            match kind {
                StageKind::Equalizer => {
                    if let Some(eq) = self.equalizer.as_mut() {
                        eq.process(block);
                    }
                }
                StageKind::RetroEffect => {
                    if let Some(retro) = self.retro.as_mut() {
                        retro.process(block);
                    }
                }
            }
        }

        if let Some(tap) = self.tap.as_mut() {
            tap.write_stereo(block);
        }

        self.gain.process(block);
        output.copy_from_slice(block);
    }
}

/// Drain commands and report state until shutdown.
///
/// The audio callback shares `state` and only ever `try_lock`s it.
pub fn run_command_loop(
    state: &Mutex<EngineState>,
    command_rx: &Receiver<AudioCommand>,
    event_tx: &Sender<AudioEvent>,
    shutdown: &AtomicBool,
) {
    let mut last_update = Instant::now();
    let mut events = Vec::with_capacity(4);

    while !shutdown.load(Ordering::Relaxed) {
        match command_rx.recv_timeout(Duration::from_millis(10)) {
            Ok(AudioCommand::Shutdown) => break,
            Ok(cmd) => state.lock().handle_command(cmd),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_update.elapsed() >= STATE_UPDATE_INTERVAL {
            state.lock().poll_events(&mut events);
            for event in events.drain(..) {
                forward_event(event_tx, event);
            }
            last_update = Instant::now();
        }
    }
    tracing::debug!("audio command loop stopped");
}

/// Hand an event to the UI thread without blocking. A full channel drops
/// it; position updates are superseded anyway, a lost end is logged.
fn forward_event(event_tx: &Sender<AudioEvent>, event: AudioEvent) -> bool {
    match event_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(AudioEvent::TrackEnded { track_id })) => {
            tracing::warn!(track_id, "event channel full, end of track dropped");
            false
        }
        Err(_) => false,
    }
}

/// Handle to communicate with the audio engine
pub struct AudioEngine {
    /// Send commands to audio thread
    pub command_tx: Sender<AudioCommand>,
    /// Receive events from audio thread
    pub event_rx: Receiver<AudioEvent>,
    /// Shutdown flag
    shutdown: Arc<AtomicBool>,
}

impl AudioEngine {
    /// Create channels for engine communication
    /// Buffer size of 1024 provides headroom for command bursts without saturation
    pub fn create_channels() -> (
        Sender<AudioCommand>,
        Receiver<AudioCommand>,
        Sender<AudioEvent>,
        Receiver<AudioEvent>,
    ) {
        let (cmd_tx, cmd_rx) = bounded(1024);
        let (evt_tx, evt_rx) = bounded(1024);
        (cmd_tx, cmd_rx, evt_tx, evt_rx)
    }

    /// Create a new engine handle
    pub fn new(command_tx: Sender<AudioCommand>, event_rx: Receiver<AudioEvent>) -> Self {
        Self {
            command_tx,
            event_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send a command to the audio engine
    pub fn send(&self, cmd: AudioCommand) {
        if let Err(err) = self.command_tx.try_send(cmd) {
            tracing::warn!("dropped audio command: {err}");
        }
    }

    /// Shared shutdown flag for the audio thread
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.command_tx.try_send(AudioCommand::Shutdown);
    }

    /// Block until the output reports its sample rate.
    ///
    /// Polls in short slices so a late device still counts, and gives up
    /// after `timeout`.
    pub fn wait_ready(&self, timeout: Duration) -> Result<u32, EngineError> {
        const POLL: Duration = Duration::from_millis(50);
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(EngineError::Timeout(timeout));
            }
            match self.event_rx.recv_timeout(remaining.min(POLL)) {
                Ok(AudioEvent::Ready { sample_rate }) => return Ok(sample_rate),
                Ok(AudioEvent::Unavailable(reason)) => {
                    return Err(EngineError::Unavailable(reason))
                }
                Ok(other) => tracing::debug!(?other, "event before ready ignored"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(EngineError::Unavailable("audio thread exited".into()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tap::tap_channel;

    fn tone(frames: usize) -> Arc<Vec<f32>> {
        Arc::new(
            (0..frames)
                .flat_map(|i| {
                    let s = (i as f32 * 0.03).sin() * 0.5;
                    [s, s]
                })
                .collect(),
        )
    }

    #[test]
    fn test_silence_without_track() {
        let mut state = EngineState::new(48000);
        let mut out = vec![1.0f32; 256];
        state.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_plays_loaded_track_through_gain() {
        let mut state = EngineState::new(48000);
        state.handle_command(AudioCommand::Load {
            track_id: 1,
            samples: tone(4800),
            sample_rate: 48000,
        });
        state.handle_command(AudioCommand::Play);
        let mut out = vec![0.0f32; 512];
        state.process(&mut out);
        assert!(out.iter().any(|&s| s.abs() > 0.01));
        assert!(out.iter().all(|&s| s.abs() <= 0.5));
    }

    #[test]
    fn test_chain_only_runs_listed_stages() {
        let mut state = EngineState::new(48000);
        let mut eq = Equalizer::new(48000.0);
        eq.set_band_gain(0, 12.0);
        state.handle_command(AudioCommand::InstallEqualizer(Box::new(eq)));
        state.handle_command(AudioCommand::SetEqBandGain(0, -6.0));
        assert_eq!(state.equalizer().and_then(|eq| eq.band_gain(0)), Some(-6.0));

        state.handle_command(AudioCommand::SetChain(ChainLayout::from_kinds(&[
            StageKind::Equalizer,
        ])));
        assert!(state.chain().contains(StageKind::Equalizer));
        assert!(!state.chain().contains(StageKind::RetroEffect));
    }

    #[test]
    fn test_eq_commands_before_install_are_ignored() {
        let mut state = EngineState::new(48000);
        state.handle_command(AudioCommand::SetEqGains([3.0; EQ_BANDS]));
        assert!(state.equalizer().is_none());
    }

    #[test]
    fn test_retro_enable_starts_noise() {
        let mut state = EngineState::new(44100);
        let mut rng = rand::thread_rng();
        state.handle_command(AudioCommand::InstallRetro(Box::new(RetroEffect::new(
            44100, &mut rng,
        ))));
        state.handle_command(AudioCommand::SetRetroEnabled(true));
        assert!(state.retro().is_some_and(|r| r.noise_playing()));
        state.handle_command(AudioCommand::SetRetroEnabled(false));
        assert!(state.retro().is_some_and(|r| !r.noise_playing()));
    }

    #[test]
    fn test_tap_sees_pre_gain_signal() {
        let (writer, mut reader) = tap_channel(8192);
        let mut state = EngineState::new(48000).with_tap(writer);
        state.handle_command(AudioCommand::Load {
            track_id: 1,
            samples: tone(4800),
            sample_rate: 48000,
        });
        state.handle_command(AudioCommand::SetVolume(0.0));
        state.handle_command(AudioCommand::Play);
        let mut out = vec![0.0f32; 1024];
        state.process(&mut out);
        assert_eq!(reader.pending(), 512);

        let mut analyser = tinamp_analysis::Analyser::new(48000);
        reader.drain_into(&mut analyser);
        let mut wave = vec![0u8; 512];
        tinamp_analysis::AnalysisTap::time_domain_data(&mut analyser, &mut wave);
        assert!(wave.iter().any(|&b| b > 160));
    }

    #[test]
    fn test_track_end_event() {
        let mut state = EngineState::new(100);
        state.handle_command(AudioCommand::Load {
            track_id: 9,
            samples: tone(10),
            sample_rate: 100,
        });
        state.handle_command(AudioCommand::Play);
        let mut out = vec![0.0f32; 64];
        state.process(&mut out);

        let mut events = Vec::new();
        state.poll_events(&mut events);
        assert_eq!(events[0], AudioEvent::TrackEnded { track_id: 9 });
        assert!(matches!(events[1], AudioEvent::Position { track_id: 9, .. }));

        events.clear();
        state.poll_events(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_wait_ready() {
        let (cmd_tx, _cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();
        let engine = AudioEngine::new(cmd_tx, evt_rx);
        evt_tx.send(AudioEvent::Ready { sample_rate: 44100 }).unwrap();
        assert_eq!(engine.wait_ready(Duration::from_millis(200)), Ok(44100));

        assert_eq!(
            engine.wait_ready(Duration::from_millis(60)),
            Err(EngineError::Timeout(Duration::from_millis(60)))
        );

        evt_tx.send(AudioEvent::Unavailable("no device".into())).unwrap();
        assert!(matches!(
            engine.wait_ready(Duration::from_millis(200)),
            Err(EngineError::Unavailable(_))
        ));
    }

    #[test]
    fn test_command_loop_stops_on_shutdown() {
        let (cmd_tx, cmd_rx, evt_tx, _evt_rx) = AudioEngine::create_channels();
        let state = Mutex::new(EngineState::new(48000));
        let flag = AtomicBool::new(false);
        cmd_tx.send(AudioCommand::SetVolume(0.8)).unwrap();
        cmd_tx.send(AudioCommand::Shutdown).unwrap();
        run_command_loop(&state, &cmd_rx, &evt_tx, &flag);
        assert_eq!(state.lock().volume(), 0.8);
    }

    #[test]
    fn test_full_event_channel_drops_without_blocking() {
        let (tx, rx) = bounded(1);
        assert!(forward_event(
            &tx,
            AudioEvent::Position {
                track_id: 1,
                position_secs: 1.0,
                duration_secs: 2.0,
            }
        ));
        assert!(!forward_event(&tx, AudioEvent::TrackEnded { track_id: 1 }));
        assert_eq!(rx.try_iter().count(), 1);
    }
}
