//! Player - transport, playlist and stage control on the UI thread
//!
//! Owns the control-side view of playback. Every change that affects
//! audio is forwarded to the engine as a command; the engine reports
//! position and end-of-track back as events.

use crate::engine::{AudioCommand, AudioEngine, AudioEvent, EngineError};
use crate::graph::WiringError;
use crate::router::SignalRouter;
use crate::stages::{ChainLayout, EqPreset, EqualizerStage, RetroStage, Stage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tinamp_library::playlist::{self, PlaylistError};
use tinamp_library::{file_info, is_supported, Decode, FileInfo, LoadError, LoadedTrack};

/// Going back within this many seconds of the start skips to the previous track
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

/// Title shown while nothing is loaded
pub const NO_TRACK_TITLE: &str = "No file loaded";

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Playlist(#[from] PlaylistError),
    #[error(transparent)]
    Wiring(#[from] WiringError),
    #[error("no track loaded")]
    NoTrack,
    #[error("audio output not ready yet")]
    NotReady,
    #[error("audio output unavailable: {0}")]
    AudioUnavailable(String),
    #[error("playlist index {0} out of range")]
    IndexOutOfRange(usize),
}

/// Output device status as seen by the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Pending,
    Ready { sample_rate: u32 },
    Unavailable(String),
}

/// Transport and playlist state
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub current_track: Option<FileInfo>,
    pub is_playing: bool,
    pub is_paused: bool,
    pub volume: f32,
    pub playlist: Vec<FileInfo>,
    pub current_index: usize,
    pub shuffle: bool,
    pub repeat: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            is_paused: false,
            volume: 0.5,
            playlist: Vec::new(),
            current_index: 0,
            shuffle: false,
            repeat: false,
            position_secs: 0.0,
            duration_secs: 0.0,
        }
    }
}

/// What the UI should react to after draining engine events
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    EngineReady { sample_rate: u32 },
    EngineUnavailable(String),
    TimeUpdate { position_secs: f64, duration_secs: f64 },
    TrackEnded,
    Error(String),
}

pub struct Player<D: Decode> {
    engine: AudioEngine,
    decoder: D,
    router: SignalRouter,
    equalizer: EqualizerStage,
    retro: RetroStage,
    state: PlaybackState,
    status: EngineStatus,
    /// Identifies the loaded track in engine events
    track_id: u64,
    rng: StdRng,
}

impl<D: Decode> Player<D> {
    pub fn new(engine: AudioEngine, decoder: D) -> Result<Self, PlayerError> {
        let commands = engine.command_tx.clone();
        let player = Self {
            router: SignalRouter::new(commands.clone())?,
            equalizer: EqualizerStage::new(commands.clone()),
            retro: RetroStage::new(commands),
            engine,
            decoder,
            state: PlaybackState::default(),
            status: EngineStatus::Pending,
            track_id: 0,
            rng: StdRng::from_entropy(),
        };
        player.engine.send(AudioCommand::SetVolume(player.state.volume));
        Ok(player)
    }

    /// Use a fixed generator for shuffle
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn equalizer(&self) -> &EqualizerStage {
        &self.equalizer
    }

    pub fn retro(&self) -> &RetroStage {
        &self.retro
    }

    pub fn router(&self) -> &SignalRouter {
        &self.router
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    /// Block until the output is running, then build the stages
    pub fn wait_ready(&mut self, timeout: Duration) -> Result<u32, PlayerError> {
        match self.engine.wait_ready(timeout) {
            Ok(sample_rate) => {
                self.on_ready(sample_rate);
                Ok(sample_rate)
            }
            Err(EngineError::Unavailable(reason)) => {
                self.status = EngineStatus::Unavailable(reason.clone());
                Err(PlayerError::AudioUnavailable(reason))
            }
            Err(EngineError::Timeout(_)) => Err(PlayerError::NotReady),
        }
    }

    fn on_ready(&mut self, sample_rate: u32) {
        self.status = EngineStatus::Ready { sample_rate };
        self.equalizer.build(self.router.graph_mut(), sample_rate);
        self.retro.set_sample_rate(self.router.graph_mut(), sample_rate);
        self.reconnect();
        tracing::info!(sample_rate, "audio output ready");
    }

    fn sample_rate(&self) -> Result<u32, PlayerError> {
        match &self.status {
            EngineStatus::Ready { sample_rate } => Ok(*sample_rate),
            EngineStatus::Pending => Err(PlayerError::NotReady),
            EngineStatus::Unavailable(reason) => Err(PlayerError::AudioUnavailable(reason.clone())),
        }
    }

    /// Re-run the router over both stages
    pub fn reconnect(&mut self) -> ChainLayout {
        let mut stages: [&mut dyn Stage; 2] = [&mut self.equalizer, &mut self.retro];
        self.router.connect(&mut stages)
    }

    // --- Transport ---

    /// Decode `path` and make it the current track, stopped at the start.
    /// On failure nothing changes.
    pub fn load(&mut self, path: &Path) -> Result<(), PlayerError> {
        let sample_rate = self.sample_rate()?;
        let track = self.decoder.decode(path, sample_rate)?;
        let info = self.describe(path, &track);

        self.track_id += 1;
        self.state.duration_secs = track.duration_secs();
        self.engine.send(AudioCommand::Load {
            track_id: self.track_id,
            samples: Arc::new(track.samples),
            sample_rate: track.sample_rate,
        });

        tracing::info!(path = %path.display(), duration = self.state.duration_secs, "track loaded");
        self.state.current_track = Some(info);
        self.state.position_secs = 0.0;
        self.state.is_playing = false;
        self.state.is_paused = false;
        self.reconnect();
        Ok(())
    }

    fn describe(&self, path: &Path, track: &LoadedTrack) -> FileInfo {
        let mut info = match self.state.playlist.iter().find(|t| t.path == path) {
            Some(entry) => entry.clone(),
            None => FileInfo {
                title: track.metadata.title.clone(),
                artist: track.metadata.artist.clone(),
                album: track.metadata.album.clone(),
                ..FileInfo::fallback(path)
            },
        };
        info.duration_secs = track.duration_secs();
        info
    }

    /// Start playback. With nothing loaded, loads the current playlist entry.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        if self.state.current_track.is_none() {
            if self.state.playlist.is_empty() {
                return Err(PlayerError::NoTrack);
            }
            let index = self.state.current_index.min(self.state.playlist.len() - 1);
            self.load_index(index)?;
        }
        self.engine.send(AudioCommand::Play);
        self.state.is_playing = true;
        self.state.is_paused = false;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.engine.send(AudioCommand::Pause);
        self.state.is_playing = false;
        self.state.is_paused = true;
    }

    pub fn stop(&mut self) {
        self.engine.send(AudioCommand::Stop);
        self.state.is_playing = false;
        self.state.is_paused = false;
        self.state.position_secs = 0.0;
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlayerError> {
        if self.state.is_playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jump to `percent` (0..=100) of the track. Returns the new position,
    /// or `None` when the duration is unknown.
    pub fn seek(&mut self, percent: f64) -> Option<f64> {
        if self.state.current_track.is_none() || self.state.duration_secs <= 0.0 {
            return None;
        }
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        let position = percent / 100.0 * self.state.duration_secs;
        self.seek_to(position);
        Some(position)
    }

    /// Move by `delta_secs` from the current position
    pub fn skip(&mut self, delta_secs: f64) -> Option<f64> {
        if self.state.duration_secs <= 0.0 {
            return None;
        }
        let target = self.state.position_secs + delta_secs;
        self.seek(target / self.state.duration_secs * 100.0)
    }

    fn seek_to(&mut self, position_secs: f64) {
        self.engine.send(AudioCommand::Seek(position_secs));
        self.state.position_secs = position_secs;
    }

    /// Clamp to 0..=1 and apply
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.state.volume = volume;
        self.engine.send(AudioCommand::SetVolume(volume));
        volume
    }

    pub fn adjust_volume(&mut self, delta: f32) -> f32 {
        self.set_volume(self.state.volume + delta)
    }

    // --- Playlist navigation ---

    pub fn next_track(&mut self) -> Result<(), PlayerError> {
        if self.state.playlist.is_empty() {
            return Ok(());
        }
        let index = self.pick_index(1);
        let autoplay = self.state.is_playing;
        self.advance_to(index, autoplay)
    }

    /// Restart the current track if it has played for more than three
    /// seconds, otherwise go to the previous entry.
    pub fn previous_track(&mut self) -> Result<(), PlayerError> {
        if self.state.playlist.is_empty() {
            return Ok(());
        }
        if self.state.position_secs > RESTART_THRESHOLD_SECS {
            self.seek_to(0.0);
            return Ok(());
        }
        let index = self.pick_index(-1);
        let autoplay = self.state.is_playing;
        self.advance_to(index, autoplay)
    }

    /// Random under shuffle, otherwise one step with wraparound
    fn pick_index(&mut self, step: isize) -> usize {
        let len = self.state.playlist.len();
        if self.state.shuffle {
            return self.rng.gen_range(0..len);
        }
        (self.state.current_index as isize + step).rem_euclid(len as isize) as usize
    }

    /// React to the engine reporting the end of the current track
    pub fn handle_track_end(&mut self) -> Result<(), PlayerError> {
        if self.state.repeat && self.state.current_track.is_some() {
            self.seek_to(0.0);
            self.engine.send(AudioCommand::Play);
            self.state.is_playing = true;
            self.state.is_paused = false;
            return Ok(());
        }
        if self.state.playlist.len() > 1 {
            let index = self.pick_index(1);
            // The engine already stopped the source; nothing else will advance
            if let Err(err) = self.advance_to(index, true) {
                self.stop();
                return Err(err);
            }
            return Ok(());
        }
        self.stop();
        Ok(())
    }

    /// Load and play entry `index`
    pub fn play_index(&mut self, index: usize) -> Result<(), PlayerError> {
        self.advance_to(index, true)
    }

    fn advance_to(&mut self, index: usize, autoplay: bool) -> Result<(), PlayerError> {
        self.load_index(index)?;
        if autoplay {
            self.play()?;
        }
        Ok(())
    }

    fn load_index(&mut self, index: usize) -> Result<(), PlayerError> {
        let path = self
            .state
            .playlist
            .get(index)
            .map(|t| t.path.clone())
            .ok_or(PlayerError::IndexOutOfRange(index))?;
        self.load(&path)?;
        self.state.current_index = index;
        Ok(())
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.shuffle = !self.state.shuffle;
        self.state.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.state.repeat = !self.state.repeat;
        self.state.repeat
    }

    // --- Playlist editing ---

    pub fn add_to_playlist(&mut self, tracks: impl IntoIterator<Item = FileInfo>) -> usize {
        let before = self.state.playlist.len();
        self.state.playlist.extend(tracks);
        self.state.playlist.len() - before
    }

    /// Add audio files, expanding `.m3u` playlists. Unsupported paths are
    /// skipped with a warning.
    pub fn add_paths(&mut self, paths: &[PathBuf]) -> usize {
        let mut tracks = Vec::new();
        for path in paths {
            if playlist::is_playlist(path) {
                match playlist::read(path) {
                    Ok(entries) => {
                        tracks.extend(entries.iter().map(|e| file_info(&e.path)));
                    }
                    Err(err) => tracing::warn!(path = %path.display(), "skipping playlist: {err}"),
                }
            } else if is_supported(path) {
                tracks.push(file_info(path));
            } else {
                tracing::warn!(path = %path.display(), "unsupported file skipped");
            }
        }
        self.add_to_playlist(tracks)
    }

    pub fn remove_track(&mut self, index: usize) -> Result<FileInfo, PlayerError> {
        if index >= self.state.playlist.len() {
            return Err(PlayerError::IndexOutOfRange(index));
        }
        let removed = self.state.playlist.remove(index);
        if self.state.current_index >= index {
            self.state.current_index = self.state.current_index.saturating_sub(1);
        }
        Ok(removed)
    }

    pub fn clear_playlist(&mut self) {
        self.state.playlist.clear();
        self.state.current_index = 0;
        self.stop();
        self.state.current_track = None;
        self.state.duration_secs = 0.0;
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.state.playlist.iter().map(|t| t.duration_secs).sum()
    }

    /// Write the playlist as M3U. Returns false when there is nothing to save.
    pub fn save_playlist(&self, path: &Path) -> Result<bool, PlayerError> {
        if self.state.playlist.is_empty() {
            return Ok(false);
        }
        playlist::write(path, &self.state.playlist)?;
        tracing::info!(path = %path.display(), tracks = self.state.playlist.len(), "playlist saved");
        Ok(true)
    }

    /// Replace the playlist with an M3U file and load its first entry
    pub fn load_playlist(&mut self, path: &Path) -> Result<usize, PlayerError> {
        let entries = playlist::read(path)?;
        self.clear_playlist();
        let added = self.add_to_playlist(entries.iter().map(|e| file_info(&e.path)));
        if added > 0 {
            if let Err(err) = self.load_index(0) {
                tracing::warn!("first playlist entry failed to load: {err}");
            }
        }
        Ok(added)
    }

    // --- Stages ---

    pub fn set_eq_band(&mut self, index: usize, gain_db: f32) -> Option<f32> {
        self.equalizer.set_band_gain(index, gain_db)
    }

    pub fn load_eq_preset(&mut self, preset: EqPreset) {
        self.equalizer.load_preset(preset);
    }

    pub fn cycle_eq_preset(&mut self) -> EqPreset {
        self.equalizer.cycle_preset()
    }

    pub fn set_eq_enabled(&mut self, enabled: bool) {
        self.equalizer.set_enabled(self.router.graph_mut(), enabled);
        self.reconnect();
    }

    pub fn toggle_eq(&mut self) -> bool {
        let enabled = !self.equalizer.is_enabled();
        self.set_eq_enabled(enabled);
        enabled
    }

    pub fn toggle_retro(&mut self) -> bool {
        let enabled = self.retro.toggle(self.router.graph_mut());
        self.reconnect();
        enabled
    }

    /// Current title, tagged while retro mode is on
    pub fn display_title(&self) -> String {
        let title = self
            .state
            .current_track
            .as_ref()
            .map_or(NO_TRACK_TITLE, |t| t.title.as_str());
        self.retro.decorate_title(title)
    }

    pub fn display_artist(&self) -> &str {
        self.state
            .current_track
            .as_ref()
            .map_or("", |t| t.artist.as_str())
    }

    // --- Events ---

    /// Drain pending engine events
    pub fn poll_events(&mut self) -> Vec<PlayerEvent> {
        let events: Vec<AudioEvent> = self.engine.event_rx.try_iter().collect();
        events
            .into_iter()
            .filter_map(|event| self.handle_event(event))
            .collect()
    }

    pub fn handle_event(&mut self, event: AudioEvent) -> Option<PlayerEvent> {
        match event {
            AudioEvent::Ready { sample_rate } => {
                self.on_ready(sample_rate);
                Some(PlayerEvent::EngineReady { sample_rate })
            }
            AudioEvent::Unavailable(reason) => {
                tracing::error!("audio output unavailable: {reason}");
                self.status = EngineStatus::Unavailable(reason.clone());
                Some(PlayerEvent::EngineUnavailable(reason))
            }
            AudioEvent::Position {
                track_id,
                position_secs,
                duration_secs,
            } if track_id == self.track_id => {
                self.state.position_secs = position_secs;
                self.state.duration_secs = duration_secs;
                Some(PlayerEvent::TimeUpdate {
                    position_secs,
                    duration_secs,
                })
            }
            AudioEvent::TrackEnded { track_id } if track_id == self.track_id => {
                match self.handle_track_end() {
                    Ok(()) => Some(PlayerEvent::TrackEnded),
                    Err(err) => {
                        tracing::warn!("advancing after track end failed: {err}");
                        Some(PlayerEvent::Error(err.to_string()))
                    }
                }
            }
            AudioEvent::Position { .. } | AudioEvent::TrackEnded { .. } => None,
            AudioEvent::Error(message) => {
                tracing::error!("audio engine error: {message}");
                Some(PlayerEvent::Error(message))
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageKind;
    use crossbeam_channel::{Receiver, Sender};
    use tinamp_library::TrackMetadata;

    /// Decodes any `.mp3` path to a constant tone; "broken" paths fail
    struct FakeDecoder {
        secs: usize,
    }

    impl Decode for FakeDecoder {
        fn decode(&self, path: &Path, sample_rate: u32) -> Result<LoadedTrack, LoadError> {
            if !is_supported(path) {
                return Err(LoadError::UnsupportedFormat(path.display().to_string()));
            }
            if path.to_string_lossy().contains("broken") {
                return Err(LoadError::Decode("bad frame".into()));
            }
            Ok(LoadedTrack {
                samples: vec![0.1; self.secs * sample_rate as usize * 2],
                sample_rate,
                metadata: TrackMetadata {
                    title: "Tagged".into(),
                    artist: "Someone".into(),
                    ..TrackMetadata::default()
                },
            })
        }
    }

    struct Rig {
        player: Player<FakeDecoder>,
        commands: Receiver<AudioCommand>,
        events: Sender<AudioEvent>,
    }

    fn rig() -> Rig {
        let (cmd_tx, cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();
        let engine = AudioEngine::new(cmd_tx, evt_rx);
        let mut player = Player::new(engine, FakeDecoder { secs: 10 })
            .unwrap()
            .with_rng(StdRng::seed_from_u64(3));
        evt_tx.send(AudioEvent::Ready { sample_rate: 100 }).unwrap();
        player.poll_events();
        Rig {
            player,
            commands: cmd_rx,
            events: evt_tx,
        }
    }

    fn track(name: &str) -> FileInfo {
        FileInfo::fallback(Path::new(name))
    }

    fn with_playlist(names: &[&str]) -> Rig {
        let mut rig = rig();
        rig.player.add_to_playlist(names.iter().map(|n| track(n)));
        rig
    }

    fn drain(rx: &Receiver<AudioCommand>) -> Vec<AudioCommand> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_defaults() {
        let rig = rig();
        let state = rig.player.state();
        assert_eq!(state.volume, 0.5);
        assert!(!state.is_playing);
        assert!(!state.shuffle && !state.repeat);
        assert_eq!(rig.player.display_title(), NO_TRACK_TITLE);
        assert_eq!(rig.player.status(), &EngineStatus::Ready { sample_rate: 100 });
    }

    #[test]
    fn test_load_before_ready_fails() {
        let (cmd_tx, _cmd_rx, _evt_tx, evt_rx) = AudioEngine::create_channels();
        let mut player = Player::new(AudioEngine::new(cmd_tx, evt_rx), FakeDecoder { secs: 1 }).unwrap();
        assert!(matches!(
            player.load(Path::new("/music/a.mp3")),
            Err(PlayerError::NotReady)
        ));
    }

    #[test]
    fn test_unavailable_output() {
        let mut rig = rig();
        rig.events.send(AudioEvent::Unavailable("no device".into())).unwrap();
        let events = rig.player.poll_events();
        assert_eq!(events, vec![PlayerEvent::EngineUnavailable("no device".into())]);
        assert!(matches!(
            rig.player.load(Path::new("/music/a.mp3")),
            Err(PlayerError::AudioUnavailable(_))
        ));
    }

    #[test]
    fn test_failed_load_leaves_state() {
        let mut rig = rig();
        rig.player.load(Path::new("/music/good.mp3")).unwrap();
        drain(&rig.commands);

        let err = rig.player.load(Path::new("/music/notes.txt"));
        assert!(matches!(err, Err(PlayerError::Load(LoadError::UnsupportedFormat(_)))));
        let err = rig.player.load(Path::new("/music/broken.mp3"));
        assert!(matches!(err, Err(PlayerError::Load(LoadError::Decode(_)))));

        assert_eq!(rig.player.display_title(), "Tagged");
        assert!(drain(&rig.commands).is_empty());
    }

    #[test]
    fn test_load_play_pause_stop() {
        let mut rig = rig();
        rig.player.load(Path::new("/music/a.mp3")).unwrap();
        assert_eq!(rig.player.state().duration_secs, 10.0);
        assert_eq!(rig.player.display_artist(), "Someone");

        rig.player.play().unwrap();
        assert!(rig.player.state().is_playing);
        rig.player.pause();
        assert!(rig.player.state().is_paused && !rig.player.state().is_playing);
        rig.player.stop();
        assert!(!rig.player.state().is_paused && !rig.player.state().is_playing);
    }

    #[test]
    fn test_play_without_anything_loaded() {
        let mut rig = rig();
        assert!(matches!(rig.player.play(), Err(PlayerError::NoTrack)));

        let mut rig = with_playlist(&["/m/one.mp3", "/m/two.mp3"]);
        rig.player.play().unwrap();
        let current = rig.player.state().current_track.as_ref().map(|t| t.name.clone());
        assert_eq!(current.as_deref(), Some("one"));
    }

    #[test]
    fn test_seek_percent() {
        let mut rig = rig();
        assert_eq!(rig.player.seek(50.0), None);
        rig.player.load(Path::new("/music/a.mp3")).unwrap();
        drain(&rig.commands);

        assert_eq!(rig.player.seek(50.0), Some(5.0));
        assert_eq!(rig.player.seek(150.0), Some(10.0));
        assert_eq!(rig.player.seek(-3.0), Some(0.0));
        let seeks: Vec<f64> = drain(&rig.commands)
            .into_iter()
            .filter_map(|c| match c {
                AudioCommand::Seek(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(seeks, vec![5.0, 10.0, 0.0]);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut rig = rig();
        assert_eq!(rig.player.set_volume(1.7), 1.0);
        assert_eq!(rig.player.set_volume(-0.2), 0.0);
        assert_eq!(rig.player.adjust_volume(0.25), 0.25);
    }

    #[test]
    fn test_repeat_replays_current() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]);
        rig.player.play_index(1).unwrap();
        rig.player.toggle_repeat();
        drain(&rig.commands);

        rig.player.handle_track_end().unwrap();
        assert_eq!(rig.player.state().current_index, 1);
        assert!(rig.player.state().is_playing);
        let cmds = drain(&rig.commands);
        assert!(matches!(cmds[0], AudioCommand::Seek(s) if s == 0.0));
        assert!(matches!(cmds[1], AudioCommand::Play));
    }

    #[test]
    fn test_track_end_wraps_to_first() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]);
        rig.player.play_index(2).unwrap();
        rig.player.handle_track_end().unwrap();
        assert_eq!(rig.player.state().current_index, 0);
        assert!(rig.player.state().is_playing);
    }

    #[test]
    fn test_track_end_single_entry_stops() {
        let mut rig = with_playlist(&["/m/a.mp3"]);
        rig.player.play_index(0).unwrap();
        rig.player.handle_track_end().unwrap();
        assert!(!rig.player.state().is_playing);
        assert_eq!(rig.player.state().current_index, 0);
    }

    #[test]
    fn test_shuffle_picks_in_range() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3", "/m/d.mp3"]);
        rig.player.toggle_shuffle();
        rig.player.play_index(0).unwrap();
        for _ in 0..20 {
            rig.player.handle_track_end().unwrap();
            assert!(rig.player.state().current_index < 4);
        }
    }

    #[test]
    fn test_previous_restarts_after_three_seconds() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3"]);
        rig.player.play_index(1).unwrap();
        rig.player.seek(50.0);
        rig.player.previous_track().unwrap();
        assert_eq!(rig.player.state().current_index, 1);
        assert_eq!(rig.player.state().position_secs, 0.0);

        rig.player.previous_track().unwrap();
        assert_eq!(rig.player.state().current_index, 0);
        rig.player.previous_track().unwrap();
        assert_eq!(rig.player.state().current_index, 1);
    }

    #[test]
    fn test_next_keeps_paused_state() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3"]);
        rig.player.load(Path::new("/m/a.mp3")).unwrap();
        rig.player.next_track().unwrap();
        assert_eq!(rig.player.state().current_index, 1);
        assert!(!rig.player.state().is_playing);
    }

    #[test]
    fn test_remove_adjusts_index() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3", "/m/c.mp3"]);
        rig.player.play_index(2).unwrap();
        rig.player.remove_track(0).unwrap();
        assert_eq!(rig.player.state().current_index, 1);
        rig.player.remove_track(1).unwrap();
        assert_eq!(rig.player.state().current_index, 0);
        assert!(matches!(rig.player.remove_track(5), Err(PlayerError::IndexOutOfRange(5))));
    }

    #[test]
    fn test_clear_playlist_stops() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3"]);
        rig.player.play_index(1).unwrap();
        rig.player.clear_playlist();
        assert!(rig.player.state().playlist.is_empty());
        assert_eq!(rig.player.state().current_index, 0);
        assert!(!rig.player.state().is_playing);
        assert_eq!(rig.player.display_title(), NO_TRACK_TITLE);
    }

    #[test]
    fn test_track_end_into_broken_entry_stops() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/broken.mp3"]);
        rig.player.play_index(0).unwrap();
        drain(&rig.commands);

        let err = rig.player.handle_track_end();
        assert!(matches!(err, Err(PlayerError::Load(LoadError::Decode(_)))));
        assert!(!rig.player.state().is_playing);
        assert_eq!(rig.player.state().current_index, 0);
        assert!(drain(&rig.commands)
            .iter()
            .any(|c| matches!(c, AudioCommand::Stop)));
    }

    #[test]
    fn test_stale_events_ignored() {
        let mut rig = with_playlist(&["/m/a.mp3", "/m/b.mp3"]);
        rig.player.play_index(0).unwrap();
        rig.player.play_index(1).unwrap();
        rig.events.send(AudioEvent::TrackEnded { track_id: 1 }).unwrap();
        rig.events
            .send(AudioEvent::Position {
                track_id: 2,
                position_secs: 4.0,
                duration_secs: 10.0,
            })
            .unwrap();
        let events = rig.player.poll_events();
        assert_eq!(
            events,
            vec![PlayerEvent::TimeUpdate {
                position_secs: 4.0,
                duration_secs: 10.0
            }]
        );
        assert_eq!(rig.player.state().current_index, 1);
    }

    #[test]
    fn test_retro_toggle_updates_chain_and_title() {
        let mut rig = rig();
        rig.player.load(Path::new("/m/a.mp3")).unwrap();
        rig.player.toggle_retro();
        rig.player.toggle_retro();
        let before = rig.player.router().graph().edge_set();

        assert!(rig.player.toggle_retro());
        assert!(rig.player.router().layout().contains(StageKind::RetroEffect));
        assert_eq!(rig.player.display_title(), "Tagged [AM RADIO]");

        assert!(!rig.player.toggle_retro());
        assert_eq!(rig.player.router().graph().edge_set(), before);
        assert_eq!(rig.player.display_title(), "Tagged");
    }

    #[test]
    fn test_eq_toggle_removes_stage() {
        let mut rig = rig();
        assert!(rig.player.router().layout().contains(StageKind::Equalizer));
        assert!(!rig.player.toggle_eq());
        assert!(rig.player.router().layout().is_empty());
        rig.player.load_eq_preset(EqPreset::Jazz);
        assert_eq!(rig.player.equalizer().band_gain(0), Some(4.0));
    }

    #[test]
    fn test_save_and_load_playlist() {
        let dir = std::env::temp_dir().join(format!("tinamp-player-{}", std::process::id()));
        let path = dir.join("list.m3u");

        let rig = rig();
        assert!(!rig.player.save_playlist(&path).unwrap());

        let rig = with_playlist(&["/m/a.mp3", "/m/b.mp3"]);
        assert!(rig.player.save_playlist(&path).unwrap());

        let mut other = self::rig();
        assert_eq!(other.player.load_playlist(&path).unwrap(), 2);
        assert_eq!(other.player.state().playlist[1].path, PathBuf::from("/m/b.mp3"));
        assert!(other.player.state().current_track.is_some());

        let _ = std::fs::remove_dir_all(dir);
    }
}
