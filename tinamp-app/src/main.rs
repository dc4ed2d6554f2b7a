//! Tinamp - retro terminal media player
//!
//! Wires the cpal output thread, the player and the terminal UI together.

use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex as StdMutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tinamp_analysis::AnalysisTap;
use tinamp_audio::{
    run_command_loop, tap_channel, AudioCommand, AudioEngine, AudioEvent, EngineState, LiveTap,
    Player, PlayerEvent, TapWriter, TAP_CAPACITY,
};
use tinamp_library::{Config, TrackLoader};
use tinamp_tui::{
    draw, Action, App, IntervalScheduler, PlayerView, VisualizerEngine, VisualizerMode,
};

/// How long startup waits for the output device
const READY_TIMEOUT: Duration = Duration::from_secs(3);
/// Fallback analysis rate while no device is running
const FALLBACK_SAMPLE_RATE: u32 = 44100;
/// Scratch size for non-stereo devices (stereo floats)
const SCRATCH_LEN: usize = 16384;

type Visualizer = VisualizerEngine<IntervalScheduler>;

#[derive(Parser, Debug)]
#[command(name = "tinamp", version, about = "Retro terminal media player")]
struct Args {
    /// Audio files or .m3u playlists to queue
    files: Vec<PathBuf>,

    /// Config file (default: <config dir>/tinamp/config.txt)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: <data dir>/tinamp/tinamp.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Initial visualizer mode
    #[arg(long)]
    mode: Option<String>,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tinamp")
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(StdMutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| data_dir().join("tinamp.log"));
    init_logging(&log_path)?;

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::load(),
    };

    // Audio thread
    let (cmd_tx, cmd_rx, evt_tx, evt_rx) = AudioEngine::create_channels();
    let engine = AudioEngine::new(cmd_tx, evt_rx);
    let shutdown = engine.shutdown_flag();
    let (tap_writer, tap_reader) = tap_channel(TAP_CAPACITY);

    let audio_handle = thread::Builder::new()
        .name("tinamp-audio".into())
        .spawn(move || run_audio_thread(cmd_rx, evt_tx, tap_writer, shutdown))?;

    let mut player = Player::new(engine, TrackLoader::new())?;
    let sample_rate = match player.wait_ready(READY_TIMEOUT) {
        Ok(rate) => rate,
        Err(err) => {
            warn!("audio output not ready: {err}");
            FALLBACK_SAMPLE_RATE
        }
    };
    let tap = LiveTap::new(tap_reader, sample_rate);

    // Terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut player, tap, &args, config);

    player.shutdown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if audio_handle.join().is_err() {
        error!("audio thread panicked");
    }
    info!("tinamp exited");
    result
}

fn run_audio_thread(
    cmd_rx: Receiver<AudioCommand>,
    evt_tx: Sender<AudioEvent>,
    tap: TapWriter,
    shutdown: Arc<AtomicBool>,
) {
    let unavailable = |reason: String| {
        error!("{reason}");
        let _ = evt_tx.send(AudioEvent::Unavailable(reason));
    };

    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        unavailable("no audio output device found".into());
        return;
    };

    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            unavailable(format!("failed to get audio config: {e}"));
            return;
        }
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    let engine_state = Arc::new(Mutex::new(EngineState::new(sample_rate).with_tap(tap)));
    let engine_for_callback = Arc::clone(&engine_state);

    // Allocated up front, the callback must not allocate
    let mut scratch = vec![0.0f32; SCRATCH_LEN];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            // Never block the real-time thread; silence on contention
            let Some(mut state) = engine_for_callback.try_lock() else {
                data.fill(0.0);
                return;
            };
            if channels == 2 {
                state.process(data);
                return;
            }
            for block in data.chunks_mut((SCRATCH_LEN / 2) * channels.max(1)) {
                let frames = block.len() / channels.max(1);
                let stereo = &mut scratch[..frames * 2];
                state.process(stereo);
                for (frame, out) in block.chunks_mut(channels.max(1)).enumerate() {
                    let (l, r) = (stereo[frame * 2], stereo[frame * 2 + 1]);
                    match out {
                        [mono] => *mono = (l + r) * 0.5,
                        [left, right, rest @ ..] => {
                            *left = l;
                            *right = r;
                            rest.fill(0.0);
                        }
                        [] => {}
                    }
                }
            }
        },
        |err| error!("audio stream error: {err}"),
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            unavailable(format!("failed to create audio stream: {e}"));
            return;
        }
    };

    if let Err(e) = stream.play() {
        unavailable(format!("failed to start audio: {e}"));
        return;
    }

    info!(sample_rate, channels, "audio output started");
    let _ = evt_tx.send(AudioEvent::Ready { sample_rate });

    run_command_loop(&engine_state, &cmd_rx, &evt_tx, &shutdown);
    drop(stream);
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    player: &mut Player<TrackLoader>,
    mut tap: LiveTap,
    args: &Args,
    mut config: Config,
) -> anyhow::Result<()> {
    let mut app = App::new();

    let mode_name = args.mode.as_deref().unwrap_or(&config.visualizer_mode);
    let mode = VisualizerMode::from_name(mode_name).unwrap_or_else(|| {
        warn!(mode = mode_name, "unknown visualizer mode, using cascade");
        VisualizerMode::default()
    });
    let mut visualizer = VisualizerEngine::new(IntervalScheduler::with_frame_rate(config.frame_rate))
        .with_analysis(config.fft_size, config.smoothing);
    visualizer.set_mode(mode);

    player.set_volume(config.volume);
    queue_startup_tracks(&mut app, player, args, &config);

    let frame_duration = Duration::from_secs_f64(1.0 / config.frame_rate.max(1) as f64);
    let mut meter_bins = vec![0u8; tap.bin_count()];
    let mut was_playing = false;

    loop {
        if app.should_quit || app.state.host.close_requested {
            break;
        }

        for event in player.poll_events() {
            handle_player_event(&mut app, &mut tap, event);
        }

        let playing = player.state().is_playing;
        sync_visualizer(&mut app, &mut visualizer, &mut tap, playing);
        if was_playing && !playing {
            app.state.meter.reset();
        }
        was_playing = playing;

        let now = Instant::now();
        visualizer.tick(&mut tap, now);
        if playing {
            let sample_rate = tap.sample_rate();
            if visualizer.is_running() {
                app.state.meter.update(visualizer.frequency_data(), sample_rate);
            } else {
                meter_bins.resize(tap.bin_count(), 0);
                tap.frequency_data(&mut meter_bins);
                app.state.meter.update(&meter_bins, sample_rate);
            }
        }

        let beat = visualizer.beat_active_at(now);
        let view = PlayerView::from_player(player);
        terminal.draw(|frame| draw(frame, &mut app, &view, &visualizer, beat))?;

        let timeout = frame_duration.saturating_sub(now.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let playlist_len = player.state().playlist.len();
                if let Some(action) = app.handle_key(key, playlist_len) {
                    apply_action(&mut app, player, &mut visualizer, &mut tap, action);
                }
            }
        }
    }

    config.visualizer_mode = visualizer.mode().name().to_string();
    save_session(player, &mut config, args.config.as_deref());
    Ok(())
}

/// Files from the command line, else the playlist from last session
fn queue_startup_tracks(app: &mut App, player: &mut Player<TrackLoader>, args: &Args, config: &Config) {
    if !args.files.is_empty() {
        let added = player.add_paths(&args.files);
        if added > 0 {
            if let Err(err) = player.play_index(0) {
                app.state.set_error(format!("Error: {err}"));
                return;
            }
        }
        app.state.set_message(format!("Queued {added} tracks | Press ? for help"));
        return;
    }

    if let Some(path) = config.last_playlist.as_deref().filter(|p| p.exists()) {
        match player.load_playlist(path) {
            Ok(count) => app
                .state
                .set_message(format!("Restored {count} tracks | Press ? for help")),
            Err(err) => warn!(path = %path.display(), "could not restore playlist: {err}"),
        }
        return;
    }

    app.state
        .set_message("TINAMP | Press ? for help, :add <path> to queue music");
}

/// Remember volume and the playlist for next time
fn save_session(player: &Player<TrackLoader>, config: &mut Config, config_path: Option<&Path>) {
    config.volume = player.state().volume;
    let playlist_path = data_dir().join("last.m3u");
    match player.save_playlist(&playlist_path) {
        Ok(true) => config.last_playlist = Some(playlist_path),
        Ok(false) => config.last_playlist = None,
        Err(err) => warn!("could not save playlist: {err}"),
    }
    let saved = match config_path {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    if let Err(err) = saved {
        warn!("could not save config: {err}");
    }
}

/// Run the visualizer only while something is playing
fn sync_visualizer(app: &mut App, visualizer: &mut Visualizer, tap: &mut LiveTap, playing: bool) {
    if !playing {
        visualizer.stop();
        return;
    }
    if let Err(err) = visualizer.start(tap) {
        warn!("visualizer could not start: {err}");
        app.state.set_error(format!("Visualizer: {err}"));
        visualizer.hide_panel();
    }
}

fn handle_player_event(app: &mut App, tap: &mut LiveTap, event: PlayerEvent) {
    match event {
        PlayerEvent::EngineReady { sample_rate } => {
            tap.rebind(sample_rate);
            app.state.set_success(format!("Audio ready at {sample_rate} Hz"));
        }
        PlayerEvent::EngineUnavailable(reason) => {
            app.state.set_error(format!("Audio unavailable: {reason}"));
        }
        PlayerEvent::Error(msg) => app.state.set_error(format!("Error: {msg}")),
        PlayerEvent::TimeUpdate { .. } | PlayerEvent::TrackEnded => {}
    }
}

fn apply_action(
    app: &mut App,
    player: &mut Player<TrackLoader>,
    visualizer: &mut Visualizer,
    tap: &mut LiveTap,
    action: Action,
) {
    let state = &mut app.state;
    let on_off = |on: bool| if on { "on" } else { "off" };

    let result = match action {
        Action::TogglePlay => player.toggle_play_pause(),
        Action::Stop => {
            player.stop();
            Ok(())
        }
        Action::Next => player.next_track(),
        Action::Previous => player.previous_track(),
        Action::Skip(delta) => {
            player.skip(delta);
            Ok(())
        }
        Action::SeekPercent(percent) => {
            player.seek(percent);
            Ok(())
        }
        Action::AdjustVolume(delta) => {
            let volume = player.adjust_volume(delta);
            state.set_message(format!("Volume {:.0}%", volume * 100.0));
            Ok(())
        }
        Action::ToggleShuffle => {
            let on = player.toggle_shuffle();
            state.set_message(format!("Shuffle {}", on_off(on)));
            Ok(())
        }
        Action::ToggleRepeat => {
            let on = player.toggle_repeat();
            state.set_message(format!("Repeat {}", on_off(on)));
            Ok(())
        }
        Action::ToggleRetro => {
            let on = player.toggle_retro();
            state.set_message(format!("AM radio {}", on_off(on)));
            Ok(())
        }
        Action::ToggleEq => {
            let on = player.toggle_eq();
            state.set_message(format!("Equalizer {}", on_off(on)));
            Ok(())
        }
        Action::CyclePreset => {
            let preset = player.cycle_eq_preset();
            state.set_message(format!("Preset: {}", preset.name()));
            Ok(())
        }
        Action::LoadPreset(preset) => {
            player.load_eq_preset(preset);
            state.set_message(format!("Preset: {}", preset.name()));
            Ok(())
        }
        Action::AdjustBand { band, delta } => {
            let current = player.equalizer().band_gain(band).unwrap_or(0.0);
            player.set_eq_band(band, current + delta);
            Ok(())
        }
        Action::PlayIndex(index) => player.play_index(index),
        Action::RemoveIndex(index) => player.remove_track(index).map(|removed| {
            state.set_message(format!("Removed {}", removed.display_name()));
        }),
        Action::ClearPlaylist => {
            player.clear_playlist();
            state.playlist.select_first();
            state.set_message("Playlist cleared");
            Ok(())
        }
        Action::AddPath(path) => {
            let added = player.add_paths(&[path]);
            state.set_message(format!("Added {added} tracks"));
            Ok(())
        }
        Action::SavePlaylist(path) => player.save_playlist(&path).map(|saved| {
            if saved {
                state.set_success(format!("Saved {}", path.display()));
            } else {
                state.set_warning("Playlist is empty, nothing saved");
            }
        }),
        Action::OpenPlaylist(path) => player.load_playlist(&path).map(|count| {
            state.playlist.select_first();
            state.set_success(format!("Loaded {count} tracks"));
        }),
        Action::ToggleVisualizer => {
            let playing = player.state().is_playing;
            if let Err(err) = visualizer.toggle_panel(playing, tap) {
                state.set_error(format!("Visualizer: {err}"));
            }
            Ok(())
        }
        Action::CycleVisualizerMode => {
            let mode = visualizer.cycle_mode();
            state.set_message(format!("Visualizer: {}", mode.label()));
            Ok(())
        }
        Action::SetVisualizerMode(mode) => {
            visualizer.set_mode(mode);
            state.set_message(format!("Visualizer: {}", mode.label()));
            Ok(())
        }
        Action::Quit => {
            app.should_quit = true;
            Ok(())
        }
    };

    if let Err(err) = result {
        warn!("{err}");
        app.state.set_error(format!("Error: {err}"));
    }
}
