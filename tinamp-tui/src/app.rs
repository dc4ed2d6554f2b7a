//! Application state and key handling
//!
//! Keys are translated into [`Action`]s here; the binary applies them to
//! the player and the visualizer. Mode changes, the command line and the
//! panel cursors are handled locally.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tinamp_analysis::BandMeter;
use tinamp_audio::{EqPreset, EQ_BANDS};

use crate::layout::{HostWindow, TerminalHost, WindowFootprint};
use crate::theme::Theme;
use crate::visualizer::VisualizerMode;
use crate::widgets::PlaylistState;

/// Seek step for the arrow keys
pub const SEEK_STEP_SECS: f64 = 5.0;
pub const VOLUME_STEP: f32 = 0.05;
pub const EQ_GAIN_STEP_DB: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Command,
    Help,
}

/// Which panel receives the navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusedPane {
    #[default]
    Main,
    Equalizer,
    Playlist,
}

/// Message type for colored status messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Something the binary must apply to the player or visualizer
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    TogglePlay,
    Stop,
    Next,
    Previous,
    Skip(f64),
    SeekPercent(f64),
    AdjustVolume(f32),
    ToggleShuffle,
    ToggleRepeat,
    ToggleRetro,
    ToggleEq,
    CyclePreset,
    LoadPreset(EqPreset),
    /// Add `delta` dB to the selected band
    AdjustBand { band: usize, delta: f32 },
    PlayIndex(usize),
    RemoveIndex(usize),
    ClearPlaylist,
    AddPath(PathBuf),
    SavePlaylist(PathBuf),
    OpenPlaylist(PathBuf),
    ToggleVisualizer,
    CycleVisualizerMode,
    SetVisualizerMode(VisualizerMode),
    Quit,
}

/// Application state
pub struct AppState {
    pub mode: InputMode,
    pub focused: FocusedPane,
    pub command_buffer: String,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub help_scroll: u16,
    pub theme: Theme,
    pub footprint: WindowFootprint,
    pub host: TerminalHost,
    pub playlist: PlaylistState,
    /// Band under the equalizer cursor
    pub eq_band: usize,
    /// Mini spectrum shown on the main panel
    pub meter: BandMeter,
    pub frame_count: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: InputMode::Normal,
            focused: FocusedPane::Main,
            command_buffer: String::new(),
            message: None,
            message_type: MessageType::Info,
            help_scroll: 0,
            theme: Theme::default(),
            footprint: WindowFootprint::default(),
            host: TerminalHost::default(),
            playlist: PlaylistState::new(),
            eq_band: 0,
            meter: BandMeter::new(),
            frame_count: 0,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        if mode != InputMode::Command {
            self.command_buffer.clear();
        }
        if mode == InputMode::Help {
            self.help_scroll = 0;
        }
    }

    pub fn toggle_eq_panel(&mut self) -> bool {
        let open = self.footprint.toggle_eq(&mut self.host);
        if !open && self.focused == FocusedPane::Equalizer {
            self.focused = FocusedPane::Main;
        }
        open
    }

    pub fn toggle_playlist_panel(&mut self) -> bool {
        let open = self.footprint.toggle_playlist(&mut self.host);
        if !open && self.focused == FocusedPane::Playlist {
            self.focused = FocusedPane::Main;
        }
        open
    }

    /// Cycle focus through the open panels
    pub fn cycle_focus(&mut self) {
        let order = [
            (FocusedPane::Main, true),
            (FocusedPane::Equalizer, self.footprint.eq_open),
            (FocusedPane::Playlist, self.footprint.playlist_open),
        ];
        let current = order
            .iter()
            .position(|&(pane, _)| pane == self.focused)
            .unwrap_or(0);
        for step in 1..=order.len() {
            let (pane, open) = order[(current + step) % order.len()];
            if open {
                self.focused = pane;
                return;
            }
        }
    }

    pub fn set_theme(&mut self, name: &str) {
        match Theme::by_name(name) {
            Some(theme) => {
                self.theme = theme;
                self.set_success(format!("Skin: {}", self.theme.name));
            }
            None => self.set_error(format!("Unknown theme: {name}. Use classic/amber")),
        }
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_type = MessageType::Info;
    }

    fn post(&mut self, text: String, kind: MessageType) {
        self.message = Some(text);
        self.message_type = kind;
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.post(msg.into(), MessageType::Info);
    }

    pub fn set_success(&mut self, msg: impl Into<String>) {
        self.post(msg.into(), MessageType::Success);
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.post(msg.into(), MessageType::Warning);
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.post(msg.into(), MessageType::Error);
    }
}

/// Main application wrapper
pub struct App {
    pub state: AppState,
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Translate a key press. `playlist_len` bounds the playlist cursor.
    pub fn handle_key(&mut self, key: KeyEvent, playlist_len: usize) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('q') => Some(Action::Quit),
                KeyCode::Char('w') => {
                    self.state.host.minimize();
                    None
                }
                _ => None,
            };
        }

        match self.state.mode {
            InputMode::Command => self.handle_command_key(key),
            InputMode::Help => {
                self.handle_help_key(key);
                None
            }
            InputMode::Normal => self.handle_normal_key(key, playlist_len),
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        let state = &mut self.state;
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => state.set_mode(InputMode::Normal),
            KeyCode::Down | KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(3),
            KeyCode::Up | KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(3),
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.state.set_mode(InputMode::Normal);
                None
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.state.command_buffer);
                self.state.set_mode(InputMode::Normal);
                match parse_command(&line) {
                    Ok(Some(Command::Action(action))) => Some(action),
                    Ok(Some(Command::Theme(name))) => {
                        self.state.set_theme(&name);
                        None
                    }
                    Ok(None) => None,
                    Err(msg) => {
                        self.state.set_error(msg);
                        None
                    }
                }
            }
            KeyCode::Backspace => {
                if self.state.command_buffer.pop().is_none() {
                    self.state.set_mode(InputMode::Normal);
                }
                None
            }
            KeyCode::Char(c) => {
                self.state.command_buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, playlist_len: usize) -> Option<Action> {
        if let Some(action) = self.handle_pane_key(key, playlist_len) {
            return action;
        }

        let state = &mut self.state;
        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('x') => Some(Action::TogglePlay),
            KeyCode::Char('s') => Some(Action::Stop),
            KeyCode::Char('n') => Some(Action::Next),
            KeyCode::Char('b') => Some(Action::Previous),
            KeyCode::Left => Some(Action::Skip(-SEEK_STEP_SECS)),
            KeyCode::Right => Some(Action::Skip(SEEK_STEP_SECS)),
            KeyCode::Char(c @ '0'..='9') => {
                let digit = c.to_digit(10).unwrap_or(0);
                Some(Action::SeekPercent(digit as f64 * 10.0))
            }
            KeyCode::Char('-') => Some(Action::AdjustVolume(-VOLUME_STEP)),
            KeyCode::Char('=') | KeyCode::Char('+') => Some(Action::AdjustVolume(VOLUME_STEP)),
            KeyCode::Char('z') => Some(Action::ToggleShuffle),
            KeyCode::Char('r') => Some(Action::ToggleRepeat),
            KeyCode::Char('a') => Some(Action::ToggleRetro),
            KeyCode::Char('E') => Some(Action::ToggleEq),
            KeyCode::Char('P') => Some(Action::CyclePreset),
            KeyCode::Char('v') => Some(Action::ToggleVisualizer),
            KeyCode::Char('m') => Some(Action::CycleVisualizerMode),
            KeyCode::Char('e') => {
                let open = state.toggle_eq_panel();
                if open {
                    state.focused = FocusedPane::Equalizer;
                }
                None
            }
            KeyCode::Char('p') => {
                let open = state.toggle_playlist_panel();
                if open {
                    state.focused = FocusedPane::Playlist;
                }
                None
            }
            KeyCode::Tab => {
                state.cycle_focus();
                None
            }
            KeyCode::Char('?') => {
                state.set_mode(InputMode::Help);
                None
            }
            KeyCode::Char(':') => {
                state.set_mode(InputMode::Command);
                None
            }
            KeyCode::Esc => {
                state.clear_message();
                state.focused = FocusedPane::Main;
                None
            }
            _ => None,
        }
    }

    /// Keys owned by the focused panel. `Some(..)` means consumed.
    fn handle_pane_key(&mut self, key: KeyEvent, playlist_len: usize) -> Option<Option<Action>> {
        let state = &mut self.state;
        match state.focused {
            FocusedPane::Main => None,
            FocusedPane::Equalizer => match key.code {
                KeyCode::Char('h') | KeyCode::Left => {
                    state.eq_band = state.eq_band.saturating_sub(1);
                    Some(None)
                }
                KeyCode::Char('l') | KeyCode::Right => {
                    state.eq_band = (state.eq_band + 1).min(EQ_BANDS - 1);
                    Some(None)
                }
                KeyCode::Char('k') | KeyCode::Up => Some(Some(Action::AdjustBand {
                    band: state.eq_band,
                    delta: EQ_GAIN_STEP_DB,
                })),
                KeyCode::Char('j') | KeyCode::Down => Some(Some(Action::AdjustBand {
                    band: state.eq_band,
                    delta: -EQ_GAIN_STEP_DB,
                })),
                _ => None,
            },
            FocusedPane::Playlist => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    state.playlist.select_next(playlist_len);
                    Some(None)
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    state.playlist.select_prev();
                    Some(None)
                }
                KeyCode::Char('g') => {
                    state.playlist.select_first();
                    Some(None)
                }
                KeyCode::Char('G') => {
                    state.playlist.select_last(playlist_len);
                    Some(None)
                }
                KeyCode::Enter if playlist_len > 0 => {
                    Some(Some(Action::PlayIndex(state.playlist.selected_index)))
                }
                KeyCode::Char('d') | KeyCode::Delete if playlist_len > 0 => {
                    Some(Some(Action::RemoveIndex(state.playlist.selected_index)))
                }
                KeyCode::Char('C') => Some(Some(Action::ClearPlaylist)),
                _ => None,
            },
        }
    }
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Action(Action),
    /// Handled by the UI itself
    Theme(String),
}

/// Parse a `:` command. Empty input yields `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };

    let need_arg = |usage: &str| {
        if arg.is_empty() {
            Err(format!("Usage: :{usage}"))
        } else {
            Ok(arg)
        }
    };

    let command = match name {
        "q" | "quit" => Command::Action(Action::Quit),
        "add" => Command::Action(Action::AddPath(need_arg("add <path>")?.into())),
        "save" | "w" => Command::Action(Action::SavePlaylist(need_arg("save <path>")?.into())),
        "open" | "e" => Command::Action(Action::OpenPlaylist(need_arg("open <path>")?.into())),
        "preset" => {
            let preset = need_arg("preset <name>")?;
            let preset =
                EqPreset::from_name(preset).ok_or_else(|| format!("Unknown preset: {preset}"))?;
            Command::Action(Action::LoadPreset(preset))
        }
        "mode" | "viz" => {
            let mode = need_arg("mode <name>")?;
            let mode = VisualizerMode::from_name(mode)
                .ok_or_else(|| format!("Unknown visualizer mode: {mode}"))?;
            Command::Action(Action::SetVisualizerMode(mode))
        }
        "theme" => Command::Theme(need_arg("theme <name>")?.to_string()),
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    fn type_command(app: &mut App, text: &str) -> Option<Action> {
        app.handle_key(ch(':'), 0);
        for c in text.chars() {
            app.handle_key(ch(c), 0);
        }
        app.handle_key(key(KeyCode::Enter), 0)
    }

    #[test]
    fn test_transport_keys() {
        let mut app = App::new();
        assert_eq!(app.handle_key(ch(' '), 0), Some(Action::TogglePlay));
        assert_eq!(app.handle_key(ch('5'), 0), Some(Action::SeekPercent(50.0)));
        assert_eq!(app.handle_key(key(KeyCode::Left), 0), Some(Action::Skip(-5.0)));
        assert_eq!(app.handle_key(ch('a'), 0), Some(Action::ToggleRetro));
    }

    #[test]
    fn test_ctrl_q_quits_from_any_mode() {
        let mut app = App::new();
        app.handle_key(ch('?'), 0);
        assert_eq!(app.state.mode, InputMode::Help);
        let quit = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(quit, 0), Some(Action::Quit));
    }

    #[test]
    fn test_eq_panel_opens_with_focus_and_resizes() {
        let mut app = App::new();
        assert_eq!(app.handle_key(ch('e'), 0), None);
        assert!(app.state.footprint.eq_open);
        assert_eq!(app.state.host.size, (825, 232));
        assert_eq!(app.state.focused, FocusedPane::Equalizer);

        app.handle_key(ch('l'), 0);
        app.handle_key(ch('l'), 0);
        assert_eq!(
            app.handle_key(ch('k'), 0),
            Some(Action::AdjustBand { band: 2, delta: 1.0 })
        );

        app.handle_key(ch('e'), 0);
        assert_eq!(app.state.focused, FocusedPane::Main);
        assert_eq!(app.state.host.size, (550, 232));
    }

    #[test]
    fn test_eq_cursor_is_bounded() {
        let mut app = App::new();
        app.handle_key(ch('e'), 0);
        for _ in 0..20 {
            app.handle_key(ch('l'), 0);
        }
        assert_eq!(app.state.eq_band, EQ_BANDS - 1);
    }

    #[test]
    fn test_playlist_keys() {
        let mut app = App::new();
        app.handle_key(ch('p'), 3);
        assert_eq!(app.state.focused, FocusedPane::Playlist);
        app.handle_key(ch('j'), 3);
        assert_eq!(app.handle_key(key(KeyCode::Enter), 3), Some(Action::PlayIndex(1)));
        assert_eq!(app.handle_key(ch('d'), 3), Some(Action::RemoveIndex(1)));
        // nothing to remove from an empty list
        assert_eq!(app.handle_key(ch('d'), 0), None);
    }

    #[test]
    fn test_focus_skips_closed_panels() {
        let mut app = App::new();
        app.state.cycle_focus();
        assert_eq!(app.state.focused, FocusedPane::Main);
        app.state.toggle_playlist_panel();
        app.state.cycle_focus();
        assert_eq!(app.state.focused, FocusedPane::Playlist);
        app.state.cycle_focus();
        assert_eq!(app.state.focused, FocusedPane::Main);
    }

    #[test]
    fn test_command_line() {
        let mut app = App::new();
        assert_eq!(
            type_command(&mut app, "add /music/a.mp3"),
            Some(Action::AddPath(PathBuf::from("/music/a.mp3")))
        );
        assert_eq!(app.state.mode, InputMode::Normal);
        assert_eq!(
            type_command(&mut app, "preset jazz"),
            Some(Action::LoadPreset(EqPreset::Jazz))
        );
        assert_eq!(type_command(&mut app, "theme amber"), None);
        assert_eq!(app.state.theme.name, "amber");
    }

    #[test]
    fn test_bad_command_sets_error() {
        let mut app = App::new();
        assert_eq!(type_command(&mut app, "frobnicate"), None);
        assert_eq!(app.state.message_type, MessageType::Error);
        assert_eq!(type_command(&mut app, "mode plasma"), None);
        assert!(app.state.message.as_deref().unwrap_or("").contains("plasma"));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  "), Ok(None));
        assert_eq!(
            parse_command("mode helix"),
            Ok(Some(Command::Action(Action::SetVisualizerMode(VisualizerMode::Helix))))
        );
        assert!(parse_command("save").is_err());
        assert_eq!(parse_command("q"), Ok(Some(Command::Action(Action::Quit))));
    }

    #[test]
    fn test_backspace_on_empty_leaves_command_mode() {
        let mut app = App::new();
        app.handle_key(ch(':'), 0);
        app.handle_key(key(KeyCode::Backspace), 0);
        assert_eq!(app.state.mode, InputMode::Normal);
    }

    #[test]
    fn test_ctrl_w_minimizes() {
        let mut app = App::new();
        let ctrl_w = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL);
        app.handle_key(ctrl_w, 0);
        assert!(app.state.host.minimized);
    }
}
