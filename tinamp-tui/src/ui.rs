//! Frame composition

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use tinamp_audio::{EngineStatus, Player, Stage, EQ_BANDS};
use tinamp_library::{Decode, FileInfo};

use crate::app::{App, FocusedPane, InputMode, MessageType};
use crate::layout::{centered_rect, ScreenAreas};
use crate::theme::Theme;
use crate::visualizer::{FrameScheduler, VisualizerEngine};
use crate::widgets::{
    EqualizerWidget, HelpWidget, MainPanelWidget, PlaylistWidget, StatusBarWidget,
    TransportState, VisualizerWidget,
};

/// Snapshot of the player taken once per frame
#[derive(Debug, Clone)]
pub struct PlayerView<'a> {
    pub title: String,
    pub artist: &'a str,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
    pub transport: TransportState,
    pub shuffle: bool,
    pub repeat: bool,
    pub eq_gains: [f32; EQ_BANDS],
    pub eq_preset: &'static str,
    pub eq_enabled: bool,
    pub playlist: &'a [FileInfo],
    pub current_index: Option<usize>,
    pub total_secs: f64,
    /// Active stages in signal order
    pub chain: String,
    pub unavailable: Option<&'a str>,
}

impl<'a> PlayerView<'a> {
    pub fn from_player<D: Decode>(player: &'a Player<D>) -> Self {
        let state = player.state();
        let transport = if state.is_playing {
            TransportState::Playing
        } else if state.is_paused {
            TransportState::Paused
        } else {
            TransportState::Stopped
        };
        let chain: Vec<&str> = player.router().layout().iter().map(|k| k.name()).collect();
        let chain = if chain.is_empty() {
            "direct".to_string()
        } else {
            chain.join(" > ")
        };
        let unavailable = match player.status() {
            EngineStatus::Unavailable(reason) => Some(reason.as_str()),
            _ => None,
        };

        Self {
            title: player.display_title(),
            artist: player.display_artist(),
            position_secs: state.position_secs,
            duration_secs: state.duration_secs,
            volume: state.volume,
            transport,
            shuffle: state.shuffle,
            repeat: state.repeat,
            eq_gains: player.equalizer().gains(),
            eq_preset: player.equalizer().preset_label().name(),
            eq_enabled: player.equalizer().is_enabled(),
            playlist: &state.playlist,
            current_index: state.current_track.as_ref().map(|_| state.current_index),
            total_secs: player.total_duration_secs(),
            chain,
            unavailable,
        }
    }
}

fn render_title(frame: &mut Frame, area: Rect, theme: &Theme) {
    let title_text = " TINAMP ";
    let padding = (area.width as usize).saturating_sub(title_text.len()) / 2;
    let rest = (area.width as usize).saturating_sub(padding + title_text.len());
    let padded = format!(
        "{:═<pad$}{}{:═<rest$}",
        "",
        title_text,
        "",
        pad = padding,
        rest = rest
    );
    frame.render_widget(Paragraph::new(Line::from(Span::styled(padded, theme.title()))), area);
}

/// Draw one frame
pub fn draw<S: FrameScheduler>(
    frame: &mut Frame,
    app: &mut App,
    view: &PlayerView,
    visualizer: &VisualizerEngine<S>,
    beat: bool,
) {
    let state = &mut app.state;
    let theme = state.theme.clone();
    let areas = ScreenAreas::compute(
        frame.area(),
        state.footprint,
        visualizer.panel_visible(),
        state.host.minimized,
    );

    render_title(frame, areas.title, &theme);

    frame.render_widget(
        MainPanelWidget::new(&view.title, &theme)
            .artist(view.artist)
            .time(view.position_secs, view.duration_secs)
            .volume(view.volume)
            .transport(view.transport)
            .flags(view.shuffle, view.repeat, view.eq_enabled)
            .meter(&state.meter),
        areas.main,
    );

    if let Some(area) = areas.equalizer {
        frame.render_widget(
            EqualizerWidget::new(view.eq_gains, &theme)
                .preset(view.eq_preset)
                .enabled(view.eq_enabled)
                .selected(state.eq_band)
                .focused(state.focused == FocusedPane::Equalizer),
            area,
        );
    }

    if let Some(area) = areas.visualizer {
        frame.render_widget(
            VisualizerWidget::new(visualizer.canvas(), visualizer.mode(), &theme)
                .running(visualizer.is_running())
                .beat(beat),
            area,
        );
    }

    if let Some(area) = areas.playlist {
        frame.render_widget(
            PlaylistWidget::new(view.playlist, &mut state.playlist, &theme)
                .current(view.current_index)
                .total_duration(view.total_secs)
                .focused(state.focused == FocusedPane::Playlist),
            area,
        );
    }

    let (message, message_type) = match (&state.message, view.unavailable) {
        (Some(msg), _) => (Some(msg.as_str()), state.message_type),
        (None, Some(reason)) => (Some(reason), MessageType::Error),
        (None, None) => (None, MessageType::Info),
    };
    frame.render_widget(
        StatusBarWidget::new(state.mode, &state.command_buffer, &theme)
            .chain(&view.chain)
            .message(message, message_type),
        areas.status,
    );

    if state.mode == InputMode::Help {
        let area = centered_rect(54, frame.area().height.saturating_sub(2), frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(HelpWidget::new(&theme).scroll(state.help_scroll), area);
    }

    state.frame_count = state.frame_count.wrapping_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::FrameToken;
    use ratatui::{backend::TestBackend, Terminal};

    struct NoFrames;

    impl FrameScheduler for NoFrames {
        fn request_frame(&mut self) -> FrameToken {
            unreachable!("idle visualizer never schedules")
        }

        fn cancel_frame(&mut self, _token: FrameToken) {}
    }

    fn make_view(tracks: &[FileInfo]) -> PlayerView<'_> {
        PlayerView {
            title: "Song [AM RADIO]".to_string(),
            artist: "Band",
            position_secs: 30.0,
            duration_secs: 90.0,
            volume: 0.5,
            transport: TransportState::Playing,
            shuffle: false,
            repeat: true,
            eq_gains: [0.0; EQ_BANDS],
            eq_preset: "Flat",
            eq_enabled: true,
            playlist: tracks,
            current_index: Some(0),
            total_secs: 90.0,
            chain: "equalizer > retro".to_string(),
            unavailable: None,
        }
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                text.push_str(buf[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_draws_all_panels() {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        let mut app = App::new();
        app.state.toggle_eq_panel();
        app.state.toggle_playlist_panel();
        let tracks = vec![FileInfo::fallback(std::path::Path::new("/m/Song.mp3"))];
        let view = make_view(&tracks);
        let viz = VisualizerEngine::new(NoFrames);

        terminal
            .draw(|f| draw(f, &mut app, &view, &viz, false))
            .unwrap();
        let text = screen(&terminal);
        assert!(text.contains("TINAMP"));
        assert!(text.contains("Song [AM RADIO]"));
        assert!(text.contains("00:30/01:30"));
        assert!(text.contains("EQUALIZER [Flat] ON"));
        assert!(text.contains("VIZ: Spectrum Cascade"));
        assert!(text.contains("PLAYLIST [1]"));
        assert!(text.contains("chain: equalizer > retro"));
        assert_eq!(app.state.frame_count, 1);
    }

    #[test]
    fn test_unavailable_reason_in_status() {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        let mut app = App::new();
        let mut view = make_view(&[]);
        view.unavailable = Some("no output device");
        let viz = VisualizerEngine::new(NoFrames);
        terminal
            .draw(|f| draw(f, &mut app, &view, &viz, false))
            .unwrap();
        assert!(screen(&terminal).contains("no output device"));
    }

    #[test]
    fn test_help_overlay() {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        let mut app = App::new();
        app.state.set_mode(InputMode::Help);
        let view = make_view(&[]);
        let viz = VisualizerEngine::new(NoFrames);
        terminal
            .draw(|f| draw(f, &mut app, &view, &viz, false))
            .unwrap();
        assert!(screen(&terminal).contains("retro media player"));
    }
}
