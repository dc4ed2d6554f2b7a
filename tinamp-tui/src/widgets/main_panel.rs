//! Main player panel: LCD readout, transport flags and the mini spectrum

use crate::theme::Theme;
use crate::widgets::format_time;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use tinamp_analysis::{BandMeter, BAND_COUNT};
use tinamp_audio::AM_RADIO_SUFFIX;

/// Characters for vertical bar rendering (8 levels)
const BAR_CHARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Transport indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    fn symbol(self) -> &'static str {
        match self {
            TransportState::Stopped => "■",
            TransportState::Playing => "▶",
            TransportState::Paused => "❚❚",
        }
    }
}

pub struct MainPanelWidget<'a> {
    theme: &'a Theme,
    title: &'a str,
    artist: &'a str,
    position_secs: f64,
    duration_secs: f64,
    volume: f32,
    transport: TransportState,
    shuffle: bool,
    repeat: bool,
    eq_enabled: bool,
    meter: Option<&'a BandMeter>,
}

impl<'a> MainPanelWidget<'a> {
    pub fn new(title: &'a str, theme: &'a Theme) -> Self {
        Self {
            theme,
            title,
            artist: "",
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: 0.5,
            transport: TransportState::Stopped,
            shuffle: false,
            repeat: false,
            eq_enabled: true,
            meter: None,
        }
    }

    pub fn artist(mut self, artist: &'a str) -> Self {
        self.artist = artist;
        self
    }

    pub fn time(mut self, position_secs: f64, duration_secs: f64) -> Self {
        self.position_secs = position_secs;
        self.duration_secs = duration_secs;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn transport(mut self, transport: TransportState) -> Self {
        self.transport = transport;
        self
    }

    pub fn flags(mut self, shuffle: bool, repeat: bool, eq_enabled: bool) -> Self {
        self.shuffle = shuffle;
        self.repeat = repeat;
        self.eq_enabled = eq_enabled;
        self
    }

    pub fn meter(mut self, meter: &'a BandMeter) -> Self {
        self.meter = Some(meter);
        self
    }

    /// Title line with the retro tag styled separately
    fn title_line(&self) -> Line<'a> {
        match self.title.strip_suffix(AM_RADIO_SUFFIX) {
            Some(base) => Line::from(vec![
                Span::styled(base, self.theme.lcd()),
                Span::styled(AM_RADIO_SUFFIX, self.theme.retro_tag()),
            ]),
            None => Line::from(Span::styled(self.title, self.theme.lcd())),
        }
    }

    fn progress_line(&self, width: u16) -> Line<'static> {
        let width = width as usize;
        let fraction = if self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let filled = (fraction * width as f64).round() as usize;
        Line::from(vec![
            Span::styled("━".repeat(filled), self.theme.lcd()),
            Span::styled("─".repeat(width.saturating_sub(filled)), self.theme.dim()),
        ])
    }

    fn render_meter(&self, meter: &BandMeter, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width < BAND_COUNT as u16 {
            return;
        }
        let bar_width = (area.width / BAND_COUNT as u16).max(1);
        let height = area.height as usize;

        for band in 0..BAND_COUNT {
            let percent = meter.height(band) / 100.0;
            let peak = meter.peak(band) / 100.0;
            let levels = (percent.clamp(0.0, 1.0) * 8.0 * height as f32) as usize;
            let peak_row = ((peak.clamp(0.0, 1.0) * height as f32) as usize).min(height - 1);
            let x0 = area.x + band as u16 * bar_width;

            for row in 0..height {
                let y = area.y + area.height - 1 - row as u16;
                let ch = if row < levels / 8 {
                    '█'
                } else if row == levels / 8 {
                    BAR_CHARS[levels % 8]
                } else if row == peak_row && peak > percent {
                    '▔'
                } else {
                    ' '
                };
                let style = self.theme.meter_style(row as f32 / height as f32);
                for dx in 0..bar_width.saturating_sub(1).max(1) {
                    let x = x0 + dx;
                    if x < area.x + area.width && ch != ' ' {
                        buf[(x, y)].set_char(ch).set_style(style);
                    }
                }
            }
        }
    }
}

impl Widget for MainPanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(" TINAMP ", self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 4 || inner.width < 20 {
            return;
        }

        let [title_area, artist_area, time_area, progress_area, flags_area, meter_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .areas(inner);

        Paragraph::new(self.title_line()).render(title_area, buf);
        Paragraph::new(Line::from(Span::styled(self.artist, self.theme.normal())))
            .render(artist_area, buf);

        let volume_pct = (self.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        let time = Line::from(vec![
            Span::styled(format!("{} ", self.transport.symbol()), self.theme.lcd()),
            Span::styled(
                format!(
                    "{}/{}",
                    format_time(self.position_secs),
                    format_time(self.duration_secs)
                ),
                self.theme.lcd(),
            ),
            Span::styled(format!("  VOL {volume_pct:>3}%"), self.theme.normal()),
        ]);
        Paragraph::new(time).render(time_area, buf);

        Paragraph::new(self.progress_line(progress_area.width)).render(progress_area, buf);

        let flags = Line::from(vec![
            Span::styled(" SHUF ", self.theme.toggle(self.shuffle)),
            Span::raw(" "),
            Span::styled(" REP ", self.theme.toggle(self.repeat)),
            Span::raw(" "),
            Span::styled(" EQ ", self.theme.toggle(self.eq_enabled)),
            Span::raw(" "),
            Span::styled(
                " AM ",
                self.theme.toggle(self.title.ends_with(AM_RADIO_SUFFIX)),
            ),
        ]);
        Paragraph::new(flags).render(flags_area, buf);

        if let Some(meter) = self.meter {
            self.render_meter(meter, meter_area, buf);
        }
    }
}
