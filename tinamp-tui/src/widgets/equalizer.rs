//! Equalizer panel: ten vertical gain sliders

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use tinamp_audio::{EQ_BANDS, EQ_FREQUENCIES};

/// Slider range in dB
const GAIN_RANGE_DB: f32 = 20.0;
const COLUMN_WIDTH: u16 = 4;

fn frequency_label(hz: f32) -> String {
    if hz >= 1000.0 {
        format!("{}K", (hz / 1000.0).round() as u32)
    } else {
        format!("{}", hz as u32)
    }
}

pub struct EqualizerWidget<'a> {
    gains: [f32; EQ_BANDS],
    preset: &'a str,
    enabled: bool,
    selected: usize,
    theme: &'a Theme,
    is_focused: bool,
}

impl<'a> EqualizerWidget<'a> {
    pub fn new(gains: [f32; EQ_BANDS], theme: &'a Theme) -> Self {
        Self {
            gains,
            preset: "Flat",
            enabled: true,
            selected: 0,
            theme,
            is_focused: false,
        }
    }

    pub fn preset(mut self, name: &'a str) -> Self {
        self.preset = name;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn selected(mut self, band: usize) -> Self {
        self.selected = band.min(EQ_BANDS - 1);
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.is_focused = focused;
        self
    }

    /// Row of the slider knob, 0 at the top (+20 dB)
    fn knob_row(gain_db: f32, rows: u16) -> u16 {
        if rows <= 1 {
            return 0;
        }
        let t = (GAIN_RANGE_DB - gain_db.clamp(-GAIN_RANGE_DB, GAIN_RANGE_DB)) / (2.0 * GAIN_RANGE_DB);
        (t * (rows - 1) as f32).round() as u16
    }
}

impl Widget for EqualizerWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = if self.enabled { "ON" } else { "OFF" };
        let border_style = if self.is_focused {
            self.theme.border_active()
        } else {
            self.theme.border()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(
                format!(" EQUALIZER [{}] {} ", self.preset, state),
                self.theme.title(),
            ));

        let inner = block.inner(area);
        block.render(area, buf);

        // value row + slider + label row
        if inner.height < 5 || inner.width < COLUMN_WIDTH * EQ_BANDS as u16 {
            return;
        }

        let slider_rows = inner.height - 2;
        let zero_row = Self::knob_row(0.0, slider_rows);
        let label_y = inner.y + inner.height - 1;

        for (band, (&gain, &hz)) in self.gains.iter().zip(EQ_FREQUENCIES.iter()).enumerate() {
            let x = inner.x + band as u16 * COLUMN_WIDTH;
            let is_selected = self.is_focused && band == self.selected;
            let knob = Self::knob_row(gain, slider_rows);

            let value_style = if is_selected {
                self.theme.highlight()
            } else {
                self.theme.gain_style(gain)
            };
            Paragraph::new(Line::from(Span::styled(format!("{:>+3.0}", gain), value_style)))
                .render(Rect::new(x, inner.y, COLUMN_WIDTH, 1), buf);

            let fill_style = if self.enabled {
                self.theme.gain_style(gain)
            } else {
                Style::default().fg(self.theme.fg_dim)
            };
            for row in 0..slider_rows {
                let y = inner.y + 1 + row;
                let between = (row >= knob.min(zero_row)) && (row <= knob.max(zero_row));
                let (ch, style) = if row == knob {
                    ('█', if is_selected { self.theme.highlight() } else { fill_style })
                } else if between {
                    ('┃', fill_style)
                } else if row == zero_row {
                    ('┼', self.theme.border())
                } else {
                    ('│', self.theme.border())
                };
                buf[(x + 1, y)].set_char(ch).set_style(style);
            }

            let label_style = if is_selected {
                self.theme.highlight()
            } else {
                self.theme.dim()
            };
            Paragraph::new(Line::from(Span::styled(frequency_label(hz), label_style)))
                .render(Rect::new(x, label_y, COLUMN_WIDTH, 1), buf);
        }
    }
}
