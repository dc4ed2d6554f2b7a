//! Visualizer panel: the pixel canvas drawn with half-block cells

use crate::theme::Theme;
use crate::visualizer::{PixelCanvas, Rgb, VisualizerMode};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    text::Span,
    widgets::{Block, Borders, Widget},
};

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub struct VisualizerWidget<'a> {
    canvas: &'a PixelCanvas,
    mode: VisualizerMode,
    beat: bool,
    running: bool,
    theme: &'a Theme,
}

impl<'a> VisualizerWidget<'a> {
    pub fn new(canvas: &'a PixelCanvas, mode: VisualizerMode, theme: &'a Theme) -> Self {
        Self {
            canvas,
            mode,
            beat: false,
            running: false,
            theme,
        }
    }

    /// Light the beat lamp
    pub fn beat(mut self, beat: bool) -> Self {
        self.beat = beat;
        self
    }

    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }
}

impl Widget for VisualizerWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lamp = if self.beat {
            Span::styled(" ● ", self.theme.retro_tag())
        } else {
            Span::styled(" ○ ", self.theme.dim())
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(
                format!(" VIZ: {} ", self.mode.label()),
                self.theme.title(),
            ))
            .title_bottom(lamp);

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        // Each cell covers two canvas rows: upper half as fg, lower as bg
        let cols = inner.width as usize;
        let rows = inner.height as usize * 2;
        let (cw, ch) = (self.canvas.width(), self.canvas.height());

        for cy in 0..inner.height as usize {
            for cx in 0..cols {
                let px = cx * cw / cols;
                let top = self.canvas.get(px, (cy * 2) * ch / rows);
                let bottom = self.canvas.get(px, (cy * 2 + 1) * ch / rows);
                let (Some(top), Some(bottom)) = (top, bottom) else {
                    continue;
                };
                let mut top = color(top);
                let mut bottom = color(bottom);
                if !self.running {
                    top = self.theme.bg;
                    bottom = self.theme.bg;
                }
                buf[(inner.x + cx as u16, inner.y + cy as u16)]
                    .set_char('▀')
                    .set_fg(top)
                    .set_bg(bottom);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::BACKGROUND;

    #[test]
    fn test_half_blocks_sample_canvas() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.fill_rect(0.0, 0.0, 4.0, 1.0, Rgb(255, 0, 0));
        let theme = Theme::default();
        let area = Rect::new(0, 0, 6, 4);
        let mut buf = Buffer::empty(area);
        VisualizerWidget::new(&canvas, VisualizerMode::Cascade, &theme)
            .running(true)
            .render(area, &mut buf);

        let cell = &buf[(1, 1)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, color(BACKGROUND));
        assert_eq!(buf[(1, 2)].fg, color(BACKGROUND));
    }

    #[test]
    fn test_idle_panel_is_blank() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.clear(Rgb(200, 200, 200));
        let theme = Theme::default();
        let area = Rect::new(0, 0, 6, 4);
        let mut buf = Buffer::empty(area);
        VisualizerWidget::new(&canvas, VisualizerMode::Helix, &theme).render(area, &mut buf);
        assert_eq!(buf[(1, 1)].fg, theme.bg);
    }
}
