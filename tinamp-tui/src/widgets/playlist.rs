//! Playlist panel: track rows, current-track marker and total time

use crate::theme::Theme;
use crate::widgets::format_time;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
        Widget,
    },
};
use tinamp_library::FileInfo;

/// Cursor and scroll position of the playlist panel
#[derive(Debug, Clone, Default)]
pub struct PlaylistState {
    pub selected_index: usize,
    pub scroll_offset: usize,
}

impl PlaylistState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_next(&mut self, count: usize) {
        if count > 0 && self.selected_index < count - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self, count: usize) {
        self.selected_index = count.saturating_sub(1);
    }

    /// Keep the cursor inside a list that may have shrunk
    pub fn clamp(&mut self, count: usize) {
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
        if self.scroll_offset > self.selected_index {
            self.scroll_offset = self.selected_index;
        }
    }

    fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        }
    }
}

pub struct PlaylistWidget<'a> {
    tracks: &'a [FileInfo],
    state: &'a mut PlaylistState,
    theme: &'a Theme,
    current: Option<usize>,
    total_secs: f64,
    is_focused: bool,
}

impl<'a> PlaylistWidget<'a> {
    pub fn new(tracks: &'a [FileInfo], state: &'a mut PlaylistState, theme: &'a Theme) -> Self {
        Self {
            tracks,
            state,
            theme,
            current: None,
            total_secs: 0.0,
            is_focused: false,
        }
    }

    /// Index of the loaded track, marked in the list
    pub fn current(mut self, index: Option<usize>) -> Self {
        self.current = index;
        self
    }

    pub fn total_duration(mut self, secs: f64) -> Self {
        self.total_secs = secs;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.is_focused = focused;
        self
    }
}

impl Widget for PlaylistWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            " PLAYLIST [{}] {} ",
            self.tracks.len(),
            format_time(self.total_secs)
        );
        let border_style = if self.is_focused {
            self.theme.border_active()
        } else {
            self.theme.border()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height < 1 || inner.width < 16 {
            return;
        }

        if self.tracks.is_empty() {
            let hint = Line::from(Span::styled(
                "Empty. Pass files on the command line or :add <path>",
                self.theme.dim(),
            ));
            Paragraph::new(hint).render(inner, buf);
            return;
        }

        let list_width = inner.width.saturating_sub(1);
        let list_height = inner.height as usize;
        self.state.clamp(self.tracks.len());
        self.state.update_scroll(list_height);
        let scroll_offset = self.state.scroll_offset;

        for (i, track) in self
            .tracks
            .iter()
            .enumerate()
            .skip(scroll_offset)
            .take(list_height)
        {
            let y = inner.y + (i - scroll_offset) as u16;
            let is_selected = i == self.state.selected_index;
            let is_current = self.current == Some(i);

            // "NNN. " + name + " MM:SS"
            let number = format!("{:>3}. ", i + 1);
            let time = format!(" {}", format_time(track.duration_secs));
            let name_width = (list_width as usize).saturating_sub(number.len() + time.len());
            let name: String = track.display_name().chars().take(name_width).collect();
            let padding = " ".repeat(name_width.saturating_sub(name.chars().count()));

            let base_style = if is_selected {
                self.theme.highlight()
            } else if is_current {
                self.theme.lcd().bg(self.theme.bg).add_modifier(Modifier::BOLD)
            } else {
                self.theme.normal()
            };

            let line = Line::from(vec![
                Span::styled(number, base_style),
                Span::styled(name, base_style),
                Span::styled(padding, base_style),
                Span::styled(time, base_style),
            ]);
            Paragraph::new(line).render(Rect::new(inner.x, y, list_width, 1), buf);
        }

        if self.tracks.len() > list_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
            let mut scrollbar_state = ScrollbarState::new(self.tracks.len()).position(scroll_offset);
            let scrollbar_area = Rect::new(inner.x + inner.width - 1, inner.y, 1, inner.height);
            StatefulWidget::render(scrollbar, scrollbar_area, buf, &mut scrollbar_state);
        }
    }
}
