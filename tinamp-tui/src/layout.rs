//! Window footprint and screen layout
//!
//! The player window grows to the right when the equalizer opens and
//! downward when the playlist opens. A host window receives the pixel
//! footprint; the terminal host just records it and the screen layout
//! follows the same panel flags.

use ratatui::layout::{Constraint, Layout, Rect};
use tracing::debug;

pub const BASE_WIDTH: u32 = 550;
pub const BASE_HEIGHT: u32 = 232;
pub const EQ_EXTRA_WIDTH: u32 = 275;
pub const PLAYLIST_EXTRA_HEIGHT: u32 = 410;

/// The window that hosts the player
pub trait HostWindow {
    fn resize_to(&mut self, width: u32, height: u32);
    fn minimize(&mut self);
    fn close(&mut self);
}

/// Which side panels are open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowFootprint {
    pub eq_open: bool,
    pub playlist_open: bool,
}

impl WindowFootprint {
    pub fn size(self) -> (u32, u32) {
        let width = BASE_WIDTH + if self.eq_open { EQ_EXTRA_WIDTH } else { 0 };
        let height = BASE_HEIGHT
            + if self.playlist_open {
                PLAYLIST_EXTRA_HEIGHT
            } else {
                0
            };
        (width, height)
    }

    pub fn apply(self, host: &mut dyn HostWindow) {
        let (width, height) = self.size();
        host.resize_to(width, height);
    }

    /// Flip the equalizer panel and resize the host
    pub fn toggle_eq(&mut self, host: &mut dyn HostWindow) -> bool {
        self.eq_open = !self.eq_open;
        self.apply(host);
        self.eq_open
    }

    pub fn toggle_playlist(&mut self, host: &mut dyn HostWindow) -> bool {
        self.playlist_open = !self.playlist_open;
        self.apply(host);
        self.playlist_open
    }
}

/// Host backed by the terminal: remembers the requested footprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalHost {
    pub size: (u32, u32),
    pub minimized: bool,
    pub close_requested: bool,
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self {
            size: WindowFootprint::default().size(),
            minimized: false,
            close_requested: false,
        }
    }
}

impl HostWindow for TerminalHost {
    fn resize_to(&mut self, width: u32, height: u32) {
        debug!(width, height, "window footprint changed");
        self.size = (width, height);
    }

    /// Collapses the screen to the main panel until toggled back
    fn minimize(&mut self) {
        self.minimized = !self.minimized;
    }

    fn close(&mut self) {
        self.close_requested = true;
    }
}

/// Screen areas for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenAreas {
    pub title: Rect,
    pub main: Rect,
    pub visualizer: Option<Rect>,
    pub equalizer: Option<Rect>,
    pub playlist: Option<Rect>,
    pub status: Rect,
}

impl ScreenAreas {
    /// Split `area` following the open panels
    pub fn compute(area: Rect, footprint: WindowFootprint, visualizer: bool, minimized: bool) -> Self {
        let [title, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .areas(area);

        if minimized {
            return Self {
                title,
                main: body,
                visualizer: None,
                equalizer: None,
                playlist: None,
                status,
            };
        }

        let (top, playlist) = if footprint.playlist_open {
            let [top, bottom] =
                Layout::vertical([Constraint::Length(12), Constraint::Min(4)]).areas(body);
            (top, Some(bottom))
        } else {
            (body, None)
        };

        let mut columns = vec![Constraint::Min(34)];
        if footprint.eq_open {
            columns.push(Constraint::Length(46));
        }
        if visualizer {
            columns.push(Constraint::Length(36));
        }
        let chunks = Layout::horizontal(columns).split(top);

        let mut rest = chunks.iter().skip(1).copied();
        let equalizer = if footprint.eq_open { rest.next() } else { None };
        let visualizer = if visualizer { rest.next() } else { None };

        Self {
            title,
            main: chunks[0],
            visualizer,
            equalizer,
            playlist,
            status,
        }
    }
}

/// Create a centered rectangle
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_sizes() {
        let mut footprint = WindowFootprint::default();
        assert_eq!(footprint.size(), (550, 232));
        footprint.eq_open = true;
        assert_eq!(footprint.size(), (825, 232));
        footprint.playlist_open = true;
        assert_eq!(footprint.size(), (825, 642));
        footprint.eq_open = false;
        assert_eq!(footprint.size(), (550, 642));
    }

    #[test]
    fn test_toggles_resize_host() {
        let mut host = TerminalHost::default();
        let mut footprint = WindowFootprint::default();
        assert!(footprint.toggle_eq(&mut host));
        assert_eq!(host.size, (825, 232));
        assert!(footprint.toggle_playlist(&mut host));
        assert_eq!(host.size, (825, 642));
        assert!(!footprint.toggle_eq(&mut host));
        assert_eq!(host.size, (550, 642));
    }

    #[test]
    fn test_host_close_and_minimize() {
        let mut host = TerminalHost::default();
        host.minimize();
        assert!(host.minimized);
        host.minimize();
        assert!(!host.minimized);
        host.close();
        assert!(host.close_requested);
    }

    #[test]
    fn test_areas_follow_panels() {
        let area = Rect::new(0, 0, 140, 40);
        let plain = ScreenAreas::compute(area, WindowFootprint::default(), false, false);
        assert!(plain.equalizer.is_none() && plain.playlist.is_none() && plain.visualizer.is_none());
        assert_eq!(plain.main.width, 140);

        let full = WindowFootprint {
            eq_open: true,
            playlist_open: true,
        };
        let areas = ScreenAreas::compute(area, full, true, false);
        assert_eq!(areas.equalizer.map(|r| r.width), Some(46));
        assert_eq!(areas.visualizer.map(|r| r.width), Some(36));
        assert!(areas.playlist.is_some());
        assert_eq!(areas.status.y, 39);
    }

    #[test]
    fn test_centered_rect_clamps() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect(80, 40, area), area);
    }

    #[test]
    fn test_minimized_shows_main_only() {
        let full = WindowFootprint {
            eq_open: true,
            playlist_open: true,
        };
        let areas = ScreenAreas::compute(Rect::new(0, 0, 100, 30), full, true, true);
        assert!(areas.equalizer.is_none() && areas.visualizer.is_none());
        assert_eq!(areas.main.height, 28);
    }
}
