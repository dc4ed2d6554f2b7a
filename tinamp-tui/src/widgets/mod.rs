//! UI widgets for Tinamp

mod equalizer;
mod main_panel;
mod playlist;
pub mod status_bar;
mod visualizer;

pub use equalizer::EqualizerWidget;
pub use main_panel::{MainPanelWidget, TransportState};
pub use playlist::{PlaylistState, PlaylistWidget};
pub use status_bar::{HelpWidget, StatusBarWidget};
pub use visualizer::VisualizerWidget;

/// `MM:SS`, or `00:00` when the time is unknown
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(f64::INFINITY), "00:00");
    }
}
