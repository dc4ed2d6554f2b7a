//! Terminal UI for Tinamp - visualizer engine, widgets, themes and layout
//!
//! Provides the retro player screen: main LCD panel, equalizer and
//! playlist panels, and the advanced visualizer drawn on a pixel canvas.

mod app;
pub mod layout;
mod theme;
mod ui;
pub mod visualizer;
pub mod widgets;

pub use app::{parse_command, Action, App, AppState, Command, FocusedPane, InputMode, MessageType};
pub use layout::{HostWindow, TerminalHost, WindowFootprint};
pub use theme::{Theme, AMBER, CLASSIC};
pub use ui::{draw, PlayerView};
pub use visualizer::{IntervalScheduler, VisualizerEngine, VisualizerMode};
