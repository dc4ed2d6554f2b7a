//! Advanced visualizer: pixel canvas, render modes and the frame engine

mod canvas;
mod engine;
mod modes;

pub use canvas::{PixelCanvas, Rgb, BACKGROUND, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use engine::{
    FrameScheduler, FrameToken, IntervalScheduler, VisualizerEngine, VisualizerState, BEAT_FLASH_MS,
};
pub use modes::VisualizerMode;
