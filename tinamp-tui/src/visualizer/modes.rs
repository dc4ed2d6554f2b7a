//! The six render modes
//!
//! Every mode is a pure function of the byte frequency / time-domain
//! buffers (plus wall time for the helix). Buffers of any length are
//! remapped onto the canvas by nearest-bin sampling.

use std::f32::consts::PI;

use super::canvas::{PixelCanvas, Rgb};

const GREEN: Rgb = Rgb::hex(0x00ff41);
const TEAL: Rgb = Rgb::hex(0x4fd1c7);
const DARK_GREEN: Rgb = Rgb::hex(0x00cc33);
const YELLOW: Rgb = Rgb::hex(0xffff00);
const RED: Rgb = Rgb::hex(0xff4444);
const ORANGE: Rgb = Rgb::hex(0xff8c00);

const CASCADE_BAR_WIDTH: usize = 4;
const WATERFALL_ROWS: f32 = 20.0;
const METER_COLUMNS: usize = 10;
const METER_SEGMENTS: usize = 20;
const SCOPE_TRACES: usize = 8;
const CIRCLE_CENTER_Y: f32 = 140.0;

/// Selectable visualization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualizerMode {
    #[default]
    Cascade,
    Waterfall,
    Meters,
    Circle,
    Oscilloscope,
    Helix,
}

impl VisualizerMode {
    pub const ALL: [VisualizerMode; 6] = [
        VisualizerMode::Cascade,
        VisualizerMode::Waterfall,
        VisualizerMode::Meters,
        VisualizerMode::Circle,
        VisualizerMode::Oscilloscope,
        VisualizerMode::Helix,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VisualizerMode::Cascade => "cascade",
            VisualizerMode::Waterfall => "waterfall",
            VisualizerMode::Meters => "meters",
            VisualizerMode::Circle => "circle",
            VisualizerMode::Oscilloscope => "oscilloscope",
            VisualizerMode::Helix => "helix",
        }
    }

    /// Human-readable label for the panel title
    pub fn label(self) -> &'static str {
        match self {
            VisualizerMode::Cascade => "Spectrum Cascade",
            VisualizerMode::Waterfall => "Waveform Waterfall",
            VisualizerMode::Meters => "VU Meters",
            VisualizerMode::Circle => "Circular Spectrum",
            VisualizerMode::Oscilloscope => "Oscilloscope Tower",
            VisualizerMode::Helix => "DNA Helix",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// The waterfall keeps its history, every other mode starts blank
    pub fn clears_background(self) -> bool {
        self != VisualizerMode::Waterfall
    }

    pub fn render(self, canvas: &mut PixelCanvas, frequency: &[u8], time_domain: &[u8], time_secs: f64) {
        match self {
            VisualizerMode::Cascade => render_cascade(canvas, frequency),
            VisualizerMode::Waterfall => render_waterfall(canvas, time_domain),
            VisualizerMode::Meters => render_meters(canvas, frequency),
            VisualizerMode::Circle => render_circle(canvas, frequency),
            VisualizerMode::Oscilloscope => render_oscilloscope(canvas, time_domain),
            VisualizerMode::Helix => render_helix(canvas, frequency, time_secs),
        }
    }
}

/// Nearest bin for position `i` of `count` over a buffer of `len`
fn remap(i: usize, count: usize, len: usize) -> usize {
    ((i * len) / count.max(1)).min(len.saturating_sub(1))
}

fn level(byte: u8) -> f32 {
    byte as f32 / 255.0
}

pub fn render_cascade(canvas: &mut PixelCanvas, frequency: &[u8]) {
    if frequency.is_empty() {
        return;
    }
    let height = canvas.height() as f32;
    let bars = canvas.width() / CASCADE_BAR_WIDTH;

    for i in 0..bars {
        let value = frequency[remap(i, bars, frequency.len())];
        let bar_height = level(value) * height * 0.8;
        if bar_height < 1.0 {
            continue;
        }
        let x = (i * CASCADE_BAR_WIDTH) as f32;
        let y = height - bar_height;
        canvas.fill_gradient(
            x,
            y,
            (CASCADE_BAR_WIDTH - 1) as f32,
            bar_height,
            &[GREEN, TEAL, DARK_GREEN],
        );
        // glow cap
        canvas.fill_rect(x, y, (CASCADE_BAR_WIDTH - 1) as f32, bar_height.min(2.0), GREEN);
    }
}

pub fn render_waterfall(canvas: &mut PixelCanvas, time_domain: &[u8]) {
    if time_domain.is_empty() {
        return;
    }
    canvas.scroll_down(1, super::canvas::BACKGROUND);

    let slice = canvas.width() as f32 / time_domain.len() as f32;
    let points = time_domain
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f32 * slice, level(v) * WATERFALL_ROWS));
    canvas.polyline(points, GREEN);
}

pub fn render_meters(canvas: &mut PixelCanvas, frequency: &[u8]) {
    if frequency.is_empty() {
        return;
    }
    let height = canvas.height() as f32;
    let column_width = canvas.width() as f32 / METER_COLUMNS as f32;
    let segment_height = height / METER_SEGMENTS as f32;
    let len = frequency.len();

    for column in 0..METER_COLUMNS {
        let start = column * len / METER_COLUMNS;
        let end = (column + 1) * len / METER_COLUMNS;
        if end <= start {
            continue;
        }
        let sum: u32 = frequency[start..end].iter().map(|&v| v as u32).sum();
        let average = sum as f32 / (end - start) as f32;
        let bar_height = average / 255.0 * height * 0.9;
        let x = column as f32 * column_width;

        for segment in 0..METER_SEGMENTS {
            let seg_y = height - (segment + 1) as f32 * segment_height;
            if seg_y < height - bar_height {
                break;
            }
            canvas.fill_rect(
                x + 2.0,
                seg_y,
                column_width - 4.0,
                segment_height - 1.0,
                segment_color(segment),
            );
        }
    }
}

/// Green below 70% of the segments, yellow below 90%, red above
fn segment_color(segment: usize) -> Rgb {
    let position = segment as f32;
    let count = METER_SEGMENTS as f32;
    if position < count * 0.7 {
        GREEN
    } else if position < count * 0.9 {
        YELLOW
    } else {
        RED
    }
}

pub fn render_circle(canvas: &mut PixelCanvas, frequency: &[u8]) {
    if frequency.is_empty() {
        return;
    }
    let cx = canvas.width() as f32 / 2.0;
    let cy = CIRCLE_CENTER_Y;
    let step = 2.0 * PI / frequency.len() as f32;

    let outline: Vec<(f32, f32)> = frequency
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let angle = i as f32 * step;
            let radius = 20.0 + level(v) * 100.0;
            (cx + angle.cos() * radius, cy + angle.sin() * radius)
        })
        .collect();
    let closing = outline.first().copied();
    canvas.polyline(outline.into_iter().chain(closing), TEAL);

    let bass = frequency.iter().take(10).map(|&v| v as f32).sum::<f32>() / 10.0;
    canvas.fill_circle(cx, cy, 5.0 + bass / 255.0 * 15.0, ORANGE);
}

pub fn render_oscilloscope(canvas: &mut PixelCanvas, time_domain: &[u8]) {
    if time_domain.is_empty() {
        return;
    }
    let width = canvas.width() as f32;
    let trace_height = canvas.height() as f32 / SCOPE_TRACES as f32;
    let len = time_domain.len();

    for trace in 0..SCOPE_TRACES {
        let center = trace as f32 * trace_height + trace_height / 2.0;
        let start = trace * len / SCOPE_TRACES;
        let end = (trace + 1) * len / SCOPE_TRACES;
        if end <= start {
            continue;
        }
        let slice = width / (end - start) as f32;
        let color = Rgb::from_hsl(120.0 + 30.0 * trace as f32, 0.8, 0.6);
        let points = time_domain[start..end].iter().enumerate().map(|(i, &v)| {
            let sample = (v as f32 - 128.0) / 128.0;
            (i as f32 * slice, center + sample * trace_height / 3.0)
        });
        canvas.polyline(points, color);
    }
}

pub fn render_helix(canvas: &mut PixelCanvas, frequency: &[u8], time_secs: f64) {
    if frequency.is_empty() {
        return;
    }
    let cx = canvas.width() as f32 / 2.0;
    let height = canvas.height();
    let phase = (time_secs % (2.0 * std::f64::consts::PI)) as f32;

    for strand in 0..2 {
        let color = if strand == 0 { GREEN } else { TEAL };
        let mut last: Option<(f32, f32)> = None;

        for y in (0..height).step_by(2) {
            let amplitude = level(frequency[remap(y, height, frequency.len())]);
            let angle = (y as f32 * 0.05 + phase + strand as f32 * PI) % (2.0 * PI);
            let radius = 20.0 + amplitude * 60.0;
            let point = (cx + angle.cos() * radius, y as f32);

            if let Some((lx, ly)) = last {
                let rung = (angle % PI).abs() < 0.2;
                canvas.line(lx, ly, point.0, point.1, if rung { YELLOW } else { color });
            }
            last = Some(point);
        }
    }
}
