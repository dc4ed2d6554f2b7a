//! Table-driven soft-clip distortion

use std::f32::consts::PI;

/// Length of the distortion lookup table
pub const CURVE_LEN: usize = 44_100;

/// Soft-clip saturation curve over [-1, 1]
pub fn distortion_curve() -> Vec<f32> {
    let deg = PI / 180.0;
    (0..CURVE_LEN)
        .map(|i| {
            let x = (i as f32 * 2.0) / CURVE_LEN as f32 - 1.0;
            (23.0 * x * 20.0 * deg) / (PI + 20.0 * x.abs())
        })
        .collect()
}

/// Maps amplitude through the curve with linear interpolation,
/// running at twice the input rate.
pub struct Waveshaper {
    curve: Vec<f32>,
    previous: f32,
}

impl Waveshaper {
    pub fn new() -> Self {
        Self {
            curve: distortion_curve(),
            previous: 0.0,
        }
    }

    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    /// Look up one amplitude; input outside [-1, 1] pins to the table ends
    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        let last = self.curve.len() - 1;
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * last as f32;
        let index = pos.floor() as usize;
        if index >= last {
            return self.curve[last];
        }
        let frac = pos - index as f32;
        self.curve[index] + frac * (self.curve[index + 1] - self.curve[index])
    }

    /// Shape one sample with 2x oversampling
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let midpoint = 0.5 * (self.previous + x);
        self.previous = x;
        0.5 * (self.shape(midpoint) + self.shape(x))
    }

    pub fn reset(&mut self) {
        self.previous = 0.0;
    }
}

impl Default for Waveshaper {
    fn default() -> Self {
        Self::new()
    }
}
