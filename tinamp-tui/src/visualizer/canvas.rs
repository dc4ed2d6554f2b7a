//! Fixed-size RGB pixel surface the visualizer draws on

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn hex(value: u32) -> Self {
        Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Linear blend, `t` = 0 gives `self`
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    /// From hue in degrees, saturation and lightness in 0..=1
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Rgb {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb(to_byte(r), to_byte(g), to_byte(b))
    }
}

/// Logical canvas size of the visualizer panel
pub const CANVAS_WIDTH: usize = 263;
pub const CANVAS_HEIGHT: usize = 280;
pub const BACKGROUND: Rgb = Rgb(10, 15, 26);

#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Default for PixelCanvas {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

impl PixelCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Pixels outside the canvas are ignored
    pub fn set(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Fill the rectangle covering `[x, x+w) x [y, y+h)`, clipped
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let x0 = x.max(0.0).floor() as usize;
        let y0 = y.max(0.0).floor() as usize;
        let x1 = ((x + w).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((y + h).ceil().max(0.0) as usize).min(self.height);
        for row in y0..y1 {
            let start = row * self.width;
            self.pixels[start + x0.min(x1)..start + x1].fill(color);
        }
    }

    /// Vertical gradient fill from `top` at `y` to `bottom` at `y + h`
    pub fn fill_gradient(&mut self, x: f32, y: f32, w: f32, h: f32, stops: &[Rgb]) {
        if h <= 0.0 || stops.is_empty() {
            return;
        }
        let y0 = y.max(0.0).floor() as i32;
        let y1 = (y + h).ceil() as i32;
        for row in y0..y1 {
            let t = ((row as f32 - y) / h).clamp(0.0, 1.0);
            self.fill_rect(x, row as f32, w, 1.0, sample_gradient(stops, t));
        }
    }

    /// Bresenham line between two points
    pub fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb) {
        let (mut x, mut y) = (x0.round() as i32, y0.round() as i32);
        let (xe, ye) = (x1.round() as i32, y1.round() as i32);
        let dx = (xe - x).abs();
        let dy = -(ye - y).abs();
        let sx = if x < xe { 1 } else { -1 };
        let sy = if y < ye { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set(x, y, color);
            if x == xe && y == ye {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Connect consecutive points
    pub fn polyline(&mut self, points: impl IntoIterator<Item = (f32, f32)>, color: Rgb) {
        let mut last: Option<(f32, f32)> = None;
        for (x, y) in points {
            if let Some((lx, ly)) = last {
                self.line(lx, ly, x, y, color);
            }
            last = Some((x, y));
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb) {
        let r = radius.max(0.0);
        let y0 = (cy - r).floor() as i32;
        let y1 = (cy + r).ceil() as i32;
        for y in y0..=y1 {
            let dy = y as f32 - cy;
            let span = (r * r - dy * dy).max(0.0).sqrt();
            let x0 = (cx - span).round() as i32;
            let x1 = (cx + span).round() as i32;
            for x in x0..=x1 {
                self.set(x, y, color);
            }
        }
    }

    /// Move every row down by `rows`, filling the top with `fill`
    pub fn scroll_down(&mut self, rows: usize, fill: Rgb) {
        let rows = rows.min(self.height);
        let shift = rows * self.width;
        let len = self.pixels.len();
        self.pixels.copy_within(0..len - shift, shift);
        self.pixels[..shift].fill(fill);
    }

    /// Count of pixels differing from `color`
    pub fn count_not(&self, color: Rgb) -> usize {
        self.pixels.iter().filter(|&&p| p != color).count()
    }
}

/// Evenly spaced color stops
fn sample_gradient(stops: &[Rgb], t: f32) -> Rgb {
    if stops.len() == 1 {
        return stops[0];
    }
    let scaled = t * (stops.len() - 1) as f32;
    let index = (scaled.floor() as usize).min(stops.len() - 2);
    stops[index].lerp(stops[index + 1], scaled - index as f32)
}
