//! Eight-band level meter with smoothing and peak decay

/// Number of bands in the meter
pub const BAND_COUNT: usize = 8;

/// Frequency range of each band in Hz
pub const BAND_RANGES: [(f32, f32); BAND_COUNT] = [
    (20.0, 60.0),
    (60.0, 250.0),
    (250.0, 500.0),
    (500.0, 2000.0),
    (2000.0, 4000.0),
    (4000.0, 6000.0),
    (6000.0, 12000.0),
    (12000.0, 20000.0),
];

/// Fraction of the gap to the target covered per frame
const RISE_COEFF: f32 = 0.3;
/// Per-frame peak decay factor
const PEAK_DECAY: f32 = 0.95;
/// Bars never drop below this height (percent)
const MIN_DISPLAY_HEIGHT: f32 = 2.0;
/// Peak-to-bar gap (percent) that lights the flash
const FLASH_THRESHOLD: f32 = 10.0;

/// Smoothed band levels in percent (0..=100)
#[derive(Debug, Clone, Default)]
pub struct BandMeter {
    levels: [f32; BAND_COUNT],
    peaks: [f32; BAND_COUNT],
}

impl BandMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from byte frequency data captured at `sample_rate`
    pub fn update(&mut self, frequency_data: &[u8], sample_rate: u32) {
        let bin_count = frequency_data.len();
        if bin_count == 0 {
            return;
        }
        let nyquist = sample_rate as f32 / 2.0;

        for (i, &(min, max)) in BAND_RANGES.iter().enumerate() {
            let start = ((min / nyquist) * bin_count as f32).floor() as usize;
            let end = ((max / nyquist) * bin_count as f32).floor() as usize;

            let mut sum = 0u32;
            let mut count = 0u32;
            for &value in frequency_data.iter().take(end + 1).skip(start) {
                sum += value as u32;
                count += 1;
            }

            let average = if count > 0 { sum as f32 / count as f32 } else { 0.0 };
            let target = average / 255.0 * 100.0;

            self.levels[i] += (target - self.levels[i]) * RISE_COEFF;

            if target > self.peaks[i] {
                self.peaks[i] = target;
            } else {
                self.peaks[i] *= PEAK_DECAY;
            }
        }
    }

    /// Displayed height of band `i` in percent
    pub fn height(&self, i: usize) -> f32 {
        self.levels.get(i).copied().unwrap_or(0.0).max(MIN_DISPLAY_HEIGHT)
    }

    pub fn level(&self, i: usize) -> f32 {
        self.levels.get(i).copied().unwrap_or(0.0)
    }

    pub fn peak(&self, i: usize) -> f32 {
        self.peaks.get(i).copied().unwrap_or(0.0)
    }

    /// Whether band `i` should show the peak flash
    pub fn is_flashing(&self, i: usize) -> bool {
        self.peak(i) - self.level(i) > FLASH_THRESHOLD
    }

    pub fn reset(&mut self) {
        self.levels = [0.0; BAND_COUNT];
        self.peaks = [0.0; BAND_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rises_by_thirty_percent() {
        let mut meter = BandMeter::new();
        let data = [255u8; 1024];
        meter.update(&data, 44100);
        for i in 0..BAND_COUNT {
            assert!((meter.level(i) - 30.0).abs() < 1e-3);
            assert!((meter.peak(i) - 100.0).abs() < 1e-3);
            assert!(meter.is_flashing(i));
        }
    }

    #[test]
    fn test_peak_decays_when_signal_drops() {
        let mut meter = BandMeter::new();
        meter.update(&[255u8; 1024], 44100);
        meter.update(&[0u8; 1024], 44100);
        assert!((meter.peak(0) - 95.0).abs() < 1e-3);
        assert!((meter.level(0) - 21.0).abs() < 1e-3);
    }

    #[test]
    fn test_minimum_display_height() {
        let meter = BandMeter::new();
        assert!((meter.height(3) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bands_read_their_own_bins() {
        let mut meter = BandMeter::new();
        // 1024 bins over 22050 Hz: ~21.5 Hz per bin; bins 0..=2 cover sub-bass
        let mut data = [0u8; 1024];
        data[..3].fill(255);
        meter.update(&data, 44100);
        assert!(meter.level(0) > 0.0);
        assert_eq!(meter.level(7), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut meter = BandMeter::new();
        meter.update(&[200u8; 512], 48000);
        meter.reset();
        for i in 0..BAND_COUNT {
            assert_eq!(meter.level(i), 0.0);
            assert_eq!(meter.peak(i), 0.0);
        }
    }
}
