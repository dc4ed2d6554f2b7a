//! RBJ cookbook biquad with stereo state

use std::f32::consts::PI;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiquadKind {
    LowPass,
    HighPass,
    /// Bell centred on the frequency, boosting or cutting by `gain_db`
    Peaking { gain_db: f32 },
}

#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
}

impl BiquadCoeffs {
    const UNITY: Self = Self {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b1: 0.0,
        b2: 0.0,
    };
}

#[derive(Debug, Default, Clone)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f32, c: &BiquadCoeffs) -> f32 {
        let output = c.a0 * input + c.a1 * self.x1 + c.a2 * self.x2 - c.b1 * self.y1 - c.b2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Second-order IIR section
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: BiquadKind,
    sample_rate: f32,
    frequency: f32,
    q: f32,
    coeffs: BiquadCoeffs,
    left: BiquadState,
    right: BiquadState,
}

impl Biquad {
    pub fn new(kind: BiquadKind, sample_rate: f32, frequency: f32, q: f32) -> Self {
        let mut filter = Self {
            kind,
            sample_rate,
            frequency,
            q: q.max(0.01),
            coeffs: BiquadCoeffs::UNITY,
            left: BiquadState::default(),
            right: BiquadState::default(),
        };
        filter.update_coefficients();
        filter
    }

    pub fn kind(&self) -> BiquadKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    /// Gain of a peaking filter; 0 for other kinds
    pub fn gain_db(&self) -> f32 {
        match self.kind {
            BiquadKind::Peaking { gain_db } => gain_db,
            _ => 0.0,
        }
    }

    /// Change the gain of a peaking filter in place
    pub fn set_gain_db(&mut self, gain_db: f32) {
        if let BiquadKind::Peaking { .. } = self.kind {
            self.kind = BiquadKind::Peaking { gain_db };
            self.update_coefficients();
        }
    }

    fn update_coefficients(&mut self) {
        // Keep the centre below Nyquist so high bands stay stable at low rates
        let freq = self.frequency.clamp(1.0, self.sample_rate * 0.49);
        let omega = 2.0 * PI * freq / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * self.q);

        self.coeffs = match self.kind {
            BiquadKind::LowPass => {
                let a0 = 1.0 + alpha;
                BiquadCoeffs {
                    a0: ((1.0 - cos_omega) / 2.0) / a0,
                    a1: (1.0 - cos_omega) / a0,
                    a2: ((1.0 - cos_omega) / 2.0) / a0,
                    b1: (-2.0 * cos_omega) / a0,
                    b2: (1.0 - alpha) / a0,
                }
            }
            BiquadKind::HighPass => {
                let a0 = 1.0 + alpha;
                BiquadCoeffs {
                    a0: ((1.0 + cos_omega) / 2.0) / a0,
                    a1: (-(1.0 + cos_omega)) / a0,
                    a2: ((1.0 + cos_omega) / 2.0) / a0,
                    b1: (-2.0 * cos_omega) / a0,
                    b2: (1.0 - alpha) / a0,
                }
            }
            BiquadKind::Peaking { gain_db } => {
                if gain_db.abs() < 0.01 {
                    BiquadCoeffs::UNITY
                } else {
                    let a = 10.0f32.powf(gain_db / 40.0);
                    let a0 = 1.0 + alpha / a;
                    BiquadCoeffs {
                        a0: (1.0 + alpha * a) / a0,
                        a1: (-2.0 * cos_omega) / a0,
                        a2: (1.0 - alpha * a) / a0,
                        b1: (-2.0 * cos_omega) / a0,
                        b2: (1.0 - alpha / a) / a0,
                    }
                }
            }
        };
    }

    /// Filter one stereo frame
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        (
            self.left.process(left, &self.coeffs),
            self.right.process(right, &self.coeffs),
        )
    }

    /// Filter one mono sample (uses the left channel state)
    #[inline]
    pub fn process_mono(&mut self, input: f32) -> f32 {
        self.left.process(input, &self.coeffs)
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
