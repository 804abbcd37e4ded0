//! Band-pass biquad with WebAudio `BiquadFilterNode` "bandpass" coefficients
//! (RBJ cookbook, constant 0 dB peak gain).

use std::f64::consts::TAU;

/// Normalized coefficients; `a0` is folded into the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    fn bandpass(center: f64, q: f64, sample_rate: f64) -> Self {
        let center = center.clamp(0.0, sample_rate / 2.0);
        let w0 = TAU * center / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(1e-4));
        let norm = 1.0 / (1.0 + alpha);
        Coefficients {
            b0: alpha * norm,
            b2: -alpha * norm,
            a1: -2.0 * w0.cos() * norm,
            a2: (1.0 - alpha) * norm,
        }
    }
}

/// Band-pass filter run in transposed direct form II. The centre frequency
/// is fixed for the life of a strike.
#[derive(Debug, Clone)]
pub struct BandPass {
    center: f64,
    coeffs: Coefficients,
    s1: f64,
    s2: f64,
}

impl BandPass {
    pub fn new(center: f64, q: f64, sample_rate: f64) -> Self {
        BandPass {
            center,
            coeffs: Coefficients::bandpass(center, q, sample_rate),
            s1: 0.0,
            s2: 0.0,
        }
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let Coefficients { b0, b2, a1, a2 } = self.coeffs;
        let y = b0 * x + self.s1;
        // b1 is zero for a band-pass.
        self.s1 = self.s2 - a1 * y;
        self.s2 = b2 * x - a2 * y;
        y
    }
}
