//! Sine oscillator for the gong partials.

use std::f64::consts::TAU;

/// Fixed-frequency sine; phase is kept in cycles and wrapped to [0, 1).
#[derive(Debug, Clone)]
pub struct Oscillator {
    frequency: f64,
    step: f64,
    phase: f64,
}

impl Oscillator {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            frequency,
            step: frequency / sample_rate,
            phase: 0.0,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn next_sample(&mut self) -> f64 {
        let y = (TAU * self.phase).sin();
        self.phase = (self.phase + self.step).fract();
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_crossing() {
        let mut osc = Oscillator::new(440.0, 44100.0);
        assert!(osc.next_sample().abs() < 1e-12);
    }

    #[test]
    fn stays_in_unit_range() {
        let mut osc = Oscillator::new(915.0, 44100.0);
        assert!((0..44100).all(|_| (-1.0..=1.0).contains(&osc.next_sample())));
    }

    #[test]
    fn peaks_a_quarter_cycle_in() {
        let mut osc = Oscillator::new(100.0, 400.0);
        osc.next_sample();
        let y = osc.next_sample();
        assert!((y - 1.0).abs() < 1e-12, "got {y}");
        assert_eq!(osc.frequency(), 100.0);
    }
}
