//! Exponential gain automation, following WebAudio `exponentialRampToValueAtTime`.

/// A value held at `start` until `start_time`, then ramped exponentially so
/// that it reaches `end` at `end_time`, and held at `end` afterwards.
///
/// As in WebAudio, a ramp whose endpoints are zero or of opposite signs does
/// not interpolate: it holds `start` until `end_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialRamp {
    pub start: f64,
    pub end: f64,
    /// Seconds.
    pub start_time: f64,
    /// Seconds.
    pub end_time: f64,
}

impl ExponentialRamp {
    pub fn new(start: f64, end: f64, start_time: f64, end_time: f64) -> Self {
        ExponentialRamp {
            start,
            end,
            start_time,
            end_time,
        }
    }

    /// Gain at time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f64 {
        if t >= self.end_time {
            return self.end;
        }
        if t <= self.start_time {
            return self.start;
        }
        if self.start == 0.0 || self.start * self.end <= 0.0 {
            return self.start;
        }
        let progress = (t - self.start_time) / (self.end_time - self.start_time);
        self.start * (self.end / self.start).powf(progress)
    }
}
