//! Output bus: sums concurrent strikes into one block and clips it the way an
//! audio destination does.

#[derive(Debug, Clone, Default)]
pub struct Mixer {
    bus: Vec<f64>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the bus and size it to `frames`.
    pub fn clear(&mut self, frames: usize) {
        self.bus.clear();
        self.bus.resize(frames, 0.0);
    }

    /// Mix `sample` into `frame`; frames past the end are dropped.
    pub fn add(&mut self, frame: usize, sample: f64) {
        if let Some(slot) = self.bus.get_mut(frame) {
            *slot += sample;
        }
    }

    pub fn output(&self) -> Vec<f32> {
        self.bus.iter().map(|s| s.clamp(-1.0, 1.0) as f32).collect()
    }

    pub fn len(&self) -> usize {
        self.bus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bus.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleared_bus_is_silent() {
        let mut m = Mixer::new();
        assert!(m.is_empty());
        m.clear(128);
        assert_eq!(m.len(), 128);
        assert!(!m.is_empty());
        assert!(m.output().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn overlapping_strikes_sum() {
        let mut m = Mixer::new();
        m.clear(4);
        m.add(0, 0.5);
        m.add(0, 0.25);
        m.add(1, -0.5);
        m.add(9, 1.0);
        assert_eq!(m.output(), vec![0.75, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn loud_sum_is_clipped() {
        let mut m = Mixer::new();
        m.clear(2);
        m.add(0, 100.0);
        m.add(1, -3.0);
        assert_eq!(m.output(), vec![1.0, -1.0]);
    }
}
