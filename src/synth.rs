//! Synthesizer: fire-and-forget strikes on a lazily created audio context.

use serde::{Deserialize, Serialize};

use crate::dsp::context::{AudioContext, ContextState};

/// Parameters of one strike, read from the controls at strike time.
///
/// Values are used as given; range limits belong to the controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeParameters {
    /// Master gain [0, 1].
    pub volume: f64,
    /// Fundamental frequency in Hz.
    pub tone: f64,
    /// Decay-time multiplier.
    pub dampen: f64,
}

impl Default for StrikeParameters {
    fn default() -> Self {
        StrikeParameters {
            volume: 0.6,
            tone: 150.0,
            dampen: 1.4,
        }
    }
}

/// Owns the page's single audio context.
pub struct Synthesizer {
    context: Option<AudioContext>,
    sample_rate: f64,
    seed: u64,
    start_suspended: bool,
    strikes_started: u64,
}

impl Synthesizer {
    pub fn new(sample_rate: f64, seed: u64, start_suspended: bool) -> Self {
        Synthesizer {
            context: None,
            sample_rate,
            seed,
            start_suspended,
            strikes_started: 0,
        }
    }

    /// The audio context, created on first use.
    pub fn context(&mut self) -> &mut AudioContext {
        let (sample_rate, seed, start_suspended) =
            (self.sample_rate, self.seed, self.start_suspended);
        self.context.get_or_insert_with(|| {
            log::debug!(target: "audio", "creating audio context ({sample_rate} Hz)");
            AudioContext::new(sample_rate, seed, start_suspended)
        })
    }

    /// Whether playback is blocked until a user gesture.
    pub fn is_suspended(&mut self) -> bool {
        self.context().state() == ContextState::Suspended
    }

    /// Handle a user gesture: resume the context if the autoplay policy
    /// suspended it. Returns true if the context was resumed.
    pub fn unlock(&mut self) -> bool {
        self.context().resume()
    }

    /// Play one strike now.
    pub fn strike(&mut self, params: StrikeParameters) {
        self.strikes_started += 1;
        log::debug!(
            target: "audio",
            "strike #{} volume={} tone={} dampen={}",
            self.strikes_started,
            params.volume,
            params.tone,
            params.dampen
        );
        self.context().start_strike(&params);
    }

    /// Total strikes requested over this synthesizer's lifetime.
    pub fn strikes_started(&self) -> u64 {
        self.strikes_started
    }

    /// Pull the next output block for the host's audio callback.
    pub fn render_block(&mut self, frames: usize) -> Vec<f32> {
        self.context().render_block(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_created_lazily_and_once() {
        let mut synth = Synthesizer::new(8000.0, 1, true);
        assert!(synth.context.is_none());
        synth.strike(StrikeParameters::default());
        synth.strike(StrikeParameters::default());
        assert_eq!(synth.context().active_strikes(), 2);
        assert_eq!(synth.strikes_started(), 2);
    }

    #[test]
    fn unlock_resumes_once() {
        let mut synth = Synthesizer::new(8000.0, 1, true);
        assert!(synth.is_suspended());
        assert!(synth.unlock());
        assert!(!synth.is_suspended());
        assert!(!synth.unlock());
    }

    #[test]
    fn unsuspended_start_plays_immediately() {
        let mut synth = Synthesizer::new(8000.0, 1, false);
        assert!(!synth.is_suspended());
        synth.strike(StrikeParameters::default());
        let out = synth.render_block(2000);
        assert!(out.iter().any(|s| s.abs() > 0.0001));
    }

    #[test]
    fn parameters_serialize_flat() {
        let json = serde_json::to_string(&StrikeParameters::default()).unwrap();
        assert_eq!(json, r#"{"volume":0.6,"tone":150.0,"dampen":1.4}"#);
    }
}
