//! Audio context: owns the running strikes and renders output blocks.
//!
//! Mirrors the lifecycle of a browser audio context: it may start suspended
//! (autoplay policy), in which case its clock does not advance and it renders
//! silence until resumed by a user gesture.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::synth::StrikeParameters;

use super::mixer::Mixer;
use super::strike::Strike;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

pub struct AudioContext {
    state: ContextState,
    sample_rate: f64,
    frames_rendered: u64,
    strikes: Vec<Strike>,
    mixer: Mixer,
    rng: SmallRng,
}

impl AudioContext {
    pub fn new(sample_rate: f64, seed: u64, start_suspended: bool) -> Self {
        AudioContext {
            state: if start_suspended {
                ContextState::Suspended
            } else {
                ContextState::Running
            },
            sample_rate,
            frames_rendered: 0,
            strikes: Vec::new(),
            mixer: Mixer::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Seconds of audio rendered while running.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate
    }

    /// Resume a suspended context. Returns true if the state changed.
    pub fn resume(&mut self) -> bool {
        if self.state == ContextState::Suspended {
            self.state = ContextState::Running;
            log::debug!(target: "audio", "context resumed at {:.3}s", self.current_time());
            true
        } else {
            false
        }
    }

    /// Close the context and drop every strike. A closed context stays silent.
    pub fn close(&mut self) {
        self.state = ContextState::Closed;
        self.strikes.clear();
    }

    /// Start a strike at the context's current time.
    pub fn start_strike(&mut self, params: &StrikeParameters) {
        if self.state == ContextState::Closed {
            log::debug!(target: "audio", "strike ignored: context closed");
            return;
        }
        let strike = Strike::new(params, self.sample_rate, &mut self.rng);
        self.strikes.push(strike);
    }

    /// Number of strikes still sounding.
    pub fn active_strikes(&self) -> usize {
        self.strikes.len()
    }

    /// Render the next `frames` mono samples. Finished strikes are dropped.
    pub fn render_block(&mut self, frames: usize) -> Vec<f32> {
        self.mixer.clear(frames);
        if self.state != ContextState::Running {
            return self.mixer.output();
        }

        for strike in self.strikes.iter_mut() {
            for i in 0..frames {
                if strike.is_finished() {
                    break;
                }
                self.mixer.add(i, strike.next_sample());
            }
        }
        self.strikes.retain(|s| !s.is_finished());
        self.frames_rendered += frames as u64;

        self.mixer.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::strike::MAX_STRIKE_SECONDS;

    fn short() -> StrikeParameters {
        StrikeParameters {
            dampen: 0.05,
            ..Default::default()
        }
    }

    #[test]
    fn suspended_renders_silence_and_holds_clock() {
        let mut ctx = AudioContext::new(8000.0, 1, true);
        ctx.start_strike(&StrikeParameters::default());
        let out = ctx.render_block(256);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(ctx.current_time(), 0.0);
        assert_eq!(ctx.active_strikes(), 1);
    }

    #[test]
    fn queued_strike_sounds_after_resume() {
        let mut ctx = AudioContext::new(8000.0, 1, true);
        ctx.start_strike(&StrikeParameters::default());
        assert!(ctx.resume());
        assert!(!ctx.resume());
        let out = ctx.render_block(4000);
        assert!(out.iter().any(|s| s.abs() > 0.0001));
    }

    #[test]
    fn finished_strikes_are_dropped() {
        let mut ctx = AudioContext::new(8000.0, 2, false);
        ctx.start_strike(&short());
        ctx.start_strike(&short());
        assert_eq!(ctx.active_strikes(), 2);
        // Lasts 0.3s at dampen 0.05.
        ctx.render_block(8000);
        assert_eq!(ctx.active_strikes(), 0);
        assert!((ctx.current_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn endless_strike_still_ends() {
        let mut ctx = AudioContext::new(100.0, 5, false);
        ctx.start_strike(&StrikeParameters {
            dampen: f64::INFINITY,
            ..Default::default()
        });
        let frames = (MAX_STRIKE_SECONDS * ctx.sample_rate()) as usize;
        ctx.render_block(frames);
        assert_eq!(ctx.active_strikes(), 0);
    }

    #[test]
    fn closed_context_ignores_strikes() {
        let mut ctx = AudioContext::new(8000.0, 3, false);
        ctx.close();
        ctx.start_strike(&StrikeParameters::default());
        assert_eq!(ctx.active_strikes(), 0);
        assert!(!ctx.resume());
        assert_eq!(ctx.state(), ContextState::Closed);
    }

    #[test]
    fn output_is_clipped() {
        let mut ctx = AudioContext::new(8000.0, 4, false);
        let loud = StrikeParameters {
            volume: 1.0,
            ..Default::default()
        };
        for _ in 0..32 {
            ctx.start_strike(&loud);
        }
        for s in ctx.render_block(8000) {
            assert!((-1.0..=1.0).contains(&s));
        }
    }
}
