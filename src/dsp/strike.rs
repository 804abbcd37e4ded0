//! Strike: one gong sound, mallet noise plus inharmonic partials, shaped by
//! a master decay and a band-pass filter.

use rand::Rng;

use crate::synth::StrikeParameters;

use super::envelope::ExponentialRamp;
use super::filter::BandPass;
use super::noise::{NOISE_STOP_SECONDS, noise_burst};
use super::oscillator::Oscillator;

/// Frequency ratios of the metallic partials relative to the tone.
pub const PARTIAL_RATIOS: [f64; 6] = [1.0, 1.9, 2.7, 3.6, 4.8, 6.1];

/// Total random detune span per partial (±1%).
const DETUNE_SPREAD: f64 = 0.02;
/// Gain of partial `i` is `PARTIAL_FALLOFF^i * PARTIAL_LEVEL`.
const PARTIAL_FALLOFF: f64 = 0.6;
const PARTIAL_LEVEL: f64 = 0.9;
/// Partial decay length is `PARTIAL_DECAY * (i + 1) * dampen` seconds.
const PARTIAL_DECAY: f64 = 0.5;
/// Partials hold their initial gain this long before decaying.
const PARTIAL_HOLD: f64 = 0.001;
/// Partials keep running this long after their decay completes.
const PARTIAL_TAIL: f64 = 0.1;
/// Master decay length is `MASTER_DECAY * dampen` seconds.
const MASTER_DECAY: f64 = 6.0;
/// Exponential ramps cannot reach zero; they end here instead.
const SILENCE: f64 = 0.0001;
const BAND_CENTER_RATIO: f64 = 1.2;
const BAND_Q: f64 = 6.0;
/// Longest a strike may sound; also stands in for a non-finite length.
pub const MAX_STRIKE_SECONDS: f64 = 120.0;

/// A sine partial with its own decay.
#[derive(Debug, Clone)]
struct Partial {
    oscillator: Oscillator,
    gain: ExponentialRamp,
    stop_time: f64,
}

/// A single in-flight gong strike.
#[derive(Debug, Clone)]
pub struct Strike {
    noise: Vec<f64>,
    partials: Vec<Partial>,
    master: ExponentialRamp,
    band: BandPass,
    sample_rate: f64,
    position: usize,
    total_samples: usize,
}

impl Strike {
    /// Build the strike graph. `rng` supplies the noise and the partial detune.
    pub fn new<R: Rng + ?Sized>(params: &StrikeParameters, sample_rate: f64, rng: &mut R) -> Self {
        let noise = noise_burst(sample_rate, rng);

        let partials: Vec<Partial> = PARTIAL_RATIOS
            .iter()
            .enumerate()
            .map(|(i, ratio)| {
                let detune = 1.0 + (rng.random::<f64>() - 0.5) * DETUNE_SPREAD;
                let freq = params.tone * ratio * detune;
                let level = PARTIAL_FALLOFF.powi(i as i32) * PARTIAL_LEVEL;
                let decay = PARTIAL_DECAY * (i + 1) as f64 * params.dampen;
                Partial {
                    oscillator: Oscillator::new(freq, sample_rate),
                    gain: ExponentialRamp::new(level, SILENCE, PARTIAL_HOLD, decay),
                    stop_time: decay + PARTIAL_TAIL,
                }
            })
            .collect();

        let master_end = MASTER_DECAY * params.dampen;
        let master = ExponentialRamp::new(params.volume, SILENCE, 0.0, master_end);
        let band = BandPass::new(params.tone * BAND_CENTER_RATIO, BAND_Q, sample_rate);

        let longest_partial = partials.iter().map(|p| p.stop_time).fold(0.0, f64::max);
        let duration = master_end.max(longest_partial).max(NOISE_STOP_SECONDS);
        let duration = if duration.is_finite() {
            duration.min(MAX_STRIKE_SECONDS)
        } else {
            MAX_STRIKE_SECONDS
        };

        Strike {
            noise,
            partials,
            master,
            band,
            sample_rate,
            position: 0,
            total_samples: (duration * sample_rate).ceil() as usize,
        }
    }

    /// Generate the next output sample.
    pub fn next_sample(&mut self) -> f64 {
        if self.is_finished() {
            return 0.0;
        }
        let t = self.position as f64 / self.sample_rate;

        let mut sum = self.noise.get(self.position).copied().unwrap_or(0.0);
        for p in self.partials.iter_mut() {
            let s = p.oscillator.next_sample();
            if t < p.stop_time {
                sum += s * p.gain.value_at(t);
            }
        }

        self.position += 1;
        self.band.process(sum * self.master.value_at(t))
    }

    /// Has every source of this strike stopped?
    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    /// Length of the strike in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_samples as f64 / self.sample_rate
    }

    /// The detuned partial frequencies, lowest ratio first.
    pub fn partial_frequencies(&self) -> Vec<f64> {
        self.partials.iter().map(|p| p.oscillator.frequency()).collect()
    }

    /// Center frequency of the shaping band-pass.
    pub fn band_center(&self) -> f64 {
        self.band.center()
    }
}
