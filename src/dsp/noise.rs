//! Mallet transient: a short burst of exponentially decaying white noise.

use rand::Rng;

/// Length of the noise buffer.
pub const NOISE_BUFFER_SECONDS: f64 = 2.0;
/// Time constant of the burst's exponential decay.
pub const NOISE_DECAY_SECONDS: f64 = 0.02;
/// The noise source is stopped after this long.
pub const NOISE_STOP_SECONDS: f64 = 0.05;

/// Render the audible part of the noise burst.
///
/// Sample `i` is `(u * 2 - 1) * exp(-i / (sr * 0.02))`; playback stops at
/// [`NOISE_STOP_SECONDS`], so only that prefix of the buffer is produced.
pub fn noise_burst<R: Rng + ?Sized>(sample_rate: f64, rng: &mut R) -> Vec<f64> {
    let buffer_len = (NOISE_BUFFER_SECONDS * sample_rate) as usize;
    let audible = ((NOISE_STOP_SECONDS * sample_rate) as usize).min(buffer_len);
    let decay = sample_rate * NOISE_DECAY_SECONDS;
    (0..audible)
        .map(|i| {
            let white = rng.random::<f64>() * 2.0 - 1.0;
            white * (-(i as f64) / decay).exp()
        })
        .collect()
}
