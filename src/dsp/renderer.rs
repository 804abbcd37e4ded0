//! WAV renderer: renders one strike offline to samples or a WAV byte buffer.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::synth::StrikeParameters;

use super::strike::Strike;

/// Render a complete strike to mono samples.
pub fn render_strike(params: &StrikeParameters, sample_rate: u32, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut strike = Strike::new(params, sample_rate as f64, &mut rng);
    let mut out = Vec::with_capacity((strike.duration_secs() * sample_rate as f64) as usize);
    while !strike.is_finished() {
        out.push(strike.next_sample());
    }
    out
}

/// Render a complete strike to a 16-bit mono WAV file in memory.
pub fn render_strike_wav(params: &StrikeParameters, sample_rate: u32, seed: u64) -> Vec<u8> {
    let samples = render_strike(params, sample_rate, seed);
    let data_len = (samples.len() * 2) as u32;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    write_header(&mut wav, sample_rate, data_len);
    for s in samples {
        let pcm = (s.clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
        wav.extend_from_slice(&pcm.to_le_bytes());
    }
    wav
}

/// Canonical 44-byte RIFF/WAVE header for 16-bit mono PCM.
fn write_header(out: &mut Vec<u8>, sample_rate: u32, data_len: u32) {
    const FMT_LEN: u32 = 16;
    const PCM: u16 = 1;
    const MONO: u16 = 1;
    const BYTES_PER_FRAME: u16 = 2;

    let chunks: [&[u8]; 13] = [
        b"RIFF",
        &(36 + data_len).to_le_bytes(),
        b"WAVE",
        b"fmt ",
        &FMT_LEN.to_le_bytes(),
        &PCM.to_le_bytes(),
        &MONO.to_le_bytes(),
        &sample_rate.to_le_bytes(),
        &(sample_rate * BYTES_PER_FRAME as u32).to_le_bytes(),
        &BYTES_PER_FRAME.to_le_bytes(),
        &16u16.to_le_bytes(),
        b"data",
        &data_len.to_le_bytes(),
    ];
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
}
