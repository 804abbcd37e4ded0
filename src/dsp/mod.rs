//! DSP: pure Rust gong synthesis.
//!
//! The same code renders strikes for the browser (AudioWorklet + WASM) and
//! offline (WAV export).

pub mod context;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod renderer;
pub mod strike;
