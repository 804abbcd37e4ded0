pub mod config;
pub mod controls;
pub mod dsp;
pub mod error;
pub mod offline;
pub mod page;
#[cfg(feature = "native")]
pub mod runtime;
pub mod scheduler;
pub mod settings;
pub mod synth;
pub mod timer;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen::prelude::*;

use crate::config::GongConfig;
use crate::controls::Controls;
use crate::page::GongPage;
use crate::scheduler::ScheduleBounds;
use crate::settings::{KeyValueStore, MemoryStore, PersistedSettings, SettingsStore};
use crate::synth::StrikeParameters;
use crate::timer::VirtualTimers;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the gong-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render one strike to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_strike_samples(
    volume: f64,
    tone: f64,
    dampen: f64,
    sample_rate: u32,
    seed: u32,
) -> Vec<f32> {
    let params = StrikeParameters {
        volume,
        tone,
        dampen,
    };
    dsp::renderer::render_strike(&params, sample_rate, seed as u64)
        .iter()
        .map(|&s| s as f32)
        .collect()
}

/// WASM-exposed: render one strike to a WAV byte array.
#[wasm_bindgen]
pub fn render_strike_wav(volume: f64, tone: f64, dampen: f64, sample_rate: u32, seed: u32) -> Vec<u8> {
    let params = StrikeParameters {
        volume,
        tone,
        dampen,
    };
    dsp::renderer::render_strike_wav(&params, sample_rate, seed as u64)
}

/// Read a stored settings record leniently on top of the default controls.
/// Malformed input yields the defaults.
pub fn settings_from_json(json: &str) -> PersistedSettings {
    let config = GongConfig::default();
    let mut store = MemoryStore::new();
    let mut controls = Controls::from_config(&config);
    if store.set(&config.settings_key, json).is_ok() {
        SettingsStore::new(store, config.settings_key.as_str()).load(&mut controls);
    }
    PersistedSettings::from_controls(&controls)
}

/// WASM-exposed: parse a stored settings record into a JS object, filling
/// missing or malformed fields with defaults.
#[wasm_bindgen]
pub fn parse_settings(json: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&settings_from_json(json))
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: draw one auto-strike delay in whole seconds.
#[wasm_bindgen]
pub fn sample_delay_secs(lower: u32, upper: u32, seed: u32) -> u32 {
    let mut rng = SmallRng::seed_from_u64(seed as u64);
    scheduler::sample_delay_secs(ScheduleBounds::new(lower, upper), &mut rng)
}

/// WASM-exposed gong page driven by the host's clock.
///
/// The host forwards control events, calls `advance_to` from its own timer
/// with `performance.now()`, pulls audio with `render_block`, and writes
/// `settings_record` to its storage after each change.
#[wasm_bindgen]
pub struct GongApp {
    page: GongPage<VirtualTimers, MemoryStore, SmallRng>,
    settings_key: String,
}

#[wasm_bindgen]
impl GongApp {
    #[wasm_bindgen(constructor)]
    pub fn new(saved: Option<String>, now_ms: f64, seed: u32) -> GongApp {
        let config = GongConfig::default();
        let mut store = MemoryStore::new();
        if let Some(record) = saved {
            let _ = store.set(&config.settings_key, &record);
        }
        let mut page = GongPage::new(
            &config,
            VirtualTimers::new(now_ms.max(0.0) as u64),
            store,
            SmallRng::seed_from_u64(seed as u64),
            seed as u64,
        );
        page.init();
        GongApp {
            page,
            settings_key: config.settings_key,
        }
    }

    pub fn test_strike(&mut self) {
        self.page.test_strike();
    }

    pub fn toggle_auto(&mut self, checked: bool) {
        self.page.toggle_auto(checked);
    }

    pub fn engage(&mut self) {
        self.page.engage();
    }

    pub fn set_lower(&mut self, text: &str) {
        self.page.set_lower(text);
    }

    pub fn set_upper(&mut self, text: &str) {
        self.page.set_upper(text);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.page.set_volume(volume);
    }

    pub fn set_tone(&mut self, tone: f64) {
        self.page.set_tone(tone);
    }

    pub fn set_dampen(&mut self, dampen: f64) {
        self.page.set_dampen(dampen);
    }

    pub fn pointer_down(&mut self) {
        self.page.pointer_down();
    }

    pub fn advance_to(&mut self, now_ms: f64) {
        self.page.advance_to(now_ms.max(0.0) as u64);
    }

    pub fn render_block(&mut self, frames: usize) -> Vec<f32> {
        self.page.synth().render_block(frames)
    }

    pub fn countdown(&self) -> String {
        self.page.controls.next_local.clone()
    }

    pub fn engage_label(&self) -> String {
        self.page.controls.engage_label.to_string()
    }

    /// The JSON record to persist, if one has been saved.
    pub fn settings_record(&self) -> Option<String> {
        self.page
            .settings()
            .store()
            .get(&self.settings_key)
            .ok()
            .flatten()
    }

    /// Current control surface as a JS object.
    pub fn controls(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.page.controls)
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}
