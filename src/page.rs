//! The gong page: wires the controls to the synthesizer, the auto scheduler
//! and the settings store.
//!
//! Every user action and timer delivery is a method call; the page owns all
//! mutable state, so several pages can coexist (one per test, for example).

use crate::config::GongConfig;
use crate::controls::Controls;
use crate::scheduler::{AutoScheduler, DelaySource};
use crate::settings::{KeyValueStore, SettingsStore};
use crate::synth::Synthesizer;
use crate::timer::{Millis, TimerEvent, TimerHandle, TimerHost, TimerKind, VirtualTimers};

pub struct GongPage<H, S, D> {
    pub controls: Controls,
    synth: Synthesizer,
    scheduler: AutoScheduler<D>,
    settings: SettingsStore<S>,
    host: H,
}

impl<H: TimerHost, S: KeyValueStore, D: DelaySource> GongPage<H, S, D> {
    /// Build a page. Call [`GongPage::init`] before delivering events.
    pub fn new(config: &GongConfig, host: H, store: S, delays: D, audio_seed: u64) -> Self {
        GongPage {
            controls: Controls::from_config(config),
            synth: Synthesizer::new(
                config.sample_rate as f64,
                audio_seed,
                config.start_suspended,
            ),
            scheduler: AutoScheduler::new(config.bounds, config.countdown_interval_ms, delays),
            settings: SettingsStore::new(store, config.settings_key.clone()),
            host,
        }
    }

    /// Restore saved settings and resume auto mode if it was left on.
    pub fn init(&mut self) {
        if self.settings.load(&mut self.controls) {
            log::info!(target: "page", "restored settings from {}", self.settings.key());
        }
        self.controls.update_engage_label();
        if self.controls.auto_enabled {
            let bounds = self.controls.bounds();
            self.scheduler.set_bounds(bounds);
            let suspended = self.synth.is_suspended();
            self.scheduler.start(&mut self.host, suspended);
        }
        self.refresh_countdown();
    }

    /// Test button: strike right now.
    pub fn test_strike(&mut self) {
        self.synth.strike(self.controls.strike_parameters());
    }

    /// The auto checkbox changed.
    pub fn toggle_auto(&mut self, checked: bool) {
        self.controls.auto_enabled = checked;
        if checked {
            self.start_auto();
        } else {
            self.scheduler.stop(&mut self.host);
        }
        self.controls.update_engage_label();
        self.settings.save(&self.controls);
        self.refresh_countdown();
    }

    /// Engage button: flips auto mode, striking immediately when turning on.
    pub fn engage(&mut self) {
        self.controls.auto_enabled = !self.controls.auto_enabled;
        if self.controls.auto_enabled {
            self.synth.strike(self.controls.strike_parameters());
            self.start_auto();
        } else {
            self.scheduler.stop(&mut self.host);
        }
        self.controls.update_engage_label();
        self.settings.save(&self.controls);
        self.refresh_countdown();
    }

    pub fn set_lower(&mut self, text: &str) {
        self.controls.set_lower_text(text);
        self.bounds_changed();
    }

    pub fn set_upper(&mut self, text: &str) {
        self.controls.set_upper_text(text);
        self.bounds_changed();
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.controls.volume = volume;
        self.settings.save(&self.controls);
    }

    pub fn set_tone(&mut self, tone: f64) {
        self.controls.tone = tone;
        self.settings.save(&self.controls);
    }

    pub fn set_dampen(&mut self, dampen: f64) {
        self.controls.dampen = dampen;
        self.settings.save(&self.controls);
    }

    /// Any pointer press on the page counts as the user gesture that unlocks
    /// audio.
    pub fn pointer_down(&mut self) {
        if self.synth.unlock() {
            log::debug!(target: "page", "audio unlocked by user gesture");
        }
        self.scheduler.unlocked(&mut self.host);
        self.refresh_countdown();
    }

    /// Deliver a due timer from the host.
    pub fn timer_fired(&mut self, event: TimerEvent) {
        match event.kind {
            TimerKind::Timeout => self.strike_timer(event.handle),
            TimerKind::Interval => self.tick(event.handle),
        }
    }

    /// Strike timer came due.
    pub fn strike_timer(&mut self, handle: TimerHandle) {
        let suspended = self.synth.is_suspended();
        if self.scheduler.on_timer(&mut self.host, handle, suspended) {
            self.synth.strike(self.controls.strike_parameters());
        }
        self.refresh_countdown();
    }

    /// Countdown ticker came due.
    pub fn tick(&mut self, handle: TimerHandle) {
        if self.scheduler.owns_ticker(handle) {
            self.refresh_countdown();
        }
    }

    pub fn synth(&mut self) -> &mut Synthesizer {
        &mut self.synth
    }

    pub fn scheduler(&self) -> &AutoScheduler<D> {
        &self.scheduler
    }

    pub fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Give the store back, e.g. to reopen it in a fresh session.
    pub fn into_store(self) -> S {
        self.settings.into_inner()
    }

    fn start_auto(&mut self) {
        let bounds = self.controls.bounds();
        self.scheduler.set_bounds(bounds);
        let suspended = self.synth.is_suspended();
        self.scheduler.start(&mut self.host, suspended);
    }

    fn bounds_changed(&mut self) {
        if self.controls.auto_enabled {
            let suspended = self.synth.is_suspended();
            self.scheduler
                .restart(&mut self.host, self.controls.bounds(), suspended);
        } else {
            self.scheduler.set_bounds(self.controls.bounds());
        }
        self.settings.save(&self.controls);
        self.refresh_countdown();
    }

    fn refresh_countdown(&mut self) {
        let text = self.scheduler.countdown_text(self.host.now_ms());
        self.controls.set_countdown(&text);
    }
}

impl<S: KeyValueStore, D: DelaySource> GongPage<VirtualTimers, S, D> {
    /// Deliver every timer due up to `now`, in deadline order.
    pub fn advance_to(&mut self, now: Millis) {
        while let Some(event) = self.host.next_due(now) {
            self.timer_fired(event);
        }
        self.refresh_countdown();
    }
}
