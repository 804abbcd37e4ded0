//! Auto-strike scheduler.
//!
//! Picks a random whole-second delay within [`ScheduleBounds`], arms a
//! one-shot timer, and re-arms every time it fires until stopped. A countdown
//! ticker runs alongside while a strike is pending.
//!
//! ```text
//!  Idle ──start──▶ Scheduled ──timer──▶ (strike) ──▶ Scheduled ...
//!   │                 ▲
//!   └──start (audio locked)──▶ WaitingForUnlock ──unlocked──┘
//!  stop: any state ──▶ Idle
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::timer::{Millis, TimerHandle, TimerHost};

/// Inclusive range of seconds between automatic strikes.
///
/// Always satisfies `1 <= min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBounds {
    min: u32,
    max: u32,
}

impl ScheduleBounds {
    /// Lower bound is raised to 1; upper is raised to the lower bound.
    pub fn new(lower: u32, upper: u32) -> Self {
        let min = lower.max(1);
        ScheduleBounds {
            min,
            max: upper.max(min),
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl Default for ScheduleBounds {
    fn default() -> Self {
        ScheduleBounds::new(5, 10)
    }
}

/// Source of uniform values in [0, 1) for delay selection.
pub trait DelaySource {
    fn next_unit(&mut self) -> f64;
}

impl<R: Rng> DelaySource for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Draw a whole number of seconds uniformly from `[min, max]`.
pub fn sample_delay_secs<D: DelaySource + ?Sized>(bounds: ScheduleBounds, source: &mut D) -> u32 {
    let span = (bounds.max - bounds.min + 1) as f64;
    let delay = (bounds.min as f64 + source.next_unit() * span).floor() as u32;
    delay.clamp(bounds.min, bounds.max)
}

/// Countdown text while nothing is scheduled.
pub const IDLE_TEXT: &str = "-";
/// Countdown text while waiting for a user gesture to unlock audio.
pub const UNLOCK_TEXT: &str = "tap";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    WaitingForUnlock,
    Scheduled { next_fire_at: Millis },
}

pub struct AutoScheduler<D> {
    bounds: ScheduleBounds,
    state: SchedulerState,
    timer: Option<TimerHandle>,
    ticker: Option<TimerHandle>,
    countdown_interval_ms: Millis,
    delays: D,
}

impl<D: DelaySource> AutoScheduler<D> {
    pub fn new(bounds: ScheduleBounds, countdown_interval_ms: Millis, delays: D) -> Self {
        AutoScheduler {
            bounds,
            state: SchedulerState::Idle,
            timer: None,
            ticker: None,
            countdown_interval_ms,
            delays,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn bounds(&self) -> ScheduleBounds {
        self.bounds
    }

    /// Replace the bounds used by the next scheduling decision.
    pub fn set_bounds(&mut self, bounds: ScheduleBounds) {
        self.bounds = bounds;
    }

    /// Anything other than idle.
    pub fn is_active(&self) -> bool {
        self.state != SchedulerState::Idle
    }

    pub fn next_fire_at(&self) -> Option<Millis> {
        match self.state {
            SchedulerState::Scheduled { next_fire_at } => Some(next_fire_at),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn ticker(&self) -> Option<TimerHandle> {
        self.ticker
    }

    /// Begin auto mode. No-op while a strike is already pending.
    pub fn start<H: TimerHost>(&mut self, host: &mut H, audio_suspended: bool) {
        if self.timer.is_some() {
            return;
        }
        self.schedule_next(host, audio_suspended);
    }

    /// Leave auto mode, cancelling the pending strike and the countdown.
    pub fn stop<H: TimerHost>(&mut self, host: &mut H) {
        if let Some(timer) = self.timer.take() {
            host.clear_timeout(timer);
        }
        self.stop_ticker(host);
        if self.state != SchedulerState::Idle {
            log::debug!(target: "scheduler", "stopped");
        }
        self.state = SchedulerState::Idle;
    }

    /// Drop the pending strike and schedule afresh with `bounds`.
    pub fn restart<H: TimerHost>(
        &mut self,
        host: &mut H,
        bounds: ScheduleBounds,
        audio_suspended: bool,
    ) {
        self.stop(host);
        self.bounds = bounds;
        self.schedule_next(host, audio_suspended);
    }

    /// The audio context was resumed by a user gesture.
    pub fn unlocked<H: TimerHost>(&mut self, host: &mut H) {
        if self.state == SchedulerState::WaitingForUnlock {
            self.schedule_next(host, false);
        }
    }

    /// Handle a due one-shot timer. Returns true if a strike should play now;
    /// the next strike is already scheduled when this returns. Handles that
    /// were cancelled are ignored.
    pub fn on_timer<H: TimerHost>(
        &mut self,
        host: &mut H,
        handle: TimerHandle,
        audio_suspended: bool,
    ) -> bool {
        if self.timer != Some(handle) {
            log::debug!(target: "scheduler", "ignoring stale timer {:?}", handle);
            return false;
        }
        self.timer = None;
        self.schedule_next(host, audio_suspended);
        true
    }

    /// Whether `handle` is the live countdown ticker.
    pub fn owns_ticker(&self, handle: TimerHandle) -> bool {
        self.ticker == Some(handle)
    }

    /// Countdown readout at `now`: whole seconds left, rounded up.
    pub fn countdown_text(&self, now: Millis) -> String {
        match self.state {
            SchedulerState::Idle => IDLE_TEXT.to_string(),
            SchedulerState::WaitingForUnlock => UNLOCK_TEXT.to_string(),
            SchedulerState::Scheduled { next_fire_at } => {
                let remaining = next_fire_at.saturating_sub(now);
                remaining.div_ceil(1000).to_string()
            }
        }
    }

    fn schedule_next<H: TimerHost>(&mut self, host: &mut H, audio_suspended: bool) {
        if audio_suspended {
            log::debug!(target: "scheduler", "audio locked; waiting for a user gesture");
            if let Some(timer) = self.timer.take() {
                host.clear_timeout(timer);
            }
            self.stop_ticker(host);
            self.state = SchedulerState::WaitingForUnlock;
            return;
        }

        let delay_secs = sample_delay_secs(self.bounds, &mut self.delays);
        if let Some(timer) = self.timer.take() {
            host.clear_timeout(timer);
        }

        let ms = delay_secs as Millis * 1000;
        let next_fire_at = host.now_ms() + ms;
        self.timer = Some(host.set_timeout(ms));
        self.state = SchedulerState::Scheduled { next_fire_at };
        log::debug!(
            target: "scheduler",
            "next strike in {delay_secs}s (bounds {}..={})",
            self.bounds.min,
            self.bounds.max
        );

        self.start_ticker(host);
    }

    fn start_ticker<H: TimerHost>(&mut self, host: &mut H) {
        self.stop_ticker(host);
        self.ticker = Some(host.set_interval(self.countdown_interval_ms));
    }

    fn stop_ticker<H: TimerHost>(&mut self, host: &mut H) {
        if let Some(ticker) = self.ticker.take() {
            host.clear_interval(ticker);
        }
    }
}
