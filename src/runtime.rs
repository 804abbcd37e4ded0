//! Native page runtime: real timers on tokio, events over an mpsc channel.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::config::GongConfig;
use crate::page::GongPage;
use crate::scheduler::DelaySource;
use crate::settings::KeyValueStore;
use crate::timer::{Millis, TimerEvent, TimerHandle, TimerHost, TimerKind};

/// Everything a page reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Timer(TimerEvent),
    PointerDown,
    TestStrike,
    ToggleAuto(bool),
    Engage,
    SetLower(String),
    SetUpper(String),
    SetVolume(f64),
    SetTone(f64),
    SetDampen(f64),
    Shutdown,
}

pub fn channel() -> (UnboundedSender<PageEvent>, UnboundedReceiver<PageEvent>) {
    unbounded_channel()
}

/// Timer host whose timers are tokio tasks posting [`PageEvent::Timer`].
///
/// Cancelling aborts the task; an event already queued when its timer was
/// cancelled still arrives and is ignored by the scheduler's handle check.
pub struct TokioTimers {
    events: UnboundedSender<PageEvent>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
    epoch: Instant,
}

impl TokioTimers {
    /// Must be called inside a tokio runtime.
    pub fn new(events: UnboundedSender<PageEvent>) -> Self {
        TokioTimers {
            events,
            tasks: HashMap::new(),
            next_id: 0,
            epoch: Instant::now(),
        }
    }

    fn next_handle(&mut self) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());
        self.next_id += 1;
        TimerHandle(self.next_id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl TimerHost for TokioTimers {
    fn now_ms(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }

    fn set_timeout(&mut self, delay_ms: Millis) -> TimerHandle {
        let handle = self.next_handle();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = events.send(PageEvent::Timer(TimerEvent {
                handle,
                kind: TimerKind::Timeout,
            }));
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.cancel(handle);
    }

    fn set_interval(&mut self, period_ms: Millis) -> TimerHandle {
        let handle = self.next_handle();
        let events = self.events.clone();
        let period = Duration::from_millis(period_ms.max(1));
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let event = PageEvent::Timer(TimerEvent {
                    handle,
                    kind: TimerKind::Interval,
                });
                if events.send(event).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        self.cancel(handle);
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// A page configured from the user config file, with timers posting to
/// `events`. Must be called inside a tokio runtime.
pub fn open_page<S: KeyValueStore>(
    events: UnboundedSender<PageEvent>,
    store: S,
    seed: u64,
) -> GongPage<TokioTimers, S, SmallRng> {
    let config = GongConfig::load();
    GongPage::new(
        &config,
        TokioTimers::new(events),
        store,
        SmallRng::seed_from_u64(seed),
        seed,
    )
}

/// Initialise `page` and process events until [`PageEvent::Shutdown`].
pub async fn run_page<S, D>(
    mut page: GongPage<TokioTimers, S, D>,
    mut events: UnboundedReceiver<PageEvent>,
) -> GongPage<TokioTimers, S, D>
where
    S: KeyValueStore,
    D: DelaySource,
{
    page.init();
    log::info!(target: "runtime", "page running");
    while let Some(event) = events.recv().await {
        match event {
            PageEvent::Timer(timer) => page.timer_fired(timer),
            PageEvent::PointerDown => page.pointer_down(),
            PageEvent::TestStrike => page.test_strike(),
            PageEvent::ToggleAuto(checked) => page.toggle_auto(checked),
            PageEvent::Engage => page.engage(),
            PageEvent::SetLower(text) => page.set_lower(&text),
            PageEvent::SetUpper(text) => page.set_upper(&text),
            PageEvent::SetVolume(v) => page.set_volume(v),
            PageEvent::SetTone(v) => page.set_tone(v),
            PageEvent::SetDampen(v) => page.set_dampen(v),
            PageEvent::Shutdown => break,
        }
    }
    log::info!(target: "runtime", "page stopped");
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn config() -> GongConfig {
        GongConfig {
            start_suspended: false,
            sample_rate: 8000,
            ..GongConfig::default()
        }
    }

    fn shutdown_after(tx: &UnboundedSender<PageEvent>, ms: u64) {
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            let _ = tx.send(PageEvent::Shutdown);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_bounds_strike_on_schedule() {
        let (tx, rx) = channel();
        let page = GongPage::new(
            &config(),
            TokioTimers::new(tx.clone()),
            MemoryStore::new(),
            SmallRng::seed_from_u64(1),
            1,
        );
        tx.send(PageEvent::SetLower("5".into())).unwrap();
        tx.send(PageEvent::SetUpper("5".into())).unwrap();
        tx.send(PageEvent::ToggleAuto(true)).unwrap();
        shutdown_after(&tx, 17_500);

        let mut page = run_page(page, rx).await;
        assert_eq!(page.synth().strikes_started(), 3);
        assert_eq!(page.controls.next_local, "3");
    }

    #[tokio::test(start_paused = true)]
    async fn disengage_stops_strikes() {
        let (tx, rx) = channel();
        let page = GongPage::new(
            &config(),
            TokioTimers::new(tx.clone()),
            MemoryStore::new(),
            SmallRng::seed_from_u64(2),
            1,
        );
        tx.send(PageEvent::SetLower("1".into())).unwrap();
        tx.send(PageEvent::SetUpper("1".into())).unwrap();
        tx.send(PageEvent::Engage).unwrap();
        tx.send(PageEvent::Engage).unwrap();
        shutdown_after(&tx, 10_000);

        let mut page = run_page(page, rx).await;
        assert_eq!(page.synth().strikes_started(), 1);
        assert!(!page.scheduler().is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn opened_page_runs_until_shutdown() {
        let (tx, rx) = channel();
        let page = open_page(tx.clone(), MemoryStore::new(), 3);
        tx.send(PageEvent::SetVolume(0.2)).unwrap();
        tx.send(PageEvent::Shutdown).unwrap();

        let mut page = run_page(page, rx).await;
        assert_eq!(page.controls.volume, 0.2);
        assert_eq!(page.synth().strikes_started(), 0);
        let key = page.settings().key().to_string();
        let saved = page.settings().store().get(&key).unwrap().unwrap();
        assert!(saved.contains("\"volume\":0.2"));
    }
}
