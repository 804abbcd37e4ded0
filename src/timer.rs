//! Timer host abstraction and a deterministic virtual-clock implementation.
//!
//! The scheduler never owns a clock; it asks a [`TimerHost`] for the time and
//! for one-shot and periodic timers, and the host later delivers a
//! [`TimerEvent`] carrying the handle it returned.

use std::collections::BTreeMap;

/// Milliseconds on the host's clock.
pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub handle: TimerHandle,
    pub kind: TimerKind,
}

pub trait TimerHost {
    fn now_ms(&self) -> Millis;
    fn set_timeout(&mut self, delay_ms: Millis) -> TimerHandle;
    fn clear_timeout(&mut self, handle: TimerHandle);
    fn set_interval(&mut self, period_ms: Millis) -> TimerHandle;
    fn clear_interval(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone)]
struct Pending {
    deadline: Millis,
    period: Option<Millis>,
}

/// Timer host driven by an externally supplied clock.
///
/// Used by the WASM page (advanced from the browser's animation/interval
/// callbacks) and by tests.
#[derive(Debug, Default)]
pub struct VirtualTimers {
    now: Millis,
    next_id: u64,
    pending: BTreeMap<TimerHandle, Pending>,
    timeouts_armed: u64,
    timeouts_cleared: u64,
}

impl VirtualTimers {
    pub fn new(now: Millis) -> Self {
        VirtualTimers {
            now,
            ..Default::default()
        }
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline. Intervals are re-armed one period later. Returns `None`
    /// once nothing is due, leaving the clock at `until`.
    pub fn next_due(&mut self, until: Millis) -> Option<TimerEvent> {
        let due = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= until)
            .min_by_key(|(h, p)| (p.deadline, **h))
            .map(|(h, p)| (*h, p.deadline));
        let Some((handle, deadline)) = due else {
            self.set_now(until);
            return None;
        };

        self.now = self.now.max(deadline);
        let kind = match self.pending.get_mut(&handle) {
            Some(Pending {
                deadline,
                period: Some(period),
            }) => {
                *deadline += *period;
                TimerKind::Interval
            }
            _ => {
                self.pending.remove(&handle);
                TimerKind::Timeout
            }
        };
        Some(TimerEvent { handle, kind })
    }

    /// Move the clock forward without delivering anything.
    pub fn set_now(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }

    /// Number of timers currently armed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn timeouts_armed(&self) -> u64 {
        self.timeouts_armed
    }

    pub fn timeouts_cleared(&self) -> u64 {
        self.timeouts_cleared
    }

    fn arm(&mut self, delay: Millis, period: Option<Millis>) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.insert(
            handle,
            Pending {
                deadline: self.now + delay,
                period,
            },
        );
        handle
    }
}

impl TimerHost for VirtualTimers {
    fn now_ms(&self) -> Millis {
        self.now
    }

    fn set_timeout(&mut self, delay_ms: Millis) -> TimerHandle {
        self.timeouts_armed += 1;
        self.arm(delay_ms, None)
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        if self.pending.remove(&handle).is_some() {
            self.timeouts_cleared += 1;
        }
    }

    fn set_interval(&mut self, period_ms: Millis) -> TimerHandle {
        self.arm(period_ms.max(1), Some(period_ms.max(1)))
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_fires_once_at_deadline() {
        let mut t = VirtualTimers::new(1000);
        let h = t.set_timeout(500);
        assert_eq!(t.next_due(1499), None);
        assert_eq!(
            t.next_due(1500),
            Some(TimerEvent {
                handle: h,
                kind: TimerKind::Timeout
            })
        );
        assert_eq!(t.now_ms(), 1500);
        assert_eq!(t.next_due(10_000), None);
    }

    #[test]
    fn interval_repeats() {
        let mut t = VirtualTimers::new(0);
        let h = t.set_interval(200);
        let mut n = 0;
        while let Some(ev) = t.next_due(1000) {
            assert_eq!(ev.handle, h);
            assert_eq!(ev.kind, TimerKind::Interval);
            n += 1;
        }
        assert_eq!(n, 5);
        t.clear_interval(h);
        assert_eq!(t.pending(), 0);
    }

    #[test]
    fn events_come_in_deadline_order() {
        let mut t = VirtualTimers::new(0);
        let late = t.set_timeout(300);
        let early = t.set_timeout(100);
        assert_eq!(t.next_due(1000).map(|e| e.handle), Some(early));
        assert_eq!(t.next_due(1000).map(|e| e.handle), Some(late));
    }

    #[test]
    fn cleared_timeout_never_fires() {
        let mut t = VirtualTimers::new(0);
        let h = t.set_timeout(100);
        t.clear_timeout(h);
        t.clear_timeout(h);
        assert_eq!(t.timeouts_cleared(), 1);
        assert_eq!(t.next_due(1000), None);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut t = VirtualTimers::new(500);
        t.set_now(100);
        assert_eq!(t.now_ms(), 500);
    }
}
