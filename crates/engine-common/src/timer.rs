//! Named timers fired by a [`crate::clock::TestClock`].

use engine_core::UnixNanos;
use ustr::Ustr;

/// A recurring or one-shot timer. `next_fire_ns` advances by `interval_ns` each time
/// it fires, up to `stop_ns` (if set), at which point the timer expires.
#[derive(Debug, Clone)]
pub struct TestTimer {
    pub name: Ustr,
    pub interval_ns: u64,
    pub start_ns: UnixNanos,
    pub next_fire_ns: UnixNanos,
    pub stop_ns: Option<UnixNanos>,
}

impl TestTimer {
    #[must_use]
    pub fn new(name: Ustr, interval_ns: u64, start_ns: UnixNanos, stop_ns: Option<UnixNanos>) -> Self {
        Self { name, interval_ns, start_ns, next_fire_ns: start_ns + interval_ns, stop_ns }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.stop_ns.is_some_and(|stop| self.next_fire_ns > stop)
    }

    /// Returns every fire event in `(prev_ns, to_ns]` and advances `next_fire_ns` past
    /// `to_ns`, to the first unfired multiple of `interval_ns`.
    pub fn advance(&mut self, to_ns: UnixNanos) -> Vec<TimeEvent> {
        let mut events = Vec::new();
        while self.next_fire_ns <= to_ns && !self.is_expired() {
            events.push(TimeEvent { name: self.name, ts_event: self.next_fire_ns });
            self.next_fire_ns += self.interval_ns;
        }
        events
    }
}

/// One firing of a named timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEvent {
    pub name: Ustr,
    pub ts_event: UnixNanos,
}

/// A fired [`TimeEvent`] paired with the callback identifier to invoke — the clock
/// itself is agnostic to what a callback does; the driver resolves and dispatches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEventHandler {
    pub event: TimeEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_advance_fires_multiple_intervals() {
        let mut timer = TestTimer::new(Ustr::from("t1"), 10, 0.into(), None);
        let events = timer.advance(25.into());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].ts_event, UnixNanos::from(10));
        assert_eq!(events[1].ts_event, UnixNanos::from(20));
        assert_eq!(timer.next_fire_ns, UnixNanos::from(30));
    }

    #[test]
    fn test_timer_expires_past_stop_ns() {
        let mut timer = TestTimer::new(Ustr::from("t1"), 10, 0.into(), Some(15.into()));
        let events = timer.advance(100.into());
        assert_eq!(events.len(), 1);
        assert!(timer.is_expired());
    }
}
