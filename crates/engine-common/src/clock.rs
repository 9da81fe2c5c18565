//! A logical [`TestClock`] advanced stepwise by the backtest driver (§4.G).

use std::collections::BTreeMap;

use engine_core::UnixNanos;
use ustr::Ustr;

use crate::timer::{TestTimer, TimeEventHandler};

/// Logical clock owned by one simulated venue. Timers are keyed in a `BTreeMap` so
/// iteration is lexicographic by name, giving the deterministic `(fire_ns, timer_name)`
/// tie-break §4.G requires without an extra sort key.
#[derive(Debug, Default)]
pub struct TestClock {
    time_ns: UnixNanos,
    timers: BTreeMap<Ustr, TestTimer>,
}

impl TestClock {
    #[must_use]
    pub fn new() -> Self {
        Self { time_ns: 0.into(), timers: BTreeMap::new() }
    }

    #[must_use]
    pub fn timestamp_ns(&self) -> UnixNanos {
        self.time_ns
    }

    pub fn set_time(&mut self, to_ns: UnixNanos) {
        self.time_ns = to_ns;
    }

    pub fn set_timer(&mut self, name: &str, interval_ns: u64, stop_ns: Option<UnixNanos>) {
        let timer = TestTimer::new(Ustr::from(name), interval_ns, self.time_ns, stop_ns);
        self.timers.insert(timer.name, timer);
    }

    pub fn cancel_timer(&mut self, name: &str) {
        self.timers.remove(&Ustr::from(name));
    }

    /// Advances the clock to `to_ns`, returning every timer firing in `(prev_ns, to_ns]`
    /// in ascending `(fire_ns, timer_name)` order, then sets `time_ns = to_ns`.
    ///
    /// # Panics
    ///
    /// Panics if `to_ns` is before the clock's current time (time must be non-decreasing).
    pub fn advance_time(&mut self, to_ns: UnixNanos) -> Vec<TimeEventHandler> {
        assert!(
            to_ns >= self.time_ns,
            "`to_ns` {to_ns} was < current clock time {}",
            self.time_ns
        );

        let mut handlers = Vec::new();
        self.timers.retain(|_, timer| {
            for event in timer.advance(to_ns) {
                handlers.push(TimeEventHandler { event });
            }
            !timer.is_expired()
        });

        // BTreeMap iteration is already name-ascending; a stable sort on ts_event
        // alone preserves that name tie-break, giving (ts_event, name) overall.
        handlers.sort_by_key(|h| h.event.ts_event);

        self.time_ns = to_ns;
        handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_time_orders_ties_by_timer_name() {
        let mut clock = TestClock::new();
        clock.set_timer("zeta", 10, None);
        clock.set_timer("alpha", 10, None);
        let handlers = clock.advance_time(10.into());
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].event.name.as_str(), "alpha");
        assert_eq!(handlers[1].event.name.as_str(), "zeta");
    }

    #[test]
    #[should_panic]
    fn test_advance_time_backwards_panics() {
        let mut clock = TestClock::new();
        clock.set_time(100.into());
        clock.advance_time(50.into());
    }

    #[test]
    fn test_expired_timer_is_removed() {
        let mut clock = TestClock::new();
        clock.set_timer("one-shot", 10, Some(10.into()));
        let handlers = clock.advance_time(10.into());
        assert_eq!(handlers.len(), 1);
        let handlers = clock.advance_time(20.into());
        assert!(handlers.is_empty());
    }
}
