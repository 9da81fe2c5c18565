//! Batches fired timer events from multiple clocks (one per venue) before dispatch,
//! keeping cross-venue timer ties deterministic (§4.G).

use engine_core::UnixNanos;

use crate::{clock::TestClock, timer::TimeEventHandler};

#[derive(Debug, Default)]
pub struct TimeEventAccumulator {
    handlers: Vec<TimeEventHandler>,
}

impl TimeEventAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Advances `clock` to `to_ns` and stores its fired events without dispatching them.
    pub fn advance_clock(&mut self, clock: &mut TestClock, to_ns: UnixNanos) {
        self.handlers.extend(clock.advance_time(to_ns));
    }

    /// Drains every accumulated handler in ascending `(ts_event, timer_name)` order.
    pub fn drain(&mut self) -> Vec<TimeEventHandler> {
        let mut handlers = std::mem::take(&mut self.handlers);
        handlers.sort_by(|a, b| a.event.ts_event.cmp(&b.event.ts_event).then_with(|| a.event.name.cmp(&b.event.name)));
        handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_sorted_across_clocks() {
        let mut acc = TimeEventAccumulator::new();
        let mut clock_a = TestClock::new();
        let mut clock_b = TestClock::new();
        clock_a.set_timer("venue_a_timer", 10, None);
        clock_b.set_timer("venue_b_timer", 10, None);

        acc.advance_clock(&mut clock_a, 10.into());
        acc.advance_clock(&mut clock_b, 10.into());

        let drained = acc.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].event.name.as_str(), "venue_a_timer");
        assert_eq!(drained[1].event.name.as_str(), "venue_b_timer");
        assert!(acc.drain().is_empty());
    }
}
