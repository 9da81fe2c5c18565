use engine_core::UnixNanos;

use crate::{
    identifiers::InstrumentId,
    types::{Price, Quantity},
};

/// A top-of-book (or synthesised) bid/ask quote, `ts_init` always `>= ts_event`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuoteTick {
    pub instrument_id: InstrumentId,
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_size: Quantity,
    pub ask_size: Quantity,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}

impl QuoteTick {
    #[must_use]
    pub fn new(
        instrument_id: InstrumentId,
        bid_price: Price,
        ask_price: Price,
        bid_size: Quantity,
        ask_size: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        debug_assert!(ts_init >= ts_event, "ts_init must be >= ts_event");
        Self {
            instrument_id,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            ts_event,
            ts_init,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_quote_tick() {
        let id = InstrumentId::from("EUR/USD.SIM");
        let q = QuoteTick::new(
            id,
            Price::new(1.1, 5),
            Price::new(1.10002, 5),
            Quantity::new(1000.0, 0),
            Quantity::new(1000.0, 0),
            1.into(),
            1.into(),
        );
        assert_eq!(q.instrument_id, id);
    }
}
