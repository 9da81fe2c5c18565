use engine_core::UnixNanos;
use strum::{AsRefStr, Display, EnumString};

use crate::{
    enums::OrderSide,
    identifiers::InstrumentId,
    types::{Price, Quantity},
};

#[derive(Copy, Clone, Debug, Display, Hash, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BookAction {
    Add,
    Update,
    Delete,
    Clear,
}

/// A single L2/L3 order book update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderBookDelta {
    pub instrument_id: InstrumentId,
    pub action: BookAction,
    pub side: OrderSide,
    pub price: Price,
    pub size: Quantity,
    pub order_id: u64,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}

/// A batch of [`OrderBookDelta`]s that must be applied atomically.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBookDeltas {
    pub instrument_id: InstrumentId,
    pub deltas: Vec<OrderBookDelta>,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}

impl OrderBookDeltas {
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    #[must_use]
    pub fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}
