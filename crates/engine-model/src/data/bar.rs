use engine_core::UnixNanos;
use strum::{AsRefStr, Display, EnumString};

use crate::{
    enums::PriceType,
    identifiers::InstrumentId,
    types::{Price, Quantity},
};

#[derive(Copy, Clone, Debug, Display, Hash, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BarAggregation {
    Second,
    Minute,
    Hour,
    Day,
}

/// An OHLCV summary bar. `price_type` indicates whether this bar's prices were
/// aggregated from `BID`, `ASK`, `MID`, or `LAST` ticks (§4.D.1 bar synthesis).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bar {
    pub instrument_id: InstrumentId,
    pub aggregation: BarAggregation,
    pub price_type: PriceType,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}
