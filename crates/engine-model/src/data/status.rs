use engine_core::UnixNanos;

use crate::{enums::MarketStatusAction, identifiers::InstrumentId};

/// A trading-session transition for one instrument (§6 `InstrumentStatus`), routed
/// straight to that instrument's matching engine rather than the message bus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstrumentStatus {
    pub instrument_id: InstrumentId,
    pub action: MarketStatusAction,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}
