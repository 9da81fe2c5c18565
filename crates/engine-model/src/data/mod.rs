//! Market data types consumed by the matching engine and the data producer.

mod bar;
mod delta;
mod generic;
mod quote;
mod status;
mod trade;

pub use bar::{Bar, BarAggregation};
pub use delta::{BookAction, OrderBookDelta, OrderBookDeltas};
use engine_core::UnixNanos;
pub use generic::GenericData;
pub use quote::QuoteTick;
pub use status::InstrumentStatus;
pub use trade::TradeTick;

use crate::identifiers::InstrumentId;

/// Returns the timestamp a data item was received by the core, used as the
/// merge/tie-break key by the data producer (§4.F) and matching engine ordering (§8.3).
pub trait HasTsInit {
    fn ts_init(&self) -> UnixNanos;
    /// `None` only for [`Data::Generic`] items with no associated instrument.
    fn instrument_id(&self) -> Option<InstrumentId>;
}

/// A tagged union over every market data variant the producer can emit, mirroring the
/// teacher's closed `Data` enum so the merge iterator can hold one homogeneous stream.
#[derive(Clone, Debug)]
pub enum Data {
    Quote(QuoteTick),
    Trade(TradeTick),
    Bar(Bar),
    Delta(OrderBookDelta),
    Deltas(OrderBookDeltas),
    InstrumentStatus(InstrumentStatus),
    Generic(GenericData),
}

impl HasTsInit for Data {
    fn ts_init(&self) -> UnixNanos {
        match self {
            Self::Quote(d) => d.ts_init,
            Self::Trade(d) => d.ts_init,
            Self::Bar(d) => d.ts_init,
            Self::Delta(d) => d.ts_init,
            Self::Deltas(d) => d.ts_init(),
            Self::InstrumentStatus(d) => d.ts_init,
            Self::Generic(d) => d.ts_init,
        }
    }

    fn instrument_id(&self) -> Option<InstrumentId> {
        match self {
            Self::Quote(d) => Some(d.instrument_id),
            Self::Trade(d) => Some(d.instrument_id),
            Self::Bar(d) => Some(d.instrument_id),
            Self::Delta(d) => Some(d.instrument_id),
            Self::Deltas(d) => Some(d.instrument_id()),
            Self::InstrumentStatus(d) => Some(d.instrument_id),
            Self::Generic(d) => d.instrument_id,
        }
    }
}
