use engine_core::UnixNanos;

use crate::identifiers::InstrumentId;

/// An opaque, strategy-defined data item (§1: strategy/indicator code is an external
/// collaborator). The core only needs enough shape to route it to the message bus
/// under `data.{type_name}` (§4.H) — the payload itself is never interpreted here.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericData {
    pub type_name: String,
    pub instrument_id: Option<InstrumentId>,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}
