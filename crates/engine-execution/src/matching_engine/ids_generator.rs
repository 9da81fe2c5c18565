//! Deterministic venue order id / trade id / position id generation (§4.D.1).
//!
//! Every id is a monotonically increasing counter rendered with a venue prefix,
//! so replaying the same command sequence against the same seed always produces
//! the same ids — required for the bit-exact replay invariant (§8).

use engine_model::identifiers::{InstrumentId, PositionId, TradeId, VenueOrderId};

#[derive(Debug)]
pub struct IdsGenerator {
    venue_order_id_count: u64,
    trade_id_count: u64,
    position_id_count: u64,
}

impl IdsGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self { venue_order_id_count: 0, trade_id_count: 0, position_id_count: 0 }
    }

    pub fn generate_venue_order_id(&mut self) -> VenueOrderId {
        self.venue_order_id_count += 1;
        VenueOrderId::new(&format!("V-{}", self.venue_order_id_count))
    }

    pub fn generate_trade_id(&mut self) -> TradeId {
        self.trade_id_count += 1;
        TradeId::new(&format!("T-{}", self.trade_id_count))
    }

    /// Position ids are scoped per-instrument (one net position per instrument
    /// under `OmsType::Netting`), so the id embeds the instrument symbol.
    pub fn generate_position_id(&mut self, instrument_id: InstrumentId) -> PositionId {
        self.position_id_count += 1;
        PositionId::new(&format!("P-{}-{}", instrument_id.symbol, self.position_id_count))
    }

    pub fn reset(&mut self) {
        self.venue_order_id_count = 0;
        self.trade_id_count = 0;
        self.position_id_count = 0;
    }
}

impl Default for IdsGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_prefixed() {
        let mut gen = IdsGenerator::new();
        assert_eq!(gen.generate_venue_order_id().as_str(), "V-1");
        assert_eq!(gen.generate_venue_order_id().as_str(), "V-2");
        assert_eq!(gen.generate_trade_id().as_str(), "T-1");
    }

    #[test]
    fn test_reset_restarts_counters() {
        let mut gen = IdsGenerator::new();
        gen.generate_venue_order_id();
        gen.reset();
        assert_eq!(gen.generate_venue_order_id().as_str(), "V-1");
    }
}
