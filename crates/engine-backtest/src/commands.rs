//! Trading commands the driver submits to a [`crate::exchange::SimulatedExchange`]
//! (§6 external interfaces), scoped to the four command kinds the core processes.
//! Modelled on the teacher's `nautilus_common::messages::execution::TradingCommand`,
//! minus the client-routing fields a multi-client execution stack needs and this
//! single-venue core does not.

use engine_core::UnixNanos;
use engine_model::{
    identifiers::{ClientOrderId, InstrumentId},
    orders::OrderAny,
    types::Price,
};

/// One trading command, stamped with the `ts_init` it was submitted at; the
/// exchange's latency model turns that into a `ready_ns` on entry to its queue.
#[derive(Clone, Debug)]
pub enum TradingCommand {
    SubmitOrder {
        order: OrderAny,
        ts_init: UnixNanos,
    },
    ModifyOrder {
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        new_price: Option<Price>,
        new_trigger_price: Option<Price>,
        ts_init: UnixNanos,
    },
    CancelOrder {
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        ts_init: UnixNanos,
    },
    CancelAllOrders {
        instrument_id: InstrumentId,
        ts_init: UnixNanos,
    },
}

impl TradingCommand {
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            Self::SubmitOrder { order, .. } => order.instrument_id(),
            Self::ModifyOrder { instrument_id, .. }
            | Self::CancelOrder { instrument_id, .. }
            | Self::CancelAllOrders { instrument_id, .. } => *instrument_id,
        }
    }

    #[must_use]
    pub fn ts_init(&self) -> UnixNanos {
        match self {
            Self::SubmitOrder { ts_init, .. }
            | Self::ModifyOrder { ts_init, .. }
            | Self::CancelOrder { ts_init, .. }
            | Self::CancelAllOrders { ts_init, .. } => *ts_init,
        }
    }

    /// Which of the latency model's four offsets applies to this command kind (§4.B).
    #[must_use]
    pub fn latency_ns(&self, latency_model: &engine_execution::LatencyModel) -> u64 {
        match self {
            Self::SubmitOrder { .. } => latency_model.insert_latency(),
            Self::ModifyOrder { .. } => latency_model.update_latency(),
            Self::CancelOrder { .. } | Self::CancelAllOrders { .. } => latency_model.delete_latency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_model::{
        enums::{ContingencyType, OrderSide, OrderStatus, TimeInForce},
        identifiers::StrategyId,
        orders::{OrderCommon, OrderKind},
        types::Quantity,
    };

    use super::*;

    fn order() -> OrderAny {
        let common = OrderCommon {
            client_order_id: ClientOrderId::new("O-1"),
            venue_order_id: None,
            instrument_id: InstrumentId::from("EUR/USD.SIM"),
            strategy_id: StrategyId::new("S-001"),
            side: OrderSide::Buy,
            quantity: Quantity::new(100.0, 0),
            filled_qty: Quantity::zero(0),
            avg_px: None,
            time_in_force: TimeInForce::Gtc,
            expire_time_ns: 0.into(),
            status: OrderStatus::Initialized,
            is_post_only: false,
            is_reduce_only: false,
            contingency_type: ContingencyType::NoContingency,
            linked_order_ids: Vec::new(),
            parent_order_id: None,
            position_id: None,
            liquidity_side: None,
            init_id: engine_core::UUID4::new(),
            ts_init: 5.into(),
            ts_last: 0.into(),
        };
        OrderAny::new(common, OrderKind::Market)
    }

    #[test]
    fn test_submit_order_instrument_id_and_ts_init() {
        let cmd =
            TradingCommand::SubmitOrder { order: order(), ts_init: engine_core::UnixNanos::from(5u64) };
        assert_eq!(cmd.instrument_id(), InstrumentId::from("EUR/USD.SIM"));
        assert_eq!(cmd.ts_init(), engine_core::UnixNanos::from(5u64));
    }

    #[test]
    fn test_latency_ns_selects_offset_by_kind() {
        let model = engine_execution::LatencyModel::new(1_000, 100, 200, 300);
        let cancel = TradingCommand::CancelOrder {
            instrument_id: InstrumentId::from("EUR/USD.SIM"),
            client_order_id: ClientOrderId::new("O-1"),
            ts_init: 0.into(),
        };
        assert_eq!(cancel.latency_ns(&model), 1_300);
    }
}
