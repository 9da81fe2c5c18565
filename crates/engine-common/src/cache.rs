//! A read-mostly store of instruments, orders, positions, and account state (§4.J).
//!
//! Shared via `Rc<RefCell<_>>` rather than `Arc<Mutex<_>>`: the core is single-threaded
//! cooperative (§5), so no atomic/lock-based sharing is needed.

use std::collections::HashMap;

use engine_model::{
    accounts::AccountState,
    identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId},
    instruments::InstrumentAny,
    orders::OrderAny,
    position::Position,
};

#[derive(Debug, Default)]
pub struct Cache {
    instruments: HashMap<InstrumentId, InstrumentAny>,
    orders: HashMap<ClientOrderId, OrderAny>,
    positions: HashMap<PositionId, Position>,
    account_states: HashMap<AccountId, AccountState>,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instrument(&mut self, instrument: InstrumentAny) {
        self.instruments.insert(engine_model::instruments::Instrument::id(&instrument), instrument);
    }

    #[must_use]
    pub fn instrument(&self, id: InstrumentId) -> Option<&InstrumentAny> {
        self.instruments.get(&id)
    }

    pub fn add_order(&mut self, order: OrderAny) {
        self.orders.insert(order.client_order_id(), order);
    }

    #[must_use]
    pub fn order(&self, id: ClientOrderId) -> Option<&OrderAny> {
        self.orders.get(&id)
    }

    pub fn order_mut(&mut self, id: ClientOrderId) -> Option<&mut OrderAny> {
        self.orders.get_mut(&id)
    }

    pub fn update_position(&mut self, position: Position) {
        if position.is_closed() {
            self.positions.remove(&position.position_id);
        } else {
            self.positions.insert(position.position_id, position);
        }
    }

    #[must_use]
    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Open positions for `instrument_id`, used by reduce-only validation (§4.D.2).
    #[must_use]
    pub fn positions_open_for(&self, instrument_id: InstrumentId) -> Vec<&Position> {
        self.positions.values().filter(|p| p.instrument_id == instrument_id && !p.is_closed()).collect()
    }

    pub fn update_account_state(&mut self, state: AccountState) {
        self.account_states.insert(state.account_id, state);
    }

    #[must_use]
    pub fn account_state(&self, id: AccountId) -> Option<&AccountState> {
        self.account_states.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_model::{
        enums::{ContingencyType, OrderSide, OrderStatus, TimeInForce},
        identifiers::StrategyId,
        orders::{OrderCommon, OrderKind},
        types::Quantity,
    };

    fn test_order() -> OrderAny {
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
            ts_init: 0.into(),
            ts_last: 0.into(),
        };
        OrderAny::new(common, OrderKind::Market)
    }

    #[test]
    fn test_add_and_get_order() {
        let mut cache = Cache::new();
        let order = test_order();
        let id = order.client_order_id();
        cache.add_order(order);
        assert!(cache.order(id).is_some());
    }
}
