//! The order type hierarchy, modelled as `OrderCommon` + a closed `OrderKind` tag
//! rather than inheritance, so the matching engine dispatches on a single `match`.

pub mod events;
mod state;

pub use events::OrderEventAny;
pub use state::OrderStatusError;

use engine_core::UnixNanos;

use crate::{
    enums::{ContingencyType, LiquiditySide, OrderSide, OrderStatus, OrderType, TimeInForce},
    identifiers::{ClientOrderId, InstrumentId, PositionId, StrategyId, VenueOrderId},
    types::{Price, Quantity},
};

/// Price/trigger-price/offset fields specific to one order type, embedded in
/// [`OrderAny`] alongside the fields every order shares (`OrderCommon`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OrderKind {
    Market,
    MarketToLimit,
    Limit { price: Price },
    StopMarket { trigger_price: Price },
    StopLimit { price: Price, trigger_price: Price },
    MarketIfTouched { trigger_price: Price },
    LimitIfTouched { price: Price, trigger_price: Price },
    TrailingStopMarket { trigger_price: Option<Price>, trailing_offset: Price },
    TrailingStopLimit { price: Option<Price>, trigger_price: Option<Price>, trailing_offset: Price },
}

impl OrderKind {
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        match self {
            Self::Market => OrderType::Market,
            Self::MarketToLimit => OrderType::MarketToLimit,
            Self::Limit { .. } => OrderType::Limit,
            Self::StopMarket { .. } => OrderType::StopMarket,
            Self::StopLimit { .. } => OrderType::StopLimit,
            Self::MarketIfTouched { .. } => OrderType::MarketIfTouched,
            Self::LimitIfTouched { .. } => OrderType::LimitIfTouched,
            Self::TrailingStopMarket { .. } => OrderType::TrailingStopMarket,
            Self::TrailingStopLimit { .. } => OrderType::TrailingStopLimit,
        }
    }

    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self {
            Self::Limit { price } | Self::StopLimit { price, .. } => Some(*price),
            Self::LimitIfTouched { price, .. } => Some(*price),
            Self::TrailingStopLimit { price, .. } => *price,
            _ => None,
        }
    }

    #[must_use]
    pub const fn trigger_price(&self) -> Option<Price> {
        match self {
            Self::StopMarket { trigger_price } | Self::StopLimit { trigger_price, .. } => Some(*trigger_price),
            Self::MarketIfTouched { trigger_price } | Self::LimitIfTouched { trigger_price, .. } => {
                Some(*trigger_price)
            }
            Self::TrailingStopMarket { trigger_price, .. } => *trigger_price,
            Self::TrailingStopLimit { trigger_price, .. } => *trigger_price,
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_passive(&self) -> bool {
        !matches!(self, Self::Market | Self::MarketToLimit)
    }

    #[must_use]
    pub const fn is_stop(&self) -> bool {
        matches!(
            self,
            Self::StopMarket { .. }
                | Self::StopLimit { .. }
                | Self::MarketIfTouched { .. }
                | Self::LimitIfTouched { .. }
                | Self::TrailingStopMarket { .. }
                | Self::TrailingStopLimit { .. }
        )
    }

    /// Sets the computed initial trigger price for a trailing-stop order (§4.D.2).
    pub fn set_trailing_trigger(&mut self, computed: Price) {
        match self {
            Self::TrailingStopMarket { trigger_price, .. } => *trigger_price = Some(computed),
            Self::TrailingStopLimit { trigger_price, .. } => *trigger_price = Some(computed),
            _ => {}
        }
    }

    /// Re-prices a passive order in place, used by `process_modify` (§4.D.2).
    pub fn reprice(&mut self, new_price: Option<Price>, new_trigger_price: Option<Price>) {
        match self {
            Self::Limit { price } => {
                if let Some(p) = new_price {
                    *price = p;
                }
            }
            Self::StopMarket { trigger_price } => {
                if let Some(t) = new_trigger_price {
                    *trigger_price = t;
                }
            }
            Self::StopLimit { price, trigger_price } => {
                if let Some(p) = new_price {
                    *price = p;
                }
                if let Some(t) = new_trigger_price {
                    *trigger_price = t;
                }
            }
            Self::MarketIfTouched { trigger_price } => {
                if let Some(t) = new_trigger_price {
                    *trigger_price = t;
                }
            }
            Self::LimitIfTouched { price, trigger_price } => {
                if let Some(p) = new_price {
                    *price = p;
                }
                if let Some(t) = new_trigger_price {
                    *trigger_price = t;
                }
            }
            _ => {}
        }
    }
}

/// Fields shared by every order variant.
#[derive(Clone, Debug)]
pub struct OrderCommon {
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub instrument_id: InstrumentId,
    pub strategy_id: StrategyId,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub filled_qty: Quantity,
    pub avg_px: Option<f64>,
    pub time_in_force: TimeInForce,
    pub expire_time_ns: UnixNanos,
    pub status: OrderStatus,
    pub is_post_only: bool,
    pub is_reduce_only: bool,
    pub contingency_type: ContingencyType,
    pub linked_order_ids: Vec<ClientOrderId>,
    pub parent_order_id: Option<ClientOrderId>,
    pub position_id: Option<PositionId>,
    pub liquidity_side: Option<LiquiditySide>,
    pub init_id: engine_core::UUID4,
    pub ts_init: UnixNanos,
    pub ts_last: UnixNanos,
}

/// A concrete order: the fields every order shares plus its type-specific [`OrderKind`].
#[derive(Clone, Debug)]
pub struct OrderAny {
    pub common: OrderCommon,
    pub kind: OrderKind,
}

impl OrderAny {
    #[must_use]
    pub fn new(common: OrderCommon, kind: OrderKind) -> Self {
        Self { common, kind }
    }

    #[must_use]
    pub fn order_type(&self) -> OrderType {
        self.kind.order_type()
    }

    #[must_use]
    pub fn client_order_id(&self) -> ClientOrderId {
        self.common.client_order_id
    }

    #[must_use]
    pub fn venue_order_id(&self) -> Option<VenueOrderId> {
        self.common.venue_order_id
    }

    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        self.common.instrument_id
    }

    #[must_use]
    pub fn side(&self) -> OrderSide {
        self.common.side
    }

    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.common.quantity
    }

    #[must_use]
    pub fn filled_qty(&self) -> Quantity {
        self.common.filled_qty
    }

    /// `leaves_qty = quantity - filled_qty` (§3 invariant 1).
    #[must_use]
    pub fn leaves_qty(&self) -> Quantity {
        self.common.quantity - self.common.filled_qty
    }

    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.common.status
    }

    #[must_use]
    pub fn liquidity_side(&self) -> Option<LiquiditySide> {
        self.common.liquidity_side
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.common.status.is_open()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.common.status.is_terminal()
    }

    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.kind.is_passive()
    }

    #[must_use]
    pub fn price(&self) -> Option<Price> {
        self.kind.price()
    }

    #[must_use]
    pub fn trigger_price(&self) -> Option<Price> {
        self.kind.trigger_price()
    }

    /// The price a resting limit order matches at; stops use [`Self::trigger_price`].
    #[must_use]
    pub fn limit_price(&self) -> Option<Price> {
        match self.kind {
            OrderKind::Limit { price } => Some(price),
            OrderKind::StopLimit { price, .. } if self.common.status == OrderStatus::Triggered => Some(price),
            OrderKind::LimitIfTouched { price, .. } if self.common.status == OrderStatus::Triggered => Some(price),
            _ => None,
        }
    }

    /// Transitions `status` and records `ts_last`; panics on a backwards transition
    /// (§7 invariant violation: status backtrack is a programmer error, not a rejection).
    pub fn set_status(&mut self, new_status: OrderStatus, ts: UnixNanos) {
        state::validate_transition(self.common.status, new_status);
        self.common.status = new_status;
        self.common.ts_last = ts;
    }

    /// Applies a fill, updating `filled_qty`/`status`/`liquidity_side`/`avg_px`.
    ///
    /// # Panics
    ///
    /// Panics if `fill_qty` would push `filled_qty` above `quantity` (§3 invariant 1).
    pub fn apply_fill(&mut self, fill_qty: Quantity, fill_px: Price, liquidity_side: LiquiditySide, ts: UnixNanos) {
        let new_filled = self.common.filled_qty + fill_qty;
        assert!(
            new_filled.as_f64() <= self.common.quantity.as_f64() + f64::EPSILON,
            "fill would overfill order {}: filled={} + fill={} > quantity={}",
            self.common.client_order_id,
            self.common.filled_qty,
            fill_qty,
            self.common.quantity
        );
        let prior_filled = self.common.filled_qty.as_f64();
        let prior_notional = self.common.avg_px.unwrap_or(0.0) * prior_filled;
        let new_notional = prior_notional + fill_px.as_f64() * fill_qty.as_f64();
        self.common.avg_px = Some(if new_filled.as_f64() > 0.0 {
            new_notional / new_filled.as_f64()
        } else {
            fill_px.as_f64()
        });
        self.common.filled_qty = new_filled;
        self.common.liquidity_side = Some(liquidity_side);
        let status = if (new_filled.as_f64() - self.common.quantity.as_f64()).abs() < f64::EPSILON {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.set_status(status, ts);
    }
}

#[cfg(test)]
pub mod stubs {
    use super::*;
    use crate::identifiers::StrategyId;

    #[must_use]
    pub fn market_order(instrument_id: InstrumentId, side: OrderSide, quantity: Quantity) -> OrderAny {
        let common = OrderCommon {
            client_order_id: ClientOrderId::new("O-1"),
            venue_order_id: None,
            instrument_id,
            strategy_id: StrategyId::new("S-001"),
            side,
            quantity,
            filled_qty: Quantity::zero(quantity.precision),
            avg_px: None,
            time_in_force: crate::enums::TimeInForce::Gtc,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_qty() {
        let mut order = stubs::market_order(
            InstrumentId::from("EUR/USD.SIM"),
            OrderSide::Buy,
            Quantity::new(100.0, 0),
        );
        order.common.filled_qty = Quantity::new(40.0, 0);
        assert_eq!(order.leaves_qty().as_f64(), 60.0);
    }

    #[test]
    fn test_apply_fill_transitions_to_filled() {
        let mut order = stubs::market_order(
            InstrumentId::from("EUR/USD.SIM"),
            OrderSide::Buy,
            Quantity::new(100.0, 0),
        );
        order.set_status(OrderStatus::Submitted, 1.into());
        order.set_status(OrderStatus::Accepted, 1.into());
        order.apply_fill(Quantity::new(100.0, 0), Price::new(1.1, 5), LiquiditySide::Taker, 2.into());
        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.filled_qty().as_f64(), 100.0);
    }

    #[test]
    #[should_panic]
    fn test_status_backtrack_panics() {
        let mut order = stubs::market_order(
            InstrumentId::from("EUR/USD.SIM"),
            OrderSide::Buy,
            Quantity::new(100.0, 0),
        );
        order.set_status(OrderStatus::Submitted, 1.into());
        order.set_status(OrderStatus::Accepted, 1.into());
        order.set_status(OrderStatus::Submitted, 2.into());
    }
}
