use engine_core::{UnixNanos, UUID4};

use crate::{
    enums::{LiquiditySide, OrderSide, OrderType},
    identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId, StrategyId, TradeId, TraderId, VenueOrderId},
    types::{Money, Price, Quantity},
};

/// Fields common to every order lifecycle event (§6 external interfaces).
#[derive(Clone, Debug)]
pub struct OrderEventCommon {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub event_id: UUID4,
    pub ts_event: UnixNanos,
    pub ts_init: UnixNanos,
}

#[derive(Clone, Debug)]
pub struct OrderFilled {
    pub common: OrderEventCommon,
    pub trade_id: TradeId,
    pub position_id: Option<PositionId>,
    pub order_side: OrderSide,
    pub order_type: OrderType,
    pub last_qty: Quantity,
    pub last_px: Price,
    pub commission: Money,
    pub liquidity_side: LiquiditySide,
}

#[derive(Clone, Debug)]
pub struct OrderRejected {
    pub common: OrderEventCommon,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct OrderCancelRejected {
    pub common: OrderEventCommon,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct OrderModifyRejected {
    pub common: OrderEventCommon,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct OrderUpdated {
    pub common: OrderEventCommon,
    pub quantity: Quantity,
    pub price: Option<Price>,
    pub trigger_price: Option<Price>,
}

/// Every event the matching engine can publish, one per variant of §6's event list.
#[derive(Clone, Debug)]
pub enum OrderEventAny {
    Submitted(OrderEventCommon),
    Accepted(OrderEventCommon),
    Rejected(OrderRejected),
    PendingUpdate(OrderEventCommon),
    PendingCancel(OrderEventCommon),
    ModifyRejected(OrderModifyRejected),
    CancelRejected(OrderCancelRejected),
    Updated(OrderUpdated),
    Triggered(OrderEventCommon),
    Expired(OrderEventCommon),
    Canceled(OrderEventCommon),
    Filled(OrderFilled),
}

impl OrderEventAny {
    #[must_use]
    pub fn common(&self) -> &OrderEventCommon {
        match self {
            Self::Submitted(c) | Self::Accepted(c) | Self::PendingUpdate(c) | Self::PendingCancel(c)
            | Self::Triggered(c) | Self::Expired(c) | Self::Canceled(c) => c,
            Self::Rejected(e) => &e.common,
            Self::ModifyRejected(e) => &e.common,
            Self::CancelRejected(e) => &e.common,
            Self::Updated(e) => &e.common,
            Self::Filled(e) => &e.common,
        }
    }

    #[must_use]
    pub fn client_order_id(&self) -> ClientOrderId {
        self.common().client_order_id
    }

    #[must_use]
    pub fn ts_init(&self) -> UnixNanos {
        self.common().ts_init
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted(_) => "OrderSubmitted",
            Self::Accepted(_) => "OrderAccepted",
            Self::Rejected(_) => "OrderRejected",
            Self::PendingUpdate(_) => "OrderPendingUpdate",
            Self::PendingCancel(_) => "OrderPendingCancel",
            Self::ModifyRejected(_) => "OrderModifyRejected",
            Self::CancelRejected(_) => "OrderCancelRejected",
            Self::Updated(_) => "OrderUpdated",
            Self::Triggered(_) => "OrderTriggered",
            Self::Expired(_) => "OrderExpired",
            Self::Canceled(_) => "OrderCanceled",
            Self::Filled(_) => "OrderFilled",
        }
    }
}
