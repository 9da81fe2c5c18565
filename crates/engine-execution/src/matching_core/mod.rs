//! Resting-order book for one instrument's matching engine: price-time ordered
//! collections of passive orders plus untriggered stop/if-touched orders, kept
//! separate from [`engine_model::orderbook::OrderBook`] (which models the public
//! market data book, not an engine's own working orders).

use std::collections::{BTreeMap, HashMap, VecDeque};

use engine_model::{
    enums::{OrderSide, OrderStatus},
    identifiers::{ClientOrderId, InstrumentId},
    orders::OrderAny,
    types::Price,
};

/// Wraps [`Price`] so it can key a [`BTreeMap`] with bid levels descending (best
/// bid highest) and ask levels ascending (best ask lowest), matching the public
/// order book's `OrderedPrice` convention (engine-model's `orderbook` module).
#[derive(Debug, Clone, Copy, PartialEq)]
struct LevelKey(Price);

impl Eq for LevelKey {}

impl PartialOrd for LevelKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LevelKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_f64().partial_cmp(&other.0.as_f64()).expect("prices are never NaN")
    }
}

/// One instrument's working orders: passive limit-priced orders resting for a
/// match, and stop/if-touched orders waiting on a trigger (§4.D.3).
#[derive(Debug)]
pub struct OrderMatchingCore {
    pub instrument_id: InstrumentId,
    orders: HashMap<ClientOrderId, OrderAny>,
    bids: BTreeMap<LevelKey, VecDeque<ClientOrderId>>,
    asks: BTreeMap<LevelKey, VecDeque<ClientOrderId>>,
    stop_orders: Vec<ClientOrderId>,
}

impl OrderMatchingCore {
    #[must_use]
    pub fn new(instrument_id: InstrumentId) -> Self {
        Self {
            instrument_id,
            orders: HashMap::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            stop_orders: Vec::new(),
        }
    }

    /// Adds a resting order, filing it under its limit price (time priority is
    /// FIFO-per-level, via `VecDeque::push_back`) or the untriggered-stop list.
    ///
    /// A stop/if-touched order always files into the untriggered-stop list until
    /// it has actually triggered: `OrderKind::price()` returns the configured
    /// limit price for `StopLimit`/`LimitIfTouched` unconditionally, but that
    /// price is not a matchable resting price until `limit_price()` says so
    /// (i.e. the order's status is `Triggered`).
    pub fn add_order(&mut self, order: OrderAny) {
        let id = order.client_order_id();
        if order.kind.is_stop() && order.status() != OrderStatus::Triggered {
            self.stop_orders.push(id);
        } else if let Some(price) = order.limit_price().or_else(|| order.price()) {
            self.level_for(order.side()).entry(LevelKey(price)).or_default().push_back(id);
        }
        self.orders.insert(id, order);
    }

    pub fn delete_order(&mut self, id: ClientOrderId) -> Option<OrderAny> {
        let order = self.orders.remove(&id)?;
        if let Some(price) = order.price() {
            let level = self.level_for(order.side());
            if let Some(queue) = level.get_mut(&LevelKey(price)) {
                queue.retain(|o| *o != id);
                if queue.is_empty() {
                    level.remove(&LevelKey(price));
                }
            }
        }
        self.stop_orders.retain(|o| *o != id);
        Some(order)
    }

    #[must_use]
    pub fn get_order(&self, id: ClientOrderId) -> Option<&OrderAny> {
        self.orders.get(&id)
    }

    pub fn get_order_mut(&mut self, id: ClientOrderId) -> Option<&mut OrderAny> {
        self.orders.get_mut(&id)
    }

    fn level_for(&mut self, side: OrderSide) -> &mut BTreeMap<LevelKey, VecDeque<ClientOrderId>> {
        match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        }
    }

    /// Bid client order ids in price-time priority: best (highest) price first,
    /// FIFO within a level.
    pub fn iterate_bids(&self) -> impl Iterator<Item = ClientOrderId> + '_ {
        self.bids.iter().rev().flat_map(|(_, q)| q.iter().copied())
    }

    /// Ask client order ids in price-time priority: best (lowest) price first,
    /// FIFO within a level.
    pub fn iterate_asks(&self) -> impl Iterator<Item = ClientOrderId> + '_ {
        self.asks.iter().flat_map(|(_, q)| q.iter().copied())
    }

    #[must_use]
    pub fn iterate_stop_orders(&self) -> impl Iterator<Item = ClientOrderId> + '_ {
        self.stop_orders.iter().copied()
    }

    /// Whether a resting limit order on `side` at `order_price` is matchable
    /// against an incoming trade/quote at `market_price` (§4.D.3): a bid matches
    /// when the market trades at or below it, an ask when it trades at or above.
    #[must_use]
    pub fn is_limit_matched(side: OrderSide, order_price: Price, market_price: Price) -> bool {
        match side {
            OrderSide::Buy => market_price.as_f64() <= order_price.as_f64(),
            OrderSide::Sell => market_price.as_f64() >= order_price.as_f64(),
        }
    }

    /// Whether a stop/if-touched order on `side` with `trigger_price` activates
    /// against `market_price` (§4.D.3): a buy-side stop triggers on a rise through
    /// the trigger, a sell-side stop on a fall through it.
    #[must_use]
    pub fn is_stop_triggered(side: OrderSide, trigger_price: Price, market_price: Price) -> bool {
        match side {
            OrderSide::Buy => market_price.as_f64() >= trigger_price.as_f64(),
            OrderSide::Sell => market_price.as_f64() <= trigger_price.as_f64(),
        }
    }

    #[must_use]
    pub fn best_bid_level_qty(&self) -> Option<(Price, usize)> {
        self.bids.iter().next_back().map(|(k, q)| (k.0, q.len()))
    }

    #[must_use]
    pub fn best_ask_level_qty(&self) -> Option<(Price, usize)> {
        self.asks.iter().next().map(|(k, q)| (k.0, q.len()))
    }
}

#[cfg(test)]
mod tests {
    use engine_model::{
        enums::{ContingencyType, OrderStatus, TimeInForce},
        identifiers::{ClientOrderId as Cid, InstrumentId, StrategyId},
        orders::{OrderCommon, OrderKind},
        types::Quantity,
    };

    use super::*;

    fn limit_order(id: &str, side: OrderSide, price: f64) -> OrderAny {
        let common = OrderCommon {
            client_order_id: Cid::new(id),
            venue_order_id: None,
            instrument_id: InstrumentId::from("EUR/USD.SIM"),
            strategy_id: StrategyId::new("S-001"),
            side,
            quantity: Quantity::new(100.0, 0),
            filled_qty: Quantity::zero(0),
            avg_px: None,
            time_in_force: TimeInForce::Gtc,
            expire_time_ns: 0.into(),
            status: OrderStatus::Accepted,
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
        OrderAny::new(common, OrderKind::Limit { price: Price::new(price, 5) })
    }

    #[test]
    fn test_bids_iterate_best_price_first() {
        let mut core = OrderMatchingCore::new(InstrumentId::from("EUR/USD.SIM"));
        core.add_order(limit_order("O-1", OrderSide::Buy, 1.1000));
        core.add_order(limit_order("O-2", OrderSide::Buy, 1.1005));
        let ids: Vec<_> = core.iterate_bids().collect();
        assert_eq!(ids, vec![Cid::new("O-2"), Cid::new("O-1")]);
    }

    #[test]
    fn test_asks_iterate_best_price_first() {
        let mut core = OrderMatchingCore::new(InstrumentId::from("EUR/USD.SIM"));
        core.add_order(limit_order("O-1", OrderSide::Sell, 1.1005));
        core.add_order(limit_order("O-2", OrderSide::Sell, 1.1000));
        let ids: Vec<_> = core.iterate_asks().collect();
        assert_eq!(ids, vec![Cid::new("O-2"), Cid::new("O-1")]);
    }

    #[test]
    fn test_delete_order_removes_empty_level() {
        let mut core = OrderMatchingCore::new(InstrumentId::from("EUR/USD.SIM"));
        core.add_order(limit_order("O-1", OrderSide::Buy, 1.1000));
        assert!(core.delete_order(Cid::new("O-1")).is_some());
        assert_eq!(core.iterate_bids().count(), 0);
        assert!(core.best_bid_level_qty().is_none());
    }

    #[test]
    fn test_is_limit_matched() {
        let px = Price::new(1.1000, 5);
        assert!(OrderMatchingCore::is_limit_matched(OrderSide::Buy, px, Price::new(1.0999, 5)));
        assert!(!OrderMatchingCore::is_limit_matched(OrderSide::Buy, px, Price::new(1.1001, 5)));
    }

    #[test]
    fn test_is_stop_triggered() {
        let trigger = Price::new(1.1000, 5);
        assert!(OrderMatchingCore::is_stop_triggered(OrderSide::Buy, trigger, Price::new(1.1001, 5)));
        assert!(!OrderMatchingCore::is_stop_triggered(OrderSide::Buy, trigger, Price::new(1.0999, 5)));
    }
}
