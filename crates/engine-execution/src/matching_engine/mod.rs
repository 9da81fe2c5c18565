//! The per-instrument order matching engine (§4.D): accepts trading commands,
//! holds resting orders in an [`OrderMatchingCore`], evaluates them against each
//! incoming market observation, and produces fills, rejections, and cancellations.

pub mod ids_generator;

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use engine_common::cache::Cache;
use engine_core::{UUID4, UnixNanos};
use engine_model::{
    data::{Bar, OrderBookDelta, QuoteTick, TradeTick},
    enums::{AggressorSide, ContingencyType, LiquiditySide, OmsType, OrderSide, OrderStatus, PositionSide, PriceType, TimeInForce},
    identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId, StrategyId, TraderId},
    instruments::{Instrument, InstrumentAny},
    orderbook::{OrderBook, market_sentinel_price},
    orders::{OrderAny, OrderEventAny},
    types::{Price, Quantity},
};
use ids_generator::IdsGenerator;
use log::warn;

use crate::models::{FeeModelAny, FillModel, LatencyModel};

pub use crate::matching_core::OrderMatchingCore;

/// Static behaviour knobs that are not market- or order-data (§6 Engine config).
#[derive(Debug, Clone)]
pub struct OrderMatchingEngineConfig {
    pub oms_type: OmsType,
    pub reject_stop_orders: bool,
    pub support_gtd_orders: bool,
    /// When synthesising ticks from an OHLC bar, visit the low before the high
    /// on a down bar (`close < open`) and the high before the low on an up bar,
    /// rather than always walking open -> high -> low -> close (§4.D.1).
    pub bar_adaptive_high_low_ordering: bool,
    /// Price collar for the "too far from market" validation error (§7):
    /// a priced or triggered order is rejected when its price or trigger
    /// price deviates from the current reference price by more than this
    /// fraction. Only enforced once a reference price is available.
    pub max_price_deviation_pct: f64,
}

impl Default for OrderMatchingEngineConfig {
    fn default() -> Self {
        Self {
            oms_type: OmsType::Netting,
            reject_stop_orders: true,
            support_gtd_orders: true,
            bar_adaptive_high_low_ordering: true,
            max_price_deviation_pct: 0.50,
        }
    }
}

/// One instrument's matching engine: book, resting-order core, id counters, and
/// the fill/fee/latency models that shape how commands turn into events.
#[derive(Debug)]
pub struct OrderMatchingEngine {
    pub instrument: InstrumentAny,
    pub config: OrderMatchingEngineConfig,
    pub trader_id: TraderId,
    pub account_id: AccountId,
    book: OrderBook,
    core: OrderMatchingCore,
    ids: IdsGenerator,
    bid: Option<Price>,
    ask: Option<Price>,
    last: Option<Price>,
    fill_model: FillModel,
    fee_model: FeeModelAny,
    latency_model: LatencyModel,
    pending_children: HashMap<ClientOrderId, Vec<OrderAny>>,
    /// One net position id per strategy under `OmsType::Netting` (§4.D.6); unused
    /// under `Hedging`, where every accepted order gets its own fresh position id.
    netting_position_ids: HashMap<StrategyId, PositionId>,
    /// Orders that reached a terminal status, retained just long enough to answer
    /// a later cancel/modify against the same id with a proper rejection event
    /// rather than silently ignoring it (§8 invariant 7).
    terminal_orders: HashMap<ClientOrderId, OrderAny>,
    /// A `BID`-typed bar awaiting its matching `ASK`-typed bar with the same
    /// `ts_event`, before both can be synthesised into quote ticks (§4.D.1).
    pending_bid_bar: Option<Bar>,
    /// The venue's shared order/position store, consulted for reduce-only
    /// validation and fill trimming against the open position (§4.D.2, §4.D.3).
    cache: Rc<RefCell<Cache>>,
}

impl OrderMatchingEngine {
    #[must_use]
    pub fn new(
        instrument: InstrumentAny,
        trader_id: TraderId,
        account_id: AccountId,
        book_type: engine_model::enums::BookType,
        fill_model: FillModel,
        fee_model: FeeModelAny,
        latency_model: LatencyModel,
        config: OrderMatchingEngineConfig,
        cache: Rc<RefCell<Cache>>,
    ) -> Self {
        let instrument_id = instrument.id();
        Self {
            instrument,
            config,
            trader_id,
            account_id,
            book: OrderBook::new(book_type),
            core: OrderMatchingCore::new(instrument_id),
            ids: IdsGenerator::new(),
            bid: None,
            ask: None,
            last: None,
            fill_model,
            fee_model,
            latency_model,
            pending_children: HashMap::new(),
            netting_position_ids: HashMap::new(),
            terminal_orders: HashMap::new(),
            pending_bid_bar: None,
            cache,
        }
    }

    /// Sum of open-position quantity on `self.instrument` that an order on
    /// `side` would actually reduce (§4.D.2 item 3, §4.D.3): a long position
    /// for a sell, a short position for a buy. Zero when nothing would reduce.
    fn reducible_quantity(&self, side: OrderSide) -> f64 {
        self.cache
            .borrow()
            .positions_open_for(self.instrument.id())
            .into_iter()
            .filter(|p| matches!((side, p.side), (OrderSide::Buy, PositionSide::Short) | (OrderSide::Sell, PositionSide::Long)))
            .map(|p| p.quantity.as_f64())
            .sum()
    }

    /// Remembers a just-closed order so a later cancel/modify against the same
    /// id can be answered with a rejection event instead of silently ignored.
    fn retire(&mut self, order: OrderAny) {
        self.terminal_orders.insert(order.client_order_id(), order);
    }

    #[must_use]
    pub fn latency_model(&self) -> &LatencyModel {
        &self.latency_model
    }

    #[must_use]
    pub fn resting_order(&self, id: ClientOrderId) -> Option<&OrderAny> {
        self.core.get_order(id)
    }

    // ----------------------------------------------------------------- data

    pub fn process_quote_tick(&mut self, tick: &QuoteTick, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        if matches!(self.book.book_type, engine_model::enums::BookType::L1Tbbo) {
            self.book.update_top(tick.bid_price, tick.bid_size, tick.ask_price, tick.ask_size);
        }
        self.bid = Some(tick.bid_price);
        self.ask = Some(tick.ask_price);
        self.iterate(ts_now)
    }

    pub fn process_trade_tick(&mut self, tick: &TradeTick, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        self.last = Some(tick.price);
        self.iterate(ts_now)
    }

    pub fn process_order_book_delta(&mut self, delta: &OrderBookDelta, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        self.book.apply(delta);
        match delta.side {
            OrderSide::Buy => self.bid = self.book.best_bid_price(),
            OrderSide::Sell => self.ask = self.book.best_ask_price(),
        }
        self.iterate(ts_now)
    }

    /// Synthesises quote or trade ticks from an OHLCV bar and feeds them through
    /// the normal tick path (§4.D.1). Only meaningful for an `L1_TBBO` book: a
    /// `BID` bar is cached until its `ASK` counterpart with the same `ts_event`
    /// arrives, then the four swing points become four quote ticks; a `LAST` or
    /// `MID` bar becomes four trade ticks, each a quarter of the bar's volume,
    /// with the aggressor side inferred from the direction against the last
    /// traded price. A `BID`/`ASK` pair with mismatched `ts_event` drops the
    /// stale side rather than pairing mismatched bars.
    pub fn process_bar(&mut self, bar: &Bar, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        if !matches!(self.book.book_type, engine_model::enums::BookType::L1Tbbo) {
            return Vec::new();
        }

        let swing = |open: Price, high: Price, low: Price, close: Price| -> [Price; 4] {
            if self.config.bar_adaptive_high_low_ordering && close.as_f64() < open.as_f64() {
                [open, low, high, close]
            } else {
                [open, high, low, close]
            }
        };

        match bar.price_type {
            PriceType::Bid => {
                self.pending_bid_bar = Some(*bar);
                Vec::new()
            }
            PriceType::Ask => {
                let Some(bid_bar) = self.pending_bid_bar.take() else { return Vec::new() };
                if bid_bar.ts_event != bar.ts_event {
                    // stale pairing: keep the fresher side waiting for its own match
                    self.pending_bid_bar = Some(*bar);
                    return Vec::new();
                }
                let bid_points = swing(bid_bar.open, bid_bar.high, bid_bar.low, bid_bar.close);
                let ask_points = swing(bar.open, bar.high, bar.low, bar.close);
                let size = Quantity::new(bar.volume.as_f64() / 4.0, bar.volume.precision);
                let mut events = Vec::new();
                for i in 0..4 {
                    let quote = QuoteTick::new(bar.instrument_id, bid_points[i], ask_points[i], size, size, bar.ts_event, ts_now);
                    events.extend(self.process_quote_tick(&quote, ts_now));
                }
                events
            }
            PriceType::Last | PriceType::Mid => {
                let points = swing(bar.open, bar.high, bar.low, bar.close);
                let size = Quantity::new(bar.volume.as_f64() / 4.0, bar.volume.precision);
                let mut events = Vec::new();
                for price in points {
                    let aggressor = match self.last {
                        Some(last) if price.as_f64() > last.as_f64() => AggressorSide::Buyer,
                        Some(last) if price.as_f64() < last.as_f64() => AggressorSide::Seller,
                        _ => AggressorSide::NoAggressor,
                    };
                    let trade_id = self.ids.generate_trade_id();
                    let trade = TradeTick::new(bar.instrument_id, price, size, aggressor, trade_id, bar.ts_event, ts_now);
                    events.extend(self.process_trade_tick(&trade, ts_now));
                }
                events
            }
        }
    }

    /// Re-evaluates every resting order against the current `(bid, ask, last)`
    /// state: triggers stops, fills matched limits, expires overdue orders.
    fn iterate(&mut self, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = self.check_expirations(ts_now);

        let triggered: Vec<ClientOrderId> = self
            .core
            .iterate_stop_orders()
            .filter(|id| {
                let order = self.core.get_order(*id).expect("stop order id must resolve");
                let Some(trigger) = order.trigger_price() else { return false };
                let market = self.reference_price(order.side());
                market.is_some_and(|m| OrderMatchingCore::is_stop_triggered(order.side(), trigger, m))
            })
            .collect();
        for id in triggered {
            events.extend(self.trigger_stop_order(id, ts_now));
        }

        loop {
            let matched = self.next_matched_order();
            let Some(id) = matched else { break };
            events.extend(self.fill_resting_order(id, ts_now, false));
        }

        events
    }

    fn reference_price(&self, side: OrderSide) -> Option<Price> {
        match side {
            OrderSide::Buy => self.ask,
            OrderSide::Sell => self.bid,
        }
    }

    fn next_matched_order(&self) -> Option<ClientOrderId> {
        self.core.iterate_bids().chain(self.core.iterate_asks()).find(|id| {
            let order = self.core.get_order(*id).expect("resting order id must resolve");
            match order.limit_price().or_else(|| order.price()) {
                Some(price) => {
                    self.reference_price(order.side()).is_some_and(|m| OrderMatchingCore::is_limit_matched(order.side(), price, m))
                }
                None => false,
            }
        })
    }

    // ------------------------------------------------------------- commands

    /// Processes a new order submission (§4.D.2). Returns the events generated,
    /// in delivery order. A duplicate `client_order_id` is silently ignored
    /// (§7 idempotency policy).
    pub fn process_order(&mut self, order: OrderAny, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let cid = order.client_order_id();
        if self.core.get_order(cid).is_some() || self.terminal_orders.contains_key(&cid) {
            return Vec::new();
        }

        if let Some(parent_id) = order.common.parent_order_id {
            match self.core.get_order(parent_id).map(OrderAny::status) {
                Some(OrderStatus::Rejected) => {
                    return self.reject(order, ts_now, "parent order rejected");
                }
                Some(status) if status.is_open() || status == OrderStatus::Filled || status == OrderStatus::PartiallyFilled => {
                    // parent already accepted: fall through to normal processing
                }
                _ => {
                    self.pending_children.entry(parent_id).or_default().push(order);
                    return Vec::new();
                }
            }
        }

        if order.common.is_reduce_only && self.reducible_quantity(order.side()) <= 0.0 {
            return self.reject(order, ts_now, "reduce-only order rejected: no open position would be reduced");
        }

        self.accept_and_dispatch(order, ts_now)
    }

    fn accept_and_dispatch(&mut self, mut order: OrderAny, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = Vec::new();

        if order.quantity().is_zero()
            || order.quantity().as_f64() < self.instrument.min_quantity().as_f64()
            || order.quantity().as_f64() > self.instrument.max_quantity().as_f64()
        {
            return self.reject(order, ts_now, "invalid quantity: outside instrument trade size limits");
        }

        if let Some(band_price) = order.price().or_else(|| order.trigger_price()) {
            if let Some(reference) = self.reference_price(order.side()) {
                let deviation = (band_price.as_f64() - reference.as_f64()).abs() / reference.as_f64();
                if deviation > self.config.max_price_deviation_pct {
                    return self.reject(order, ts_now, "invalid price: too far from market");
                }
            }
        }

        let is_marketable = matches!(
            order.kind,
            engine_model::orders::OrderKind::Market | engine_model::orders::OrderKind::MarketToLimit
        );

        match order.kind {
            engine_model::orders::OrderKind::Market | engine_model::orders::OrderKind::MarketToLimit => {
                if self.reference_price(order.side()).is_none() {
                    return self.reject(order, ts_now, "no opposing price to fill market order");
                }
            }
            engine_model::orders::OrderKind::Limit { price } => {
                let matched = self
                    .reference_price(order.side())
                    .is_some_and(|m| OrderMatchingCore::is_limit_matched(order.side(), price, m));
                if order.common.is_post_only && matched {
                    return self.reject(order, ts_now, "POST_ONLY order would have been taker");
                }
            }
            engine_model::orders::OrderKind::StopMarket { trigger_price }
            | engine_model::orders::OrderKind::MarketIfTouched { trigger_price } => {
                let triggered = self
                    .reference_price(order.side())
                    .is_some_and(|m| OrderMatchingCore::is_stop_triggered(order.side(), trigger_price, m));
                if self.config.reject_stop_orders && triggered {
                    return self.reject(order, ts_now, "stop order already in market");
                }
            }
            engine_model::orders::OrderKind::StopLimit { trigger_price, .. }
            | engine_model::orders::OrderKind::LimitIfTouched { trigger_price, .. } => {
                let triggered = self
                    .reference_price(order.side())
                    .is_some_and(|m| OrderMatchingCore::is_stop_triggered(order.side(), trigger_price, m));
                if triggered {
                    return self.reject(order, ts_now, "stop-limit already in market");
                }
            }
            engine_model::orders::OrderKind::TrailingStopMarket { trigger_price, trailing_offset }
            | engine_model::orders::OrderKind::TrailingStopLimit { trigger_price, trailing_offset, .. } => {
                if trigger_price.is_none() {
                    if let Some(reference) = self.reference_price(order.side()) {
                        let n_ticks = (trailing_offset.as_f64() / self.instrument.tick_size().as_f64()).round() as i64;
                        let computed = reference.shift_ticks(self.instrument.tick_size(), n_ticks);
                        order.kind.set_trailing_trigger(computed);
                    }
                }
            }
        }

        if order.common.position_id.is_none() {
            order.common.position_id = Some(self.assign_position_id(order.common.strategy_id));
        }

        order.set_status(OrderStatus::Submitted, ts_now);
        events.push(self.event_for(&order, ts_now, EventKind::Submitted));
        order.common.venue_order_id = Some(self.ids.generate_venue_order_id());
        order.set_status(OrderStatus::Accepted, ts_now);
        events.push(self.event_for(&order, ts_now, EventKind::Accepted));

        let time_in_force = order.common.time_in_force;
        let id = order.client_order_id();
        self.core.add_order(order);

        if is_marketable {
            events.extend(self.fill_resting_order(id, ts_now, true));
        } else {
            let matched = self.core.get_order(id).is_some_and(|o| self.resting_is_matched(o));
            if matched {
                events.extend(self.fill_resting_order(id, ts_now, true));
            } else if matches!(time_in_force, TimeInForce::Ioc | TimeInForce::Fok) {
                // a non-resting IOC/FOK order never joins the book (§4.D.2)
                events.extend(self.process_cancel(id, ts_now));
            }
        }

        events.extend(self.release_pending_children(id, ts_now));
        events
    }

    /// Assigns a position id for a newly accepted order (§4.D.6): one id per
    /// strategy under `OmsType::Netting` (reused across subsequent orders on the
    /// same instrument+strategy), a fresh id per order under `Hedging`.
    fn assign_position_id(&mut self, strategy_id: StrategyId) -> PositionId {
        match self.config.oms_type {
            OmsType::Netting => *self
                .netting_position_ids
                .entry(strategy_id)
                .or_insert_with(|| self.ids.generate_position_id(self.instrument.id())),
            OmsType::Hedging | OmsType::Unspecified => self.ids.generate_position_id(self.instrument.id()),
        }
    }

    fn resting_is_matched(&self, order: &OrderAny) -> bool {
        match order.limit_price() {
            Some(price) => self
                .reference_price(order.side())
                .is_some_and(|m| OrderMatchingCore::is_limit_matched(order.side(), price, m)),
            None => false,
        }
    }

    fn release_pending_children(&mut self, parent_id: ClientOrderId, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        if let Some(children) = self.pending_children.remove(&parent_id) {
            for child in children {
                events.extend(self.process_order(child, ts_now));
            }
        }
        events
    }

    /// A stop/if-touched order's trigger condition has been met (§4.D.1 `iterate`):
    /// emits `OrderTriggered`, then either fills it immediately (`STOP_MARKET`,
    /// `MARKET_IF_TOUCHED`) or converts it to a resting limit (`STOP_LIMIT`,
    /// `LIMIT_IF_TOUCHED`) awaiting its own limit match.
    fn trigger_stop_order(&mut self, id: ClientOrderId, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        let Some(mut order) = self.core.delete_order(id) else { return events };
        order.set_status(OrderStatus::Triggered, ts_now);
        events.push(self.event_for(&order, ts_now, EventKind::Triggered));

        let fills_immediately = matches!(
            order.kind,
            engine_model::orders::OrderKind::StopMarket { .. } | engine_model::orders::OrderKind::MarketIfTouched { .. }
        );
        let id = order.client_order_id();
        self.core.add_order(order);
        if fills_immediately {
            events.extend(self.fill_resting_order(id, ts_now, true));
        } else {
            let matched = self.core.get_order(id).is_some_and(|o| self.resting_is_matched(o));
            if matched {
                events.extend(self.fill_resting_order(id, ts_now, true));
            }
        }
        events
    }

    /// Applies the fill algorithm (§4.D.3) to the order resting at `id`, walking
    /// the book (or falling onto an imaginary level one tick past the last fill
    /// when the book is exhausted, so marketable orders always fully resolve).
    /// `FOK` cancels the whole order rather than fill it when the book can't
    /// cover `leaves_qty`; `IOC` fills what it can then cancels the remainder.
    fn fill_resting_order(&mut self, id: ClientOrderId, ts_now: UnixNanos, is_taker: bool) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        let Some(order) = self.core.get_order(id) else { return events };
        let side = order.side();
        let mut leaves = order.leaves_qty();
        let limit_price = order.limit_price();
        let is_marketable = order.price().is_none();
        let time_in_force = order.common.time_in_force;
        let is_reduce_only = order.common.is_reduce_only;

        if is_reduce_only {
            let cap = self.reducible_quantity(side);
            if cap < leaves.as_f64() {
                leaves = Quantity::new(cap.max(0.0), leaves.precision);
            }
        }

        let sentinel = market_sentinel_price(side, self.instrument.price_precision());
        let walk_limit = limit_price.unwrap_or(sentinel);
        let mut fills = self.book.simulate_order_fills(side, walk_limit, leaves);

        let filled_so_far: f64 = fills.iter().map(|(_, q)| q.as_f64()).sum();

        if time_in_force == TimeInForce::Fok && filled_so_far + f64::EPSILON < leaves.as_f64() {
            return self.process_cancel(id, ts_now);
        }

        if is_marketable && filled_so_far < leaves.as_f64() {
            let remaining = leaves.as_f64() - filled_so_far;
            let last_price = fills.last().map_or_else(
                || self.reference_price(side).unwrap_or(sentinel),
                |(p, _)| *p,
            );
            let tick = self.instrument.tick_size();
            let n_ticks = if side == OrderSide::Buy { 1 } else { -1 };
            let imaginary_price = last_price.shift_ticks(tick, n_ticks);
            fills.push((imaginary_price, Quantity::new(remaining, leaves.precision)));
        }

        if let Some(limit_price) = limit_price {
            if let Some((price, _)) = fills.first() {
                if (price.as_f64() - limit_price.as_f64()).abs() < f64::EPSILON && !self.fill_model.is_limit_filled() {
                    return events;
                }
            }
        }

        let liquidity_side = if is_taker { LiquiditySide::Taker } else { LiquiditySide::Maker };
        for (fill_px, fill_qty) in fills {
            if fill_qty.is_zero() {
                continue;
            }
            events.extend(self.apply_single_fill(id, fill_qty, fill_px, liquidity_side, ts_now));
            if self.core.get_order(id).is_none() {
                break; // closed and removed from the core
            }
        }

        if time_in_force == TimeInForce::Ioc && self.core.get_order(id).is_some_and(|o| !o.leaves_qty().is_zero()) {
            events.extend(self.process_cancel(id, ts_now));
        }

        events
    }

    fn apply_single_fill(
        &mut self,
        id: ClientOrderId,
        fill_qty: Quantity,
        fill_px: Price,
        liquidity_side: LiquiditySide,
        ts_now: UnixNanos,
    ) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        let Some(order) = self.core.get_order_mut(id) else { return events };
        order.apply_fill(fill_qty, fill_px, liquidity_side, ts_now);
        let trade_id = self.ids.generate_trade_id();
        let commission = self.fee_model.calculate(&self.instrument, liquidity_side, fill_qty, fill_px);

        let order = self.core.get_order(id).expect("order still resolves after apply_fill");
        let filled_event = OrderEventAny::Filled(engine_model::orders::events::OrderFilled {
            common: self.event_common(order, ts_now),
            trade_id,
            position_id: order.common.position_id,
            order_side: order.side(),
            order_type: order.order_type(),
            last_qty: fill_qty,
            last_px: fill_px,
            commission,
            liquidity_side,
        });
        let is_closed = order.is_closed();
        events.push(filled_event);

        events.extend(self.cascade_on_fill(id, ts_now));

        if is_closed {
            if let Some(closed) = self.core.delete_order(id) {
                self.retire(closed);
            }
        }

        events
    }

    // -------------------------------------------------------------- cancel

    /// Cancels a resting order (§4.D.2). An id that was never seen is ignored
    /// (§7 idempotency policy); an id that belonged to an order which already
    /// reached a terminal status gets `OrderCancelRejected` rather than a second
    /// `OrderCanceled` (§8 invariant 7).
    pub fn process_cancel(&mut self, id: ClientOrderId, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        if self.core.get_order(id).is_none() {
            return self.reject_unknown_cancel(id, ts_now);
        }
        let mut order = self.core.delete_order(id).expect("order resolved above");
        let mut events = Vec::new();
        order.set_status(OrderStatus::PendingCancel, ts_now);
        events.push(self.event_for(&order, ts_now, EventKind::PendingCancel));
        order.set_status(OrderStatus::Canceled, ts_now);
        events.push(self.event_for(&order, ts_now, EventKind::Canceled));
        events.extend(self.cascade_on_close(id, order.common.contingency_type, &order.common.linked_order_ids, ts_now));
        self.retire(order);
        events
    }

    fn reject_unknown_cancel(&self, id: ClientOrderId, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(order) = self.terminal_orders.get(&id) else { return Vec::new() };
        vec![OrderEventAny::CancelRejected(engine_model::orders::events::OrderCancelRejected {
            common: self.event_common(order, ts_now),
            reason: "order already in a terminal state".to_owned(),
        })]
    }

    fn reject_unknown_modify(&self, id: ClientOrderId, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(order) = self.terminal_orders.get(&id) else { return Vec::new() };
        vec![OrderEventAny::ModifyRejected(engine_model::orders::events::OrderModifyRejected {
            common: self.event_common(order, ts_now),
            reason: "order already in a terminal state".to_owned(),
        })]
    }

    pub fn process_cancel_all(&mut self, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let ids: Vec<ClientOrderId> = self.core.iterate_bids().chain(self.core.iterate_asks()).chain(self.core.iterate_stop_orders()).collect();
        ids.into_iter().flat_map(|id| self.process_cancel(id, ts_now)).collect()
    }

    // ------------------------------------------------------------- modify

    /// Re-prices and/or resizes a resting order (§4.D.2). Limit orders that
    /// would newly cross with `is_post_only` are rejected rather than modified.
    /// An id belonging to an already-terminal order gets `OrderModifyRejected`
    /// (§8 invariant 7); a never-seen id is ignored (§7 idempotency policy).
    pub fn process_modify(
        &mut self,
        id: ClientOrderId,
        new_price: Option<Price>,
        new_trigger_price: Option<Price>,
        ts_now: UnixNanos,
    ) -> Vec<OrderEventAny> {
        if self.core.get_order(id).is_none() {
            return self.reject_unknown_modify(id, ts_now);
        }
        let mut events = Vec::new();
        let mut order = self.core.delete_order(id).expect("order resolved above");
        order.set_status(OrderStatus::PendingUpdate, ts_now);
        events.push(self.event_for(&order, ts_now, EventKind::PendingUpdate));

        if let Some(price) = new_price {
            if order.common.is_post_only {
                let matched = self.reference_price(order.side()).is_some_and(|m| OrderMatchingCore::is_limit_matched(order.side(), price, m));
                if matched {
                    order.set_status(OrderStatus::Accepted, ts_now);
                    events.push(OrderEventAny::ModifyRejected(engine_model::orders::events::OrderModifyRejected {
                        common: self.event_common(&order, ts_now),
                        reason: "POST_ONLY modify would have been taker".to_owned(),
                    }));
                    self.core.add_order(order);
                    return events;
                }
            }
        }

        if let Some(trigger_price) = new_trigger_price {
            let is_stop_kind = matches!(
                order.kind,
                engine_model::orders::OrderKind::StopMarket { .. }
                    | engine_model::orders::OrderKind::StopLimit { .. }
                    | engine_model::orders::OrderKind::MarketIfTouched { .. }
                    | engine_model::orders::OrderKind::LimitIfTouched { .. }
            );
            let triggered = is_stop_kind
                && self
                    .reference_price(order.side())
                    .is_some_and(|m| OrderMatchingCore::is_stop_triggered(order.side(), trigger_price, m));
            if triggered {
                order.set_status(OrderStatus::Accepted, ts_now);
                events.push(OrderEventAny::ModifyRejected(engine_model::orders::events::OrderModifyRejected {
                    common: self.event_common(&order, ts_now),
                    reason: "stop modify already in market".to_owned(),
                }));
                self.core.add_order(order);
                return events;
            }
        }

        order.kind.reprice(new_price, new_trigger_price);
        order.set_status(OrderStatus::Accepted, ts_now);
        events.push(OrderEventAny::Updated(engine_model::orders::events::OrderUpdated {
            common: self.event_common(&order, ts_now),
            quantity: order.quantity(),
            price: order.price(),
            trigger_price: order.trigger_price(),
        }));

        let id = order.client_order_id();
        self.core.add_order(order);
        let matched = self.core.get_order(id).is_some_and(|o| self.resting_is_matched(o));
        if matched {
            events.extend(self.fill_resting_order(id, ts_now, true));
        }
        events
    }

    // -------------------------------------------------------------- expiry

    /// Expires every resting order whose `expire_time_ns` has passed (§4.D.5).
    pub fn check_expirations(&mut self, now_ns: UnixNanos) -> Vec<OrderEventAny> {
        if !self.config.support_gtd_orders {
            return Vec::new();
        }
        let expired: Vec<ClientOrderId> = self
            .core
            .iterate_bids()
            .chain(self.core.iterate_asks())
            .chain(self.core.iterate_stop_orders())
            .filter(|id| {
                let order = self.core.get_order(*id).expect("resting order id must resolve");
                order.common.expire_time_ns.as_u64() > 0 && now_ns >= order.common.expire_time_ns
            })
            .collect();

        let mut events = Vec::new();
        for id in expired {
            let Some(mut order) = self.core.delete_order(id) else { continue };
            order.set_status(OrderStatus::Expired, now_ns);
            events.push(self.event_for(&order, now_ns, EventKind::Expired));
            events.extend(self.cascade_on_close(id, order.common.contingency_type, &order.common.linked_order_ids, now_ns));
            self.retire(order);
        }
        events
    }

    // --------------------------------------------------------- contingency

    /// OCO cancels every linked leg on any fill; OUO matches leaves_qty on linked
    /// legs, cancelling a leg rather than sending a zero-quantity update (§4.D.4,
    /// §9 resolved). Non-reentrant: a leg's own cascade does not re-trigger ours.
    fn cascade_on_fill(&mut self, id: ClientOrderId, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(order) = self.core.get_order(id) else { return Vec::new() };
        let contingency = order.common.contingency_type;
        let linked = order.common.linked_order_ids.clone();
        let leaves_qty = order.leaves_qty();

        match contingency {
            ContingencyType::Oco => linked
                .into_iter()
                .flat_map(|linked_id| self.process_cancel(linked_id, ts_now))
                .collect(),
            ContingencyType::Ouo => {
                let mut events = Vec::new();
                for linked_id in linked {
                    if leaves_qty.is_zero() {
                        events.extend(self.process_cancel(linked_id, ts_now));
                        continue;
                    }
                    let Some(linked_order) = self.core.get_order(linked_id) else { continue };
                    if linked_order.leaves_qty().as_f64() == leaves_qty.as_f64() {
                        continue;
                    }
                    events.extend(self.update_linked_quantity(linked_id, leaves_qty, ts_now));
                }
                events
            }
            _ => Vec::new(),
        }
    }

    fn cascade_on_close(
        &mut self,
        _closed_id: ClientOrderId,
        contingency: ContingencyType,
        linked: &[ClientOrderId],
        ts_now: UnixNanos,
    ) -> Vec<OrderEventAny> {
        match contingency {
            ContingencyType::Oco | ContingencyType::Ouo => {
                linked.iter().flat_map(|linked_id| self.process_cancel(*linked_id, ts_now)).collect()
            }
            _ => Vec::new(),
        }
    }

    fn update_linked_quantity(&mut self, id: ClientOrderId, new_leaves: Quantity, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        if new_leaves.is_zero() {
            return self.process_cancel(id, ts_now);
        }
        let Some(order) = self.core.get_order_mut(id) else { return events };
        let new_quantity = Quantity::new(order.filled_qty().as_f64() + new_leaves.as_f64(), order.quantity().precision);
        order.common.quantity = new_quantity;
        let order = self.core.get_order(id).expect("order still resolves");
        events.push(OrderEventAny::Updated(engine_model::orders::events::OrderUpdated {
            common: self.event_common(order, ts_now),
            quantity: new_quantity,
            price: order.price(),
            trigger_price: order.trigger_price(),
        }));
        events
    }

    // ----------------------------------------------------------------- ids

    fn reject(&mut self, mut order: OrderAny, ts_now: UnixNanos, reason: &str) -> Vec<OrderEventAny> {
        order.set_status(OrderStatus::Submitted, ts_now);
        let submitted = self.event_for(&order, ts_now, EventKind::Submitted);
        order.set_status(OrderStatus::Rejected, ts_now);
        let rejected = OrderEventAny::Rejected(engine_model::orders::events::OrderRejected {
            common: self.event_common(&order, ts_now),
            reason: reason.to_owned(),
        });
        warn!("order {} rejected: {reason}", order.client_order_id());
        self.retire(order);
        vec![submitted, rejected]
    }

    fn event_common(&self, order: &OrderAny, ts_now: UnixNanos) -> engine_model::orders::events::OrderEventCommon {
        engine_model::orders::events::OrderEventCommon {
            trader_id: self.trader_id,
            strategy_id: order.common.strategy_id,
            account_id: self.account_id,
            instrument_id: order.instrument_id(),
            client_order_id: order.client_order_id(),
            venue_order_id: order.venue_order_id(),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
        }
    }

    fn event_for(&self, order: &OrderAny, ts_now: UnixNanos, kind: EventKind) -> OrderEventAny {
        let common = self.event_common(order, ts_now);
        match kind {
            EventKind::Submitted => OrderEventAny::Submitted(common),
            EventKind::Accepted => OrderEventAny::Accepted(common),
            EventKind::PendingUpdate => OrderEventAny::PendingUpdate(common),
            EventKind::PendingCancel => OrderEventAny::PendingCancel(common),
            EventKind::Triggered => OrderEventAny::Triggered(common),
            EventKind::Expired => OrderEventAny::Expired(common),
            EventKind::Canceled => OrderEventAny::Canceled(common),
        }
    }
}

enum EventKind {
    Submitted,
    Accepted,
    PendingUpdate,
    PendingCancel,
    Triggered,
    Expired,
    Canceled,
}
