//! One simulated venue (§4.E): a matching engine per instrument, a single owned
//! account, and a latency-ordered command queue, grounded on the teacher's
//! `nautilus_backtest::exchange::SimulatedExchange` minus the `ExecutionClient`
//! routing layer — this core settles fills straight into its own `Account` rather
//! than forwarding them to a pluggable execution-client abstraction.

use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
    rc::Rc,
};

use engine_common::cache::Cache;
use engine_core::UnixNanos;
use engine_model::{
    accounts::Account,
    data::{Bar, InstrumentStatus, OrderBookDelta, OrderBookDeltas, QuoteTick, TradeTick},
    enums::{AccountType, BookType, OmsType},
    identifiers::{AccountId, InstrumentId, TraderId, Venue},
    orders::OrderEventAny,
    types::{Currency, Money},
};
use engine_execution::{FeeModelAny, FillModel, LatencyModel, OrderMatchingEngine, OrderMatchingEngineConfig};

use crate::commands::TradingCommand;

/// Static configuration for one [`SimulatedExchange`] (§6 Engine config + Accounts).
#[derive(Debug, Clone)]
pub struct SimulatedExchangeConfig {
    pub venue: Venue,
    pub trader_id: TraderId,
    pub account_id: AccountId,
    pub account_type: AccountType,
    pub base_currency: Option<Currency>,
    pub starting_balances: Vec<Money>,
    pub default_leverage: f64,
    pub frozen_account: bool,
    pub book_type: BookType,
    pub oms_type: OmsType,
    pub reject_stop_orders: bool,
    pub support_gtd_orders: bool,
    pub bar_adaptive_high_low_ordering: bool,
    pub max_price_deviation_pct: f64,
    /// If `false`, every command is dispatched on the next `process` call
    /// regardless of latency (§4.B: "latencies of zero collapse to immediate
    /// delivery"); set `false` only for tests that don't care about ordering.
    pub use_message_queue: bool,
}

/// A [`TradingCommand`] stamped with the time it becomes eligible for dispatch,
/// plus a per-timestamp insertion counter that breaks ties in submission order
/// (§8 invariant 6). Reverses its `Ord` so a [`BinaryHeap`] — a max-heap — pops
/// the smallest `(ready_ns, counter)` first, mirroring the teacher's
/// `InflightCommand`.
#[derive(Debug)]
struct InflightCommand {
    ready_ns: UnixNanos,
    counter: u32,
    command: TradingCommand,
}

impl PartialEq for InflightCommand {
    fn eq(&self, other: &Self) -> bool {
        self.ready_ns == other.ready_ns && self.counter == other.counter
    }
}

impl Eq for InflightCommand {}

impl PartialOrd for InflightCommand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InflightCommand {
    fn cmp(&self, other: &Self) -> Ordering {
        other.ready_ns.cmp(&self.ready_ns).then_with(|| other.counter.cmp(&self.counter))
    }
}

/// One venue's matching engines, account, and command queue (§4.E).
#[derive(Debug)]
pub struct SimulatedExchange {
    pub venue: Venue,
    trader_id: TraderId,
    account: Account,
    book_type: BookType,
    engine_config: OrderMatchingEngineConfig,
    fill_model: FillModel,
    fee_model: FeeModelAny,
    latency_model: LatencyModel,
    frozen_account: bool,
    use_message_queue: bool,
    matching_engines: HashMap<InstrumentId, OrderMatchingEngine>,
    message_queue: VecDeque<TradingCommand>,
    inflight_queue: BinaryHeap<InflightCommand>,
    inflight_counter: HashMap<u64, u32>,
    cache: Rc<RefCell<Cache>>,
}

impl SimulatedExchange {
    #[must_use]
    pub fn new(
        config: SimulatedExchangeConfig,
        fill_model: FillModel,
        fee_model: FeeModelAny,
        latency_model: LatencyModel,
        cache: Rc<RefCell<Cache>>,
    ) -> Self {
        let account = Account::new(
            config.account_id,
            config.account_type,
            config.base_currency,
            config.starting_balances,
            config.default_leverage,
            config.frozen_account,
        );
        Self {
            venue: config.venue,
            trader_id: config.trader_id,
            account,
            book_type: config.book_type,
            engine_config: OrderMatchingEngineConfig {
                oms_type: config.oms_type,
                reject_stop_orders: config.reject_stop_orders,
                support_gtd_orders: config.support_gtd_orders,
                bar_adaptive_high_low_ordering: config.bar_adaptive_high_low_ordering,
                max_price_deviation_pct: config.max_price_deviation_pct,
            },
            fill_model,
            fee_model,
            latency_model,
            frozen_account: config.frozen_account,
            use_message_queue: config.use_message_queue,
            matching_engines: HashMap::new(),
            message_queue: VecDeque::new(),
            inflight_queue: BinaryHeap::new(),
            inflight_counter: HashMap::new(),
            cache,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.account.account_id
    }

    /// Drops every matching engine (forcing lazy recreation from the cache's
    /// instrument set) and clears the queues, ready for a fresh run (§4.H `setup`).
    pub fn reset(&mut self) {
        self.matching_engines.clear();
        self.message_queue.clear();
        self.inflight_queue.clear();
        self.inflight_counter.clear();
    }

    /// Pushes the account's starting `AccountState` into the cache (§4.H `initialize_account`).
    pub fn initialize_account(&self, ts_now: UnixNanos) {
        self.cache.borrow_mut().update_account_state(self.account.generate_state(ts_now));
    }

    fn get_or_create_engine(&mut self, instrument_id: InstrumentId) -> Option<&mut OrderMatchingEngine> {
        if !self.matching_engines.contains_key(&instrument_id) {
            let instrument = *self.cache.borrow().instrument(instrument_id)?;
            let engine = OrderMatchingEngine::new(
                instrument,
                self.trader_id,
                self.account.account_id,
                self.book_type,
                self.fill_model.clone(),
                self.fee_model.clone(),
                self.latency_model,
                self.engine_config.clone(),
                Rc::clone(&self.cache),
            );
            self.matching_engines.insert(instrument_id, engine);
        }
        self.matching_engines.get_mut(&instrument_id)
    }

    /// Settles commission for every `Filled` event into the account and, unless
    /// frozen, republishes a fresh `AccountState` (§4.E).
    fn settle_fills(&mut self, events: &[OrderEventAny], ts_now: UnixNanos) {
        let mut any_fill = false;
        for event in events {
            if let OrderEventAny::Filled(fill) = event {
                self.account.adjust_balance(Money::new(-fill.commission.as_f64(), fill.commission.currency));
                any_fill = true;
            }
        }
        if any_fill && !self.frozen_account {
            self.cache.borrow_mut().update_account_state(self.account.generate_state(ts_now));
        }
    }

    // ------------------------------------------------------------ market data

    pub fn process_quote_tick(&mut self, tick: &QuoteTick, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(engine) = self.get_or_create_engine(tick.instrument_id) else { return Vec::new() };
        let events = engine.process_quote_tick(tick, ts_now);
        self.settle_fills(&events, ts_now);
        events
    }

    pub fn process_trade_tick(&mut self, tick: &TradeTick, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(engine) = self.get_or_create_engine(tick.instrument_id) else { return Vec::new() };
        let events = engine.process_trade_tick(tick, ts_now);
        self.settle_fills(&events, ts_now);
        events
    }

    pub fn process_order_book_delta(&mut self, delta: &OrderBookDelta, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(engine) = self.get_or_create_engine(delta.instrument_id) else { return Vec::new() };
        let events = engine.process_order_book_delta(delta, ts_now);
        self.settle_fills(&events, ts_now);
        events
    }

    /// Applies each contained delta in order; `OrderBookDeltas` carries no
    /// matching-engine method of its own (§4.E).
    pub fn process_order_book_deltas(&mut self, deltas: &OrderBookDeltas, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        deltas.deltas.iter().flat_map(|d| self.process_order_book_delta(d, ts_now)).collect()
    }

    pub fn process_bar(&mut self, bar: &Bar, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let Some(engine) = self.get_or_create_engine(bar.instrument_id) else { return Vec::new() };
        let events = engine.process_bar(bar, ts_now);
        self.settle_fills(&events, ts_now);
        events
    }

    /// `InstrumentStatus` carries no matching-engine reaction in this core beyond
    /// ensuring an engine exists for the instrument (§4.H `route`); a halt/pause
    /// that should reject new commands is a matching-engine concern out of scope
    /// for the distilled command set this core processes.
    pub fn process_instrument_status(&mut self, status: &InstrumentStatus) {
        self.get_or_create_engine(status.instrument_id);
    }

    pub fn check_expirations(&mut self, now_ns: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        for engine in self.matching_engines.values_mut() {
            events.extend(engine.check_expirations(now_ns));
        }
        self.settle_fills(&events, now_ns);
        events
    }

    // -------------------------------------------------------------- commands

    /// Enqueues `command`, stamping it with `ready_ns = command.ts_init() + latency`
    /// (§4.B); a zero-latency command still queues for dispatch on the next
    /// `process` call rather than running synchronously, preserving ordering
    /// against any command already queued for the same instant.
    pub fn send(&mut self, command: TradingCommand) {
        if !self.use_message_queue {
            self.message_queue.push_back(command);
            return;
        }
        let latency = command.latency_ns(&self.latency_model);
        let ready_ns = command.ts_init().saturating_add_nanos(latency);
        let counter = self.inflight_counter.entry(ready_ns.as_u64()).or_insert(0);
        let this_counter = *counter;
        *counter += 1;
        self.inflight_queue.push(InflightCommand { ready_ns, counter: this_counter, command });
    }

    /// Drains every inflight command whose `ready_ns <= now_ns`, then the whole
    /// FIFO `message_queue`, dispatching each to its instrument's matching engine
    /// (§4.E `process`).
    pub fn process(&mut self, now_ns: UnixNanos) -> Vec<OrderEventAny> {
        let mut events = Vec::new();
        while let Some(top) = self.inflight_queue.peek() {
            if top.ready_ns > now_ns {
                break;
            }
            let inflight = self.inflight_queue.pop().expect("peeked Some above");
            events.extend(self.process_trading_command(inflight.command, now_ns));
        }
        while let Some(command) = self.message_queue.pop_front() {
            events.extend(self.process_trading_command(command, now_ns));
        }
        events
    }

    fn process_trading_command(&mut self, command: TradingCommand, ts_now: UnixNanos) -> Vec<OrderEventAny> {
        let instrument_id = command.instrument_id();
        let Some(engine) = self.get_or_create_engine(instrument_id) else { return Vec::new() };
        let events = match command {
            TradingCommand::SubmitOrder { order, .. } => engine.process_order(order, ts_now),
            TradingCommand::ModifyOrder { client_order_id, new_price, new_trigger_price, .. } => {
                engine.process_modify(client_order_id, new_price, new_trigger_price, ts_now)
            }
            TradingCommand::CancelOrder { client_order_id, .. } => engine.process_cancel(client_order_id, ts_now),
            TradingCommand::CancelAllOrders { .. } => engine.process_cancel_all(ts_now),
        };
        self.settle_fills(&events, ts_now);
        events
    }
}

#[cfg(test)]
mod tests {
    use engine_model::{
        enums::{ContingencyType, OrderSide, OrderStatus, TimeInForce},
        identifiers::{ClientOrderId, StrategyId, Symbol},
        instruments::{CurrencyPair, InstrumentAny},
        orders::{OrderAny, OrderCommon, OrderKind},
        types::Price,
        types::Quantity,
    };

    use super::*;

    fn eurusd() -> InstrumentAny {
        InstrumentAny::CurrencyPair(CurrencyPair::new(
            InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM")),
            5,
            0,
            Price::new(0.00001, 5),
            Quantity::new(1.0, 0),
            Quantity::new(10_000_000.0, 0),
            Currency::usd(),
            Currency::new("EUR", 2),
            0.0002,
            0.0007,
        ))
    }

    fn exchange_with_instrument() -> SimulatedExchange {
        let cache = Rc::new(RefCell::new(Cache::new()));
        cache.borrow_mut().add_instrument(eurusd());
        let config = SimulatedExchangeConfig {
            venue: Venue::new("SIM"),
            trader_id: TraderId::new("TRADER-001"),
            account_id: AccountId::new("SIM-001"),
            account_type: AccountType::Margin,
            base_currency: None,
            starting_balances: vec![Money::new(100_000.0, Currency::usd())],
            default_leverage: 1.0,
            frozen_account: false,
            book_type: BookType::L1Tbbo,
            oms_type: OmsType::Netting,
            reject_stop_orders: true,
            support_gtd_orders: true,
            bar_adaptive_high_low_ordering: true,
            max_price_deviation_pct: 0.50,
            use_message_queue: true,
        };
        SimulatedExchange::new(config, FillModel::default(), FeeModelAny::default(), LatencyModel::new(0, 0, 0, 0), cache)
    }

    fn market_buy() -> OrderAny {
        let common = OrderCommon {
            client_order_id: ClientOrderId::new("O-1"),
            venue_order_id: None,
            instrument_id: InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM")),
            strategy_id: StrategyId::new("S-001"),
            side: OrderSide::Buy,
            quantity: Quantity::new(10_000.0, 0),
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
            ts_init: 1_000_000_500.into(),
            ts_last: 0.into(),
        };
        OrderAny::new(common, OrderKind::Market)
    }

    #[test]
    fn test_market_order_fills_and_settles_commission() {
        let mut exchange = exchange_with_instrument();
        let quote = QuoteTick::new(
            InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM")),
            Price::new(1.10000, 5),
            Price::new(1.10002, 5),
            Quantity::new(1_000_000.0, 0),
            Quantity::new(1_000_000.0, 0),
            1_000_000_000.into(),
            1_000_000_000.into(),
        );
        exchange.process_quote_tick(&quote, 1_000_000_000.into());

        exchange.send(TradingCommand::SubmitOrder { order: market_buy(), ts_init: 1_000_000_500.into() });
        let events = exchange.process(1_000_000_500.into());

        let filled = events.iter().any(|e| matches!(e, OrderEventAny::Filled(_)));
        assert!(filled);
        let balance = exchange.account.balance(Currency::usd()).unwrap();
        assert!(balance.total.as_f64() < 100_000.0);
    }

    #[test]
    fn test_zero_latency_command_still_queues_for_next_process_call() {
        let mut exchange = exchange_with_instrument();
        exchange.send(TradingCommand::SubmitOrder { order: market_buy(), ts_init: 1_000_000_500.into() });
        assert_eq!(exchange.inflight_queue.len(), 1);
        assert!(exchange.process(0.into()).is_empty());
        assert!(!exchange.process(1_000_000_500.into()).is_empty());
    }

    fn market_buy_at(id: &str, ts_init: u64) -> OrderAny {
        let common = OrderCommon {
            client_order_id: ClientOrderId::new(id),
            venue_order_id: None,
            instrument_id: InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM")),
            strategy_id: StrategyId::new("S-001"),
            side: OrderSide::Buy,
            quantity: Quantity::new(10_000.0, 0),
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
            ts_init: ts_init.into(),
            ts_last: 0.into(),
        };
        OrderAny::new(common, OrderKind::Market)
    }

    /// §8 invariant 6: commands with identical (zero) latency dispatch to the
    /// matching engine in submission-time order, not in the order `send` was
    /// called in.
    #[test]
    fn test_equal_latency_commands_dispatch_in_ts_init_order_not_send_order() {
        let mut exchange = exchange_with_instrument();
        exchange.send(TradingCommand::SubmitOrder { order: market_buy_at("O-LATE", 200), ts_init: 200.into() });
        exchange.send(TradingCommand::SubmitOrder { order: market_buy_at("O-EARLY", 100), ts_init: 100.into() });

        let events = exchange.process(200.into());
        let submitted: Vec<ClientOrderId> = events
            .iter()
            .filter_map(|e| match e {
                OrderEventAny::Submitted(c) => Some(c.client_order_id),
                _ => None,
            })
            .collect();
        assert_eq!(submitted, vec![ClientOrderId::new("O-EARLY"), ClientOrderId::new("O-LATE")]);
    }
}
