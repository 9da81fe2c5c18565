//! Merges market data into one deterministically ordered stream (§4.F), grounded
//! on the teacher's `nautilus_backtest::data_iterator` merge but using three fixed
//! cursors with a fixed tie-break priority rather than a dynamic signed-priority
//! heap, per the exact ordering this core's callers depend on.

use std::collections::HashMap;

use anyhow::{bail, ensure};
use engine_core::UnixNanos;
use engine_model::{
    data::{Bar, BarAggregation, Data, GenericData, HasTsInit, InstrumentStatus, OrderBookDelta, OrderBookDeltas, QuoteTick, TradeTick},
    enums::PriceType,
    identifiers::InstrumentId,
    instruments::{Instrument, InstrumentAny},
};

const START_BUFFER_NS: u64 = 1_000_000; // 1ms, avoids replaying a tick synthesised at start_ns (§9)

/// Raw, ungrouped data fed to [`BacktestDataProducer::try_new`] (§4.F inputs).
#[derive(Debug, Default)]
pub struct DataProducerInput {
    pub instruments: Vec<InstrumentAny>,
    pub generic_data: Vec<GenericData>,
    pub order_book_deltas: Vec<OrderBookDelta>,
    pub order_book_delta_batches: Vec<OrderBookDeltas>,
    pub bars: Vec<Bar>,
    pub instrument_status: Vec<InstrumentStatus>,
    pub quote_ticks: HashMap<InstrumentId, Vec<QuoteTick>>,
    pub trade_ticks: HashMap<InstrumentId, Vec<TradeTick>>,
    pub bars_bid: HashMap<InstrumentId, HashMap<BarAggregation, Vec<Bar>>>,
    pub bars_ask: HashMap<InstrumentId, HashMap<BarAggregation, Vec<Bar>>>,
    pub bar_adaptive_high_low_ordering: bool,
}

/// Turns one instrument's paired BID/ASK bar tables into quote ticks, walking each
/// pair's OHLC swing points in "adaptive" order on a down bar (§4.D.1, §4.F step 2).
fn bars_to_quotes(bid: &[Bar], ask: &[Bar], adaptive: bool) -> anyhow::Result<Vec<QuoteTick>> {
    ensure!(bid.len() == ask.len(), "bid/ask bar tables have mismatched length");
    let swing = |b: &Bar| -> [engine_model::types::Price; 4] {
        if adaptive && b.close.as_f64() < b.open.as_f64() {
            [b.open, b.low, b.high, b.close]
        } else {
            [b.open, b.high, b.low, b.close]
        }
    };
    let mut out = Vec::with_capacity(bid.len() * 4);
    for (b, a) in bid.iter().zip(ask.iter()) {
        ensure!(b.ts_event == a.ts_event, "bid/ask bar pair has mismatched ts_event");
        let bid_points = swing(b);
        let ask_points = swing(a);
        let size = engine_model::types::Quantity::new(b.volume.as_f64() / 4.0, b.volume.precision);
        for i in 0..4 {
            out.push(QuoteTick::new(b.instrument_id, bid_points[i], ask_points[i], size, size, b.ts_event, b.ts_init));
        }
    }
    Ok(out)
}

fn partition_point_ge(ts: &[UnixNanos], target: UnixNanos) -> usize {
    ts.partition_point(|&t| t < target)
}

fn partition_point_le_exclusive(ts: &[UnixNanos], target: UnixNanos) -> usize {
    ts.partition_point(|&t| t <= target)
}

/// The one-time-setup, three-cursor merge producer (§4.F).
#[derive(Debug)]
pub struct BacktestDataProducer {
    book: Vec<Data>,
    quotes: Vec<QuoteTick>,
    trades: Vec<TradeTick>,
    book_ts: Vec<UnixNanos>,
    quote_ts: Vec<UnixNanos>,
    trade_ts: Vec<UnixNanos>,
    book_idx: usize,
    quote_idx: usize,
    trade_idx: usize,
    book_last: usize,
    quote_last: usize,
    trade_last: usize,
    min_ts_ns: UnixNanos,
    max_ts_ns: UnixNanos,
}

impl BacktestDataProducer {
    /// Validates `input` and builds the three sorted streams (§4.F setup steps 1-4).
    pub fn try_new(input: DataProducerInput) -> anyhow::Result<Self> {
        let instrument_ids: std::collections::HashSet<InstrumentId> =
            input.instruments.iter().map(Instrument::id).collect();
        let require_known = |id: InstrumentId| -> anyhow::Result<()> {
            ensure!(instrument_ids.contains(&id), "data references unknown instrument {id}");
            Ok(())
        };
        for id in input.quote_ticks.keys().chain(input.trade_ticks.keys()).chain(input.bars_bid.keys()).chain(input.bars_ask.keys()) {
            require_known(*id)?;
        }
        for d in &input.order_book_deltas {
            require_known(d.instrument_id)?;
        }
        for b in input.order_book_delta_batches.iter() {
            require_known(b.instrument_id())?;
        }
        for b in &input.bars {
            require_known(b.instrument_id)?;
            ensure!(b.price_type != PriceType::Last, "a raw LAST-typed bar cannot be added to the book stream directly");
        }
        for s in &input.instrument_status {
            require_known(s.instrument_id)?;
        }

        let bid_keys: std::collections::HashSet<_> = input.bars_bid.keys().copied().collect();
        let ask_keys: std::collections::HashSet<_> = input.bars_ask.keys().copied().collect();
        ensure!(bid_keys == ask_keys, "bid/ask bar instrument sets do not match");
        for (id, bid_by_agg) in &input.bars_bid {
            let ask_by_agg = &input.bars_ask[id];
            ensure!(
                bid_by_agg.keys().collect::<std::collections::HashSet<_>>()
                    == ask_by_agg.keys().collect::<std::collections::HashSet<_>>(),
                "bid/ask aggregation keys do not match for {id}"
            );
            for (agg, bid_table) in bid_by_agg {
                let ask_table = &ask_by_agg[agg];
                ensure!(bid_table.len() == ask_table.len(), "bid/ask bar table shape mismatch for {id}/{agg:?}");
                for bar in bid_table {
                    ensure!(bar.price_type == PriceType::Bid, "a non-BID bar present in bars_bid for {id}");
                }
                for bar in ask_table {
                    ensure!(bar.price_type == PriceType::Ask, "a non-ASK bar present in bars_ask for {id}");
                }
            }
        }

        let mut quotes = Vec::new();
        let mut trades = Vec::new();
        for instrument in &input.instruments {
            let id = instrument.id();
            if let Some(table) = input.quote_ticks.get(&id) {
                quotes.extend(table.iter().copied());
            } else if let Some(bid_by_agg) = input.bars_bid.get(&id) {
                let ask_by_agg = &input.bars_ask[&id];
                for (agg, bid_table) in bid_by_agg {
                    let ask_table = &ask_by_agg[agg];
                    quotes.extend(bars_to_quotes(bid_table, ask_table, input.bar_adaptive_high_low_ordering)?);
                }
            }
            if let Some(table) = input.trade_ticks.get(&id) {
                trades.extend(table.iter().copied());
            }
        }
        quotes.sort_by_key(|q| q.ts_event);
        trades.sort_by_key(|t| t.ts_event);

        let mut book: Vec<Data> = Vec::new();
        book.extend(input.generic_data.into_iter().map(Data::Generic));
        book.extend(input.order_book_deltas.into_iter().map(Data::Delta));
        book.extend(input.order_book_delta_batches.into_iter().map(Data::Deltas));
        book.extend(input.bars.into_iter().map(Data::Bar));
        book.extend(input.instrument_status.into_iter().map(Data::InstrumentStatus));
        book.sort_by_key(HasTsInit::ts_init);

        let book_ts: Vec<UnixNanos> = book.iter().map(HasTsInit::ts_init).collect();
        let quote_ts: Vec<UnixNanos> = quotes.iter().map(|q| q.ts_init).collect();
        let trade_ts: Vec<UnixNanos> = trades.iter().map(|t| t.ts_init).collect();

        let min_ts_ns = [book_ts.first(), quote_ts.first(), trade_ts.first()]
            .into_iter()
            .flatten()
            .copied()
            .min()
            .unwrap_or_default();
        let max_ts_ns = [book_ts.last(), quote_ts.last(), trade_ts.last()]
            .into_iter()
            .flatten()
            .copied()
            .max()
            .unwrap_or_default();

        if book.is_empty() && quotes.is_empty() && trades.is_empty() {
            bail!("data producer has no data across any stream");
        }

        Ok(Self {
            book,
            quotes,
            trades,
            book_ts,
            quote_ts,
            trade_ts,
            book_idx: 0,
            quote_idx: 0,
            trade_idx: 0,
            book_last: 0,
            quote_last: 0,
            trade_last: 0,
            min_ts_ns,
            max_ts_ns,
        })
    }

    #[must_use]
    pub fn min_ts_ns(&self) -> UnixNanos {
        self.min_ts_ns
    }

    #[must_use]
    pub fn max_ts_ns(&self) -> UnixNanos {
        self.max_ts_ns
    }

    /// Slices every stream to `[start_ns + 1ms, stop_ns]` via `bisect_left`-style
    /// binary search (§4.F iteration, §9 buffer note).
    pub fn setup(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        let buffered_start = start_ns.saturating_add_nanos(START_BUFFER_NS);
        self.book_idx = partition_point_ge(&self.book_ts, buffered_start);
        self.quote_idx = partition_point_ge(&self.quote_ts, buffered_start);
        self.trade_idx = partition_point_ge(&self.trade_ts, buffered_start);
        self.book_last = partition_point_le_exclusive(&self.book_ts, stop_ns);
        self.quote_last = partition_point_le_exclusive(&self.quote_ts, stop_ns);
        self.trade_last = partition_point_le_exclusive(&self.trade_ts, stop_ns);
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.book_idx < self.book_last || self.quote_idx < self.quote_last || self.trade_idx < self.trade_last
    }

    /// Returns the globally-next item by `ts_init`, breaking ties by the fixed
    /// priority `(generic/book, quote, trade)` (§4.F).
    pub fn next(&mut self) -> Option<Data> {
        let book_head = (self.book_idx < self.book_last).then(|| self.book_ts[self.book_idx]);
        let quote_head = (self.quote_idx < self.quote_last).then(|| self.quote_ts[self.quote_idx]);
        let trade_head = (self.trade_idx < self.trade_last).then(|| self.trade_ts[self.trade_idx]);

        let min_ts = [book_head, quote_head, trade_head].into_iter().flatten().min()?;

        if book_head == Some(min_ts) {
            let item = self.book[self.book_idx].clone();
            self.book_idx += 1;
            Some(item)
        } else if quote_head == Some(min_ts) {
            let item = Data::Quote(self.quotes[self.quote_idx]);
            self.quote_idx += 1;
            Some(item)
        } else {
            let item = Data::Trade(self.trades[self.trade_idx]);
            self.trade_idx += 1;
            Some(item)
        }
    }
}

/// Pre-materialised wrapper around a [`BacktestDataProducer`]: iterates the inner
/// producer once over its full range and replays purely via binary search, for
/// callers that replay the same window repeatedly (e.g. parameter sweeps, §4.F).
#[derive(Debug)]
pub struct CachedDataProducer {
    items: Vec<Data>,
    timestamps: Vec<UnixNanos>,
    cursor: usize,
    last: usize,
}

impl CachedDataProducer {
    #[must_use]
    pub fn new(mut inner: BacktestDataProducer) -> Self {
        inner.setup(0.into(), inner.max_ts_ns());
        let mut items = Vec::new();
        while let Some(item) = inner.next() {
            items.push(item);
        }
        let timestamps = items.iter().map(HasTsInit::ts_init).collect();
        Self { items, timestamps, cursor: 0, last: 0 }
    }

    pub fn setup(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        let buffered_start = start_ns.saturating_add_nanos(START_BUFFER_NS);
        self.cursor = partition_point_ge(&self.timestamps, buffered_start);
        self.last = partition_point_le_exclusive(&self.timestamps, stop_ns);
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.cursor < self.last
    }

    pub fn next(&mut self) -> Option<Data> {
        if !self.has_data() {
            return None;
        }
        let item = self.items[self.cursor].clone();
        self.cursor += 1;
        Some(item)
    }

    /// Restores the cursor range from this producer's own cached length, not
    /// some other stream's (§9: the historical `_trade_index_last` copy-paste bug).
    pub fn reset(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        self.setup(start_ns, stop_ns);
    }
}

/// A closed sum type over the two producer implementations (§9 design note:
/// prefer a closed enum to virtual dispatch when the variant set is known).
#[derive(Debug)]
pub enum DataProducer {
    Backtest(BacktestDataProducer),
    Cached(CachedDataProducer),
}

impl DataProducer {
    pub fn setup(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        match self {
            Self::Backtest(p) => p.setup(start_ns, stop_ns),
            Self::Cached(p) => p.setup(start_ns, stop_ns),
        }
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        match self {
            Self::Backtest(p) => p.has_data(),
            Self::Cached(p) => p.has_data(),
        }
    }

    pub fn next(&mut self) -> Option<Data> {
        match self {
            Self::Backtest(p) => p.next(),
            Self::Cached(p) => p.next(),
        }
    }
}

impl crate::engine::NextData for BacktestDataProducer {
    fn setup(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        Self::setup(self, start_ns, stop_ns);
    }

    fn has_data(&self) -> bool {
        Self::has_data(self)
    }

    fn next(&mut self) -> Option<Data> {
        Self::next(self)
    }
}

impl crate::engine::NextData for CachedDataProducer {
    fn setup(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        Self::setup(self, start_ns, stop_ns);
    }

    fn has_data(&self) -> bool {
        Self::has_data(self)
    }

    fn next(&mut self) -> Option<Data> {
        Self::next(self)
    }
}

impl crate::engine::NextData for DataProducer {
    fn setup(&mut self, start_ns: UnixNanos, stop_ns: UnixNanos) {
        Self::setup(self, start_ns, stop_ns);
    }

    fn has_data(&self) -> bool {
        Self::has_data(self)
    }

    fn next(&mut self) -> Option<Data> {
        Self::next(self)
    }
}

#[cfg(test)]
mod tests {
    use engine_model::{
        identifiers::{Symbol, Venue},
        instruments::CurrencyPair,
        types::{Currency, Price, Quantity},
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

    fn quote(ts: u64) -> QuoteTick {
        QuoteTick::new(
            InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM")),
            Price::new(1.1, 5),
            Price::new(1.10002, 5),
            Quantity::new(1000.0, 0),
            Quantity::new(1000.0, 0),
            ts.into(),
            ts.into(),
        )
    }

    #[test]
    fn test_unknown_instrument_is_an_integrity_error() {
        let mut input = DataProducerInput { instruments: vec![eurusd()], ..Default::default() };
        input.quote_ticks.insert(InstrumentId::from("GBP/USD.SIM"), vec![quote(1)]);
        assert!(BacktestDataProducer::try_new(input).is_err());
    }

    #[test]
    fn test_merge_orders_by_ts_init_with_quote_before_trade_tie_break() {
        let id = InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM"));
        let mut input = DataProducerInput { instruments: vec![eurusd()], ..Default::default() };
        input.quote_ticks.insert(id, vec![quote(10)]);
        input.trade_ticks.insert(
            id,
            vec![TradeTick::new(id, Price::new(1.1, 5), Quantity::new(100.0, 0), engine_model::enums::AggressorSide::Buyer, engine_model::identifiers::TradeId::new("T-1"), 10.into(), 10.into())],
        );
        let mut producer = BacktestDataProducer::try_new(input).unwrap();
        producer.setup(0.into(), 100.into());
        let first = producer.next().unwrap();
        assert!(matches!(first, Data::Quote(_)));
        let second = producer.next().unwrap();
        assert!(matches!(second, Data::Trade(_)));
        assert!(producer.next().is_none());
    }

    #[test]
    fn test_start_buffer_excludes_tick_exactly_at_start_ns() {
        let id = InstrumentId::new(Symbol::new("EUR/USD"), Venue::new("SIM"));
        let mut input = DataProducerInput { instruments: vec![eurusd()], ..Default::default() };
        input.quote_ticks.insert(id, vec![quote(1_000_000_000), quote(1_000_000_001)]);
        let mut producer = BacktestDataProducer::try_new(input).unwrap();
        producer.setup(1_000_000_000.into(), 2_000_000_000.into());
        assert!(!producer.has_data());
    }
}
