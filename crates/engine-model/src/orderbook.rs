//! A minimal L2 order book: price levels per side, supporting delta application and
//! the book-walk used by the matching engine's fill simulation (§3, §4.D.3).

use std::collections::BTreeMap;

use crate::{
    data::{BookAction, OrderBookDelta},
    enums::{BookType, OrderSide},
    types::{Price, Quantity},
};

/// Sentinel used for `simulate_order_fills` to mean "no price limit" (§4.D.3): `+inf`
/// for a BUY walking the ask side, `-inf` for a SELL walking the bid side.
#[must_use]
pub fn market_sentinel_price(side: OrderSide, precision: u8) -> Price {
    match side {
        OrderSide::Buy => Price::new(f64::MAX, precision),
        OrderSide::Sell => Price::new(f64::MIN, precision),
    }
}

#[derive(Debug, Default)]
pub struct OrderBook {
    pub book_type: BookType,
    bids: BTreeMap<OrderedPrice, Quantity>,
    asks: BTreeMap<OrderedPrice, Quantity>,
}

impl Default for BookType {
    fn default() -> Self {
        Self::L1Tbbo
    }
}

/// Wraps [`Price`] with a total order so it can key a `BTreeMap` (bids are walked
/// descending, asks ascending).
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedPrice(Price);

impl Eq for OrderedPrice {}

impl PartialOrd for OrderedPrice {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedPrice {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .as_f64()
            .partial_cmp(&other.0.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl OrderBook {
    #[must_use]
    pub fn new(book_type: BookType) -> Self {
        Self { book_type, bids: BTreeMap::new(), asks: BTreeMap::new() }
    }

    pub fn apply(&mut self, delta: &OrderBookDelta) {
        let side_map = match delta.side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        };
        match delta.action {
            BookAction::Add | BookAction::Update => {
                if delta.size.is_zero() {
                    side_map.remove(&OrderedPrice(delta.price));
                } else {
                    side_map.insert(OrderedPrice(delta.price), delta.size);
                }
            }
            BookAction::Delete => {
                side_map.remove(&OrderedPrice(delta.price));
            }
            BookAction::Clear => side_map.clear(),
        }
    }

    /// Replaces the single top-of-book level for `L1_TBBO` books from a quote tick.
    pub fn update_top(&mut self, bid_price: Price, bid_size: Quantity, ask_price: Price, ask_size: Quantity) {
        self.bids.clear();
        self.asks.clear();
        self.bids.insert(OrderedPrice(bid_price), bid_size);
        self.asks.insert(OrderedPrice(ask_price), ask_size);
    }

    #[must_use]
    pub fn best_bid_price(&self) -> Option<Price> {
        self.bids.keys().next_back().map(|p| p.0)
    }

    #[must_use]
    pub fn best_ask_price(&self) -> Option<Price> {
        self.asks.keys().next().map(|p| p.0)
    }

    #[must_use]
    pub fn midpoint(&self) -> Option<f64> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(b), Some(a)) => Some((b.as_f64() + a.as_f64()) / 2.0),
            _ => None,
        }
    }

    /// Walks the opposing side (BUY walks asks ascending, SELL walks bids descending)
    /// up to (and including) `limit_price`, consuming up to `quantity`, returning
    /// `(fill_price, fill_qty)` tuples in walk order (§4.D.3).
    #[must_use]
    pub fn simulate_order_fills(&self, side: OrderSide, limit_price: Price, quantity: Quantity) -> Vec<(Price, Quantity)> {
        let mut remaining = quantity.as_f64();
        let mut fills = Vec::new();
        let precision = quantity.precision;

        fn push_level(
            price: Price,
            level_qty: Quantity,
            precision: u8,
            remaining: &mut f64,
            fills: &mut Vec<(Price, Quantity)>,
        ) {
            if *remaining <= 0.0 {
                return;
            }
            let take = remaining.min(level_qty.as_f64());
            fills.push((price, Quantity::new(take, precision)));
            *remaining -= take;
        }

        match side {
            OrderSide::Buy => {
                for (price, qty) in &self.asks {
                    if price.0.as_f64() > limit_price.as_f64() {
                        break;
                    }
                    push_level(price.0, *qty, precision, &mut remaining, &mut fills);
                    if remaining <= 0.0 {
                        break;
                    }
                }
            }
            OrderSide::Sell => {
                for (price, qty) in self.bids.iter().rev() {
                    if price.0.as_f64() < limit_price.as_f64() {
                        break;
                    }
                    push_level(price.0, *qty, precision, &mut remaining, &mut fills);
                    if remaining <= 0.0 {
                        break;
                    }
                }
            }
        }

        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_order_fills_walks_multiple_levels() {
        let mut book = OrderBook::new(BookType::L2Mbp);
        book.apply(&OrderBookDelta {
            instrument_id: crate::identifiers::InstrumentId::from("EUR/USD.SIM"),
            action: BookAction::Add,
            side: OrderSide::Sell,
            price: Price::new(1.10002, 5),
            size: Quantity::new(5_000.0, 0),
            order_id: 1,
            ts_event: 0.into(),
            ts_init: 0.into(),
        });
        book.apply(&OrderBookDelta {
            instrument_id: crate::identifiers::InstrumentId::from("EUR/USD.SIM"),
            action: BookAction::Add,
            side: OrderSide::Sell,
            price: Price::new(1.10003, 5),
            size: Quantity::new(3_000.0, 0),
            order_id: 2,
            ts_event: 0.into(),
            ts_init: 0.into(),
        });

        let fills = book.simulate_order_fills(OrderSide::Buy, Price::new(1.10003, 5), Quantity::new(10_000.0, 0));
        let total: f64 = fills.iter().map(|(_, q)| q.as_f64()).sum();
        assert_eq!(total, 8_000.0);
        assert_eq!(fills.len(), 2);
    }
}
