//! Enumerations for the domain data model.
//!
//! Each enum follows the same derive pattern: `Display`/`FromStr` via `strum` for
//! human-readable (de)serialisation at the event/config boundary, `Ord` so values can
//! key ordered collections where a stable tie-break is required.

use strum::{AsRefStr, Display, EnumIter, EnumString, FromRepr};

macro_rules! domain_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord,
            AsRefStr, FromRepr, EnumIter, EnumString,
        )]
        #[strum(ascii_case_insensitive)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        $vis enum $name {
            $($variant),+
        }
    };
}

domain_enum! {
    /// The side of an order or a fill.
    pub enum OrderSide { Buy, Sell }
}

impl OrderSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

domain_enum! {
    /// The type of an order, dispatched on at a single `match` site in the matching engine.
    pub enum OrderType {
        Market,
        Limit,
        StopMarket,
        StopLimit,
        MarketToLimit,
        MarketIfTouched,
        LimitIfTouched,
        TrailingStopMarket,
        TrailingStopLimit,
    }
}

domain_enum! {
    /// Order lifecycle status; transitions are enforced strictly monotone.
    pub enum OrderStatus {
        Initialized,
        Submitted,
        Accepted,
        Rejected,
        PendingUpdate,
        PendingCancel,
        Triggered,
        PartiallyFilled,
        Filled,
        Canceled,
        Expired,
    }
}

impl OrderStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Filled | Self::Canceled | Self::Expired)
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Triggered | Self::PartiallyFilled | Self::PendingUpdate | Self::PendingCancel
        )
    }
}

domain_enum! {
    /// Time-in-force policy governing order persistence.
    pub enum TimeInForce { Gtc, Ioc, Fok, Gtd, Day }
}

domain_enum! {
    /// Linkage semantics between contingent orders.
    pub enum ContingencyType { NoContingency, Oto, Oco, Ouo }
}

domain_enum! {
    /// Whether a fill consumed or provided liquidity.
    pub enum LiquiditySide { NoLiquiditySide, Maker, Taker }
}

domain_enum! {
    /// Order management system style for position keying.
    pub enum OmsType { Unspecified, Netting, Hedging }
}

domain_enum! {
    /// Account ledger classification.
    pub enum AccountType { Cash, Margin, Betting }
}

domain_enum! {
    /// Market-depth representation level maintained by a matching engine's order book.
    pub enum BookType { L1Tbbo, L2Mbp, L3Mbo }
}

domain_enum! {
    /// Net directional exposure of a position.
    pub enum PositionSide { Flat, Long, Short }
}

domain_enum! {
    /// The side of the market that crossed the spread on a trade.
    pub enum AggressorSide { NoAggressor, Buyer, Seller }
}

domain_enum! {
    /// Price field a bar's OHLC values were aggregated from.
    pub enum PriceType { Bid, Ask, Mid, Last }
}

domain_enum! {
    /// A venue or instrument trading-session transition (§6 `InstrumentStatus`/`VenueStatus`).
    pub enum MarketStatusAction { PreOpen, Open, Pause, Halt, Close, PostClose }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_order_side_display_and_parse() {
        assert_eq!(OrderSide::Buy.to_string(), "BUY");
        assert_eq!(OrderSide::from_str("sell").unwrap(), OrderSide::Sell);
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_order_status_terminal_and_open() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(OrderStatus::Accepted.is_open());
        assert!(!OrderStatus::Initialized.is_open());
    }
}
