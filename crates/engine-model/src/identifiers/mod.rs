//! Interned string identifiers for the domain data model.

mod instrument_id;

pub use instrument_id::InstrumentId;
use ustr::Ustr;

macro_rules! interned_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub Ustr);

        impl $name {
            #[must_use]
            pub fn new(s: &str) -> Self {
                Self(Ustr::from(s))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}('{}')", stringify!($name), self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<Ustr> for $name {
            fn from(s: Ustr) -> Self {
                Self(s)
            }
        }
    };
}

interned_identifier!(
    /// Identifies a trading venue, e.g. `"BINANCE"`.
    Venue
);
interned_identifier!(
    /// Identifies a symbol within a venue, e.g. `"BTC-PERP"`.
    Symbol
);
interned_identifier!(
    /// Identifies a trader session.
    TraderId
);
interned_identifier!(
    /// Identifies a strategy instance within a trader.
    StrategyId
);
interned_identifier!(
    /// Identifies an account at a venue.
    AccountId
);
interned_identifier!(
    /// A client-assigned order identifier, unique for the lifetime of a session.
    ClientOrderId
);
interned_identifier!(
    /// A venue-assigned order identifier, present once an order is accepted.
    VenueOrderId
);
interned_identifier!(
    /// Identifies a position, either per-strategy-instrument (NETTING) or per-order (HEDGING).
    PositionId
);
interned_identifier!(
    /// Identifies an individual trade (fill) event.
    TradeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interned_identifier_roundtrip() {
        let v = Venue::from("BINANCE");
        assert_eq!(v.as_str(), "BINANCE");
        assert_eq!(v, Venue::new("BINANCE"));
    }
}
