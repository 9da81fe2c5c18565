use std::{fmt::Display, str::FromStr};

use ustr::Ustr;

use super::{Symbol, Venue};

/// A globally unique instrument identifier, decomposed into `symbol` and `venue`.
///
/// Ordered lexicographically by its combined string form, so instrument ids can be
/// used as a stable tie-break key wherever the spec requires one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrumentId {
    pub symbol: Symbol,
    pub venue: Venue,
}

impl InstrumentId {
    #[must_use]
    pub fn new(symbol: Symbol, venue: Venue) -> Self {
        Self { symbol, venue }
    }
}

impl From<&str> for InstrumentId {
    /// Parses `"SYMBOL.VENUE"` into an [`InstrumentId`].
    ///
    /// # Panics
    ///
    /// Panics if `value` does not contain exactly one `.` separator.
    fn from(value: &str) -> Self {
        let (symbol, venue) = value
            .split_once('.')
            .unwrap_or_else(|| panic!("invalid InstrumentId string '{value}', expected SYMBOL.VENUE"));
        Self {
            symbol: Symbol::new(symbol),
            venue: Venue::new(venue),
        }
    }
}

impl FromStr for InstrumentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Display for InstrumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

impl std::fmt::Debug for InstrumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstrumentId('{self}')")
    }
}

impl InstrumentId {
    #[must_use]
    pub fn as_ustr(&self) -> Ustr {
        Ustr::from(self.to_string().as_str())
    }
}
