//! Fixed-point decimal types: [`Price`], [`Quantity`], [`Money`], and [`Currency`].
//!
//! All three carry a per-instrument precision (number of decimal places). Arithmetic
//! and comparisons between two values of the same type are only valid when their
//! precisions match; mismatched precision is a model error (§7) and panics, since it
//! can only arise from a programmer composing values from two different instruments.

use std::{
    fmt::{Debug, Display},
    ops::{Add, Sub},
    str::FromStr,
};

use rust_decimal::{prelude::FromPrimitive, Decimal};
use ustr::Ustr;

fn assert_same_precision(a: u8, b: u8, ty: &str) {
    assert!(
        a == b,
        "precision mismatch constructing/operating on {ty}: {a} != {b}"
    );
}

macro_rules! fixed_point_decimal {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name {
            raw: Decimal,
            pub precision: u8,
        }

        impl $name {
            #[must_use]
            pub fn new(value: f64, precision: u8) -> Self {
                let raw = Decimal::from_f64(value)
                    .unwrap_or_else(|| panic!("cannot represent {value} at precision {precision}"))
                    .round_dp(u32::from(precision));
                Self { raw, precision }
            }

            #[must_use]
            pub fn zero(precision: u8) -> Self {
                Self { raw: Decimal::ZERO, precision }
            }

            #[must_use]
            pub fn as_f64(&self) -> f64 {
                use rust_decimal::prelude::ToPrimitive;
                self.raw.to_f64().unwrap_or(0.0)
            }

            #[must_use]
            pub fn as_decimal(&self) -> Decimal {
                self.raw
            }

            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.raw.is_zero()
            }

            #[must_use]
            pub fn is_positive(&self) -> bool {
                self.raw.is_sign_positive() && !self.raw.is_zero()
            }

            /// One minimum price/size increment at this value's precision.
            #[must_use]
            pub fn one_tick(precision: u8) -> Self {
                Self { raw: Decimal::new(1, u32::from(precision)), precision }
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                assert_same_precision(self.precision, rhs.precision, stringify!($name));
                Self { raw: self.raw + rhs.raw, precision: self.precision }
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                assert_same_precision(self.precision, rhs.precision, stringify!($name));
                Self { raw: self.raw - rhs.raw, precision: self.precision }
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.raw)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.raw)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                let raw = Decimal::from_str(value)
                    .unwrap_or_else(|e| panic!("invalid decimal string '{value}': {e}"));
                let precision = raw.scale() as u8;
                Self { raw, precision }
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self { raw: Decimal::from(value), precision: 0 }
            }
        }
    };
}

fixed_point_decimal!(
    /// A fixed-point price, precision-tagged to its instrument's `price_precision`.
    Price
);
fixed_point_decimal!(
    /// A fixed-point quantity, precision-tagged to its instrument's `size_precision`.
    Quantity
);

impl Price {
    /// Returns `self` shifted by `n_ticks` of `tick_size`, in the given direction.
    #[must_use]
    pub fn shift_ticks(&self, tick_size: Price, n_ticks: i64) -> Self {
        assert_same_precision(self.precision, tick_size.precision, "Price");
        let delta = tick_size.raw * Decimal::from(n_ticks);
        Self { raw: self.raw + delta, precision: self.precision }
    }
}

/// A currency code with its own decimal precision, e.g. `USD` (2) or `BTC` (8).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Currency {
    pub code: Ustr,
    pub precision: u8,
}

impl Currency {
    #[must_use]
    pub fn new(code: &str, precision: u8) -> Self {
        Self { code: Ustr::from(code), precision }
    }

    #[must_use]
    pub fn usd() -> Self {
        Self::new("USD", 2)
    }

    #[must_use]
    pub fn btc() -> Self {
        Self::new("BTC", 8)
    }
}

impl Debug for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Currency({})", self.code)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// A fixed-point monetary amount denominated in a [`Currency`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money {
    raw: Decimal,
    pub currency: Currency,
}

impl Money {
    #[must_use]
    pub fn new(amount: f64, currency: Currency) -> Self {
        let raw = Decimal::from_f64(amount)
            .unwrap_or_else(|| panic!("cannot represent {amount} at precision {}", currency.precision))
            .round_dp(u32::from(currency.precision));
        Self { raw, currency }
    }

    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self { raw: Decimal::ZERO, currency }
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.raw.to_f64().unwrap_or(0.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.currency, rhs.currency, "cannot add Money of different currencies");
        Self { raw: self.raw + rhs.raw, currency: self.currency }
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.currency, rhs.currency, "cannot subtract Money of different currencies");
        Self { raw: self.raw - rhs.raw, currency: self.currency }
    }
}

impl Debug for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Money({} {})", self.raw, self.currency)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.raw, self.currency)
    }
}

impl From<&str> for Money {
    /// Parses `"<amount> <CODE>"`, e.g. `"1 USD"`.
    fn from(value: &str) -> Self {
        let (amount, code) = value
            .split_once(' ')
            .unwrap_or_else(|| panic!("invalid Money string '{value}', expected '<amount> <CODE>'"));
        let raw = Decimal::from_str(amount).unwrap_or_else(|e| panic!("invalid decimal '{amount}': {e}"));
        let currency = Currency::new(code, raw.scale().max(2) as u8);
        Self { raw, currency }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_arithmetic_same_precision() {
        let a = Price::new(1.10000, 5);
        let b = Price::one_tick(5);
        assert_eq!((a + b).as_f64(), 1.10001);
    }

    #[test]
    #[should_panic(expected = "precision mismatch")]
    fn test_price_arithmetic_mismatched_precision_panics() {
        let a = Price::new(1.1, 1);
        let b = Price::new(1.10, 2);
        let _ = a + b;
    }

    #[test]
    fn test_shift_ticks() {
        let px = Price::new(1.10002, 5);
        let tick = Price::one_tick(5);
        let shifted = px.shift_ticks(tick, -1);
        assert_eq!(shifted.as_f64(), 1.10001);
    }

    #[test]
    fn test_money_from_str_and_add() {
        let a = Money::from("1 USD");
        let b = Money::from("2 USD");
        assert_eq!((a + b).as_f64(), 3.0);
    }
}
