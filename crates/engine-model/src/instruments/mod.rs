//! Static instrument descriptors.

mod any;
mod currency_pair;

pub use any::InstrumentAny;
pub use currency_pair::CurrencyPair;

use crate::{
    identifiers::InstrumentId,
    types::{Currency, Money, Price, Quantity},
};

/// Shared contract for every instrument variant, dispatched through [`InstrumentAny`].
pub trait Instrument {
    fn id(&self) -> InstrumentId;
    fn price_precision(&self) -> u8;
    fn size_precision(&self) -> u8;
    fn tick_size(&self) -> Price;
    fn min_quantity(&self) -> Quantity;
    fn max_quantity(&self) -> Quantity;
    fn quote_currency(&self) -> Currency;
    fn base_currency(&self) -> Option<Currency>;
    fn is_inverse(&self) -> bool;
    fn maker_fee(&self) -> f64;
    fn taker_fee(&self) -> f64;

    /// Notional value of `quantity` at `price`. When `inverse_as_quote` is `true` and
    /// the instrument is inverse, the contract-value convention is reversed — used by
    /// callers that want the notional expressed in quote terms regardless of inversion.
    fn calculate_notional_value(
        &self,
        quantity: Quantity,
        price: Price,
        inverse_as_quote: Option<bool>,
    ) -> f64 {
        let inverse_as_quote = inverse_as_quote.unwrap_or(false);
        if self.is_inverse() && !inverse_as_quote {
            quantity.as_f64() / price.as_f64()
        } else {
            quantity.as_f64() * price.as_f64()
        }
    }

    /// Rounds `price` down to the nearest valid tick for this instrument.
    fn round_to_tick(&self, price: Price) -> Price {
        let tick = self.tick_size().as_f64();
        let ticks = (price.as_f64() / tick).round();
        Price::new(ticks * tick, self.price_precision())
    }
}

/// Money helper shared by every instrument's fee calculations.
#[must_use]
pub fn zero_quote_money(currency: Currency) -> Money {
    Money::zero(currency)
}
