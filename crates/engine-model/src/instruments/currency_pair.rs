use crate::{
    identifiers::InstrumentId,
    types::{Currency, Price, Quantity},
};

use super::Instrument;

/// A spot FX/crypto currency pair instrument, e.g. `EUR/USD` or `BTC-PERP`.
#[derive(Clone, Copy, Debug)]
pub struct CurrencyPair {
    pub id: InstrumentId,
    pub price_precision: u8,
    pub size_precision: u8,
    pub tick_size: Price,
    pub min_quantity: Quantity,
    pub max_quantity: Quantity,
    pub quote_currency: Currency,
    pub base_currency: Currency,
    pub is_inverse: bool,
    pub maker_fee: f64,
    pub taker_fee: f64,
}

impl CurrencyPair {
    #[must_use]
    pub fn new(
        id: InstrumentId,
        price_precision: u8,
        size_precision: u8,
        tick_size: Price,
        min_quantity: Quantity,
        max_quantity: Quantity,
        quote_currency: Currency,
        base_currency: Currency,
        maker_fee: f64,
        taker_fee: f64,
    ) -> Self {
        Self {
            id,
            price_precision,
            size_precision,
            tick_size,
            min_quantity,
            max_quantity,
            quote_currency,
            base_currency,
            is_inverse: false,
            maker_fee,
            taker_fee,
        }
    }
}

impl Instrument for CurrencyPair {
    fn id(&self) -> InstrumentId {
        self.id
    }

    fn price_precision(&self) -> u8 {
        self.price_precision
    }

    fn size_precision(&self) -> u8 {
        self.size_precision
    }

    fn tick_size(&self) -> Price {
        self.tick_size
    }

    fn min_quantity(&self) -> Quantity {
        self.min_quantity
    }

    fn max_quantity(&self) -> Quantity {
        self.max_quantity
    }

    fn quote_currency(&self) -> Currency {
        self.quote_currency
    }

    fn base_currency(&self) -> Option<Currency> {
        Some(self.base_currency)
    }

    fn is_inverse(&self) -> bool {
        self.is_inverse
    }

    fn maker_fee(&self) -> f64 {
        self.maker_fee
    }

    fn taker_fee(&self) -> f64 {
        self.taker_fee
    }
}
