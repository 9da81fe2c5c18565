//! Commission calculation (§4.A), mirroring an instrument's configured maker/taker
//! fee rates or a fixed per-fill commission.

use engine_model::{
    enums::LiquiditySide,
    instruments::{Instrument, InstrumentAny},
    types::{Currency, Money, Price, Quantity},
};

pub trait FeeModel: std::fmt::Debug {
    fn calculate(
        &self,
        instrument: &InstrumentAny,
        liquidity_side: LiquiditySide,
        last_qty: Quantity,
        last_px: Price,
    ) -> Money;
}

/// Commission is a fixed amount per fill, independent of quantity/price/liquidity.
#[derive(Debug, Clone, Copy)]
pub struct FixedFeeModel {
    pub commission: Money,
}

impl FixedFeeModel {
    #[must_use]
    pub fn new(commission: Money) -> Self {
        Self { commission }
    }
}

impl FeeModel for FixedFeeModel {
    fn calculate(
        &self,
        _instrument: &InstrumentAny,
        _liquidity_side: LiquiditySide,
        _last_qty: Quantity,
        _last_px: Price,
    ) -> Money {
        self.commission
    }
}

/// Commission is `notional * maker_fee` or `notional * taker_fee`, per the
/// instrument's own configured rates and `calculate_notional_value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakerTakerFeeModel;

impl FeeModel for MakerTakerFeeModel {
    fn calculate(
        &self,
        instrument: &InstrumentAny,
        liquidity_side: LiquiditySide,
        last_qty: Quantity,
        last_px: Price,
    ) -> Money {
        let notional = instrument.calculate_notional_value(last_qty, last_px, None);
        let rate = match liquidity_side {
            LiquiditySide::Maker => instrument.maker_fee(),
            LiquiditySide::Taker => instrument.taker_fee(),
            LiquiditySide::NoLiquiditySide => 0.0,
        };
        Money::new(notional * rate, instrument.quote_currency())
    }
}

#[derive(Debug, Clone)]
pub enum FeeModelAny {
    Fixed(FixedFeeModel),
    MakerTaker(MakerTakerFeeModel),
}

impl FeeModelAny {
    #[must_use]
    pub fn calculate(
        &self,
        instrument: &InstrumentAny,
        liquidity_side: LiquiditySide,
        last_qty: Quantity,
        last_px: Price,
    ) -> Money {
        match self {
            Self::Fixed(model) => model.calculate(instrument, liquidity_side, last_qty, last_px),
            Self::MakerTaker(model) => model.calculate(instrument, liquidity_side, last_qty, last_px),
        }
    }
}

impl Default for FeeModelAny {
    fn default() -> Self {
        Self::MakerTaker(MakerTakerFeeModel)
    }
}

#[cfg(test)]
mod tests {
    use engine_model::{enums::OrderSide, identifiers::InstrumentId, instruments::CurrencyPair};

    use super::*;

    fn audusd() -> InstrumentAny {
        InstrumentAny::CurrencyPair(CurrencyPair::new(
            InstrumentId::from("AUD/USD.SIM"),
            5,
            0,
            Price::new(0.00001, 5),
            Quantity::new(1.0, 0),
            Quantity::new(10_000_000.0, 0),
            Currency::usd(),
            Currency::new("AUD", 2),
            0.0002,
            0.0007,
        ))
    }

    #[test]
    fn test_fixed_fee_model_ignores_notional() {
        let model = FeeModelAny::Fixed(FixedFeeModel::new(Money::new(2.0, Currency::usd())));
        let instrument = audusd();
        let commission = model.calculate(
            &instrument,
            LiquiditySide::Taker,
            Quantity::new(1_000_000.0, 0),
            Price::new(0.8, 5),
        );
        assert_eq!(commission.as_f64(), 2.0);
    }

    #[test]
    fn test_maker_taker_fee_model_scales_with_notional() {
        let model = FeeModelAny::MakerTaker(MakerTakerFeeModel);
        let instrument = audusd();
        let qty = Quantity::new(100_000.0, 0);
        let px = Price::new(0.8, 5);
        let maker = model.calculate(&instrument, LiquiditySide::Maker, qty, px);
        let taker = model.calculate(&instrument, LiquiditySide::Taker, qty, px);
        assert!(taker.as_f64() >= maker.as_f64());
        let _ = OrderSide::Buy;
    }
}
