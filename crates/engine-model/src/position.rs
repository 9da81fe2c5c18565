//! Net position tracking, keyed per strategy-instrument (NETTING) or per-order (HEDGING).

use crate::{
    enums::{OrderSide, PositionSide},
    identifiers::{InstrumentId, PositionId},
    types::{Price, Quantity},
};

/// A net position in one instrument. Closed iff `quantity == 0`.
#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub position_id: PositionId,
    pub instrument_id: InstrumentId,
    pub side: PositionSide,
    pub quantity: Quantity,
    pub avg_open_price: f64,
    pub peak_qty: Quantity,
    pub realized_pnl: f64,
}

impl Position {
    #[must_use]
    pub fn flat(position_id: PositionId, instrument_id: InstrumentId, precision: u8) -> Self {
        Self {
            position_id,
            instrument_id,
            side: PositionSide::Flat,
            quantity: Quantity::zero(precision),
            avg_open_price: 0.0,
            peak_qty: Quantity::zero(precision),
            realized_pnl: 0.0,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Signed quantity: positive for LONG, negative for SHORT.
    #[must_use]
    pub fn signed_qty(&self) -> f64 {
        match self.side {
            PositionSide::Long => self.quantity.as_f64(),
            PositionSide::Short => -self.quantity.as_f64(),
            PositionSide::Flat => 0.0,
        }
    }

    /// Applies a fill, updating side/quantity/avg price and realising PnL on any
    /// quantity that reduces (rather than opens or increases) the position.
    pub fn apply_fill(&mut self, fill_side: OrderSide, fill_qty: Quantity, fill_px: Price) {
        let fill_signed = match fill_side {
            OrderSide::Buy => fill_qty.as_f64(),
            OrderSide::Sell => -fill_qty.as_f64(),
        };
        let prior_signed = self.signed_qty();
        let new_signed = prior_signed + fill_signed;

        let is_reducing = prior_signed != 0.0 && prior_signed.signum() != fill_signed.signum();
        if is_reducing {
            let closed_qty = fill_signed.abs().min(prior_signed.abs());
            let pnl_per_unit = if prior_signed > 0.0 {
                fill_px.as_f64() - self.avg_open_price
            } else {
                self.avg_open_price - fill_px.as_f64()
            };
            self.realized_pnl += pnl_per_unit * closed_qty;
        } else {
            let prior_notional = self.avg_open_price * prior_signed.abs();
            let new_notional = prior_notional + fill_px.as_f64() * fill_signed.abs();
            let new_abs = prior_signed.abs() + fill_signed.abs();
            if new_abs > 0.0 {
                self.avg_open_price = new_notional / new_abs;
            }
        }

        self.side = if new_signed > 0.0 {
            PositionSide::Long
        } else if new_signed < 0.0 {
            PositionSide::Short
        } else {
            PositionSide::Flat
        };
        self.quantity = Quantity::new(new_signed.abs(), self.quantity.precision);
        if self.quantity.as_f64() > self.peak_qty.as_f64() {
            self.peak_qty = self.quantity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_position() -> Position {
        Position::flat(PositionId::new("P-1"), InstrumentId::from("EUR/USD.SIM"), 0)
    }

    #[test]
    fn test_open_long_then_reduce() {
        let mut pos = new_position();
        pos.apply_fill(OrderSide::Buy, Quantity::new(100.0, 0), Price::new(1.1, 5));
        assert_eq!(pos.side, PositionSide::Long);
        assert_eq!(pos.quantity.as_f64(), 100.0);

        pos.apply_fill(OrderSide::Sell, Quantity::new(40.0, 0), Price::new(1.2, 5));
        assert_eq!(pos.quantity.as_f64(), 60.0);
        assert!(pos.realized_pnl > 0.0);
    }

    #[test]
    fn test_fully_closed_position() {
        let mut pos = new_position();
        pos.apply_fill(OrderSide::Buy, Quantity::new(100.0, 0), Price::new(1.1, 5));
        pos.apply_fill(OrderSide::Sell, Quantity::new(100.0, 0), Price::new(1.1, 5));
        assert!(pos.is_closed());
        assert_eq!(pos.side, PositionSide::Flat);
    }
}
