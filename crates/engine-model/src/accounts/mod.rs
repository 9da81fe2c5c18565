//! Account balances and state snapshots.

use std::collections::HashMap;

use engine_core::{UnixNanos, UUID4};

use crate::{
    enums::AccountType,
    identifiers::AccountId,
    types::{Currency, Money},
};

/// Total/locked/free balance in one currency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccountBalance {
    pub total: Money,
    pub locked: Money,
    pub free: Money,
}

impl AccountBalance {
    #[must_use]
    pub fn new(total: Money, locked: Money) -> Self {
        Self { total, locked, free: total - locked }
    }
}

/// An immutable snapshot of account balances, emitted on init and after each
/// non-frozen fill (§4.E).
#[derive(Clone, Debug)]
pub struct AccountState {
    pub account_id: AccountId,
    pub account_type: AccountType,
    pub base_currency: Option<Currency>,
    pub balances: Vec<AccountBalance>,
    pub is_reported: bool,
    pub event_id: UUID4,
    pub ts_event: UnixNanos,
}

/// Mutable per-currency ledger owned by the simulated exchange.
#[derive(Clone, Debug)]
pub struct Account {
    pub account_id: AccountId,
    pub account_type: AccountType,
    pub base_currency: Option<Currency>,
    pub balances: HashMap<Currency, AccountBalance>,
    pub is_frozen: bool,
    pub default_leverage: f64,
    pub leverages: HashMap<crate::identifiers::InstrumentId, f64>,
}

impl Account {
    #[must_use]
    pub fn new(
        account_id: AccountId,
        account_type: AccountType,
        base_currency: Option<Currency>,
        starting_balances: Vec<Money>,
        default_leverage: f64,
        is_frozen: bool,
    ) -> Self {
        let mut balances = HashMap::new();
        for money in starting_balances {
            balances.insert(money.currency, AccountBalance::new(money, Money::zero(money.currency)));
        }
        Self {
            account_id,
            account_type,
            base_currency,
            balances,
            is_frozen,
            default_leverage,
            leverages: HashMap::new(),
        }
    }

    /// Adjusts the free/total balance of `adjustment.currency` by `adjustment`; a
    /// frozen account silently ignores adjustments (§4.E).
    pub fn adjust_balance(&mut self, adjustment: Money) {
        if self.is_frozen {
            return;
        }
        let entry = self
            .balances
            .entry(adjustment.currency)
            .or_insert_with(|| AccountBalance::new(Money::zero(adjustment.currency), Money::zero(adjustment.currency)));
        entry.total = entry.total + adjustment;
        entry.free = entry.free + adjustment;
    }

    #[must_use]
    pub fn balance(&self, currency: Currency) -> Option<AccountBalance> {
        self.balances.get(&currency).copied()
    }

    #[must_use]
    pub fn leverage(&self, instrument_id: crate::identifiers::InstrumentId) -> f64 {
        self.leverages.get(&instrument_id).copied().unwrap_or(self.default_leverage)
    }

    #[must_use]
    pub fn generate_state(&self, ts_event: UnixNanos) -> AccountState {
        AccountState {
            account_id: self.account_id,
            account_type: self.account_type,
            base_currency: self.base_currency,
            balances: self.balances.values().copied().collect(),
            is_reported: true,
            event_id: UUID4::new(),
            ts_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_balance_updates_total_and_free() {
        let mut account = Account::new(
            AccountId::new("SIM-001"),
            AccountType::Cash,
            None,
            vec![Money::new(10_000.0, Currency::usd())],
            1.0,
            false,
        );
        account.adjust_balance(Money::new(-50.0, Currency::usd()));
        let balance = account.balance(Currency::usd()).unwrap();
        assert_eq!(balance.total.as_f64(), 9_950.0);
        assert_eq!(balance.free.as_f64(), 9_950.0);
    }

    #[test]
    fn test_frozen_account_ignores_adjustment() {
        let mut account = Account::new(
            AccountId::new("SIM-001"),
            AccountType::Cash,
            None,
            vec![Money::new(10_000.0, Currency::usd())],
            1.0,
            true,
        );
        account.adjust_balance(Money::new(-50.0, Currency::usd()));
        assert_eq!(account.balance(Currency::usd()).unwrap().total.as_f64(), 10_000.0);
    }
}
