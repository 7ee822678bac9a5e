use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::{Result, SuretyError};
use crate::types::{AccountId, Wei};

/// Why value entered the treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DepositSource {
    AirlineFunding,
    Premium,
    OracleFee,
}

/// The ledger's own value account.
///
/// Premiums, airline funding and oracle fees are held here; credit payouts to
/// passengers are drawn from it.
#[derive(Debug, Default)]
pub struct Treasury {
    balance: Wei,
    deposits: HashMap<DepositSource, Wei>,
    paid_out: HashMap<AccountId, Wei>,
    payout_history: Vec<(AccountId, Wei, u64)>, // recipient, amount, ledger height
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Wei {
        self.balance
    }

    /// Fails without side effects when `amount` would overflow the books.
    ///
    /// Total deposits bound both the balance and every per-source total.
    pub(crate) fn ensure_can_deposit(&self, amount: Wei) -> Result<()> {
        match self.total_deposited().checked_add(amount) {
            Some(_) => Ok(()),
            None => Err(SuretyError::ValueOverflow {
                reason: "treasury deposits would overflow".to_string(),
                provided: amount,
            }),
        }
    }

    pub(crate) fn deposit(&mut self, source: DepositSource, from: &AccountId, amount: Wei) -> Result<()> {
        self.ensure_can_deposit(amount)?;
        self.balance += amount;
        *self.deposits.entry(source).or_insert(0) += amount;
        debug!("Treasury received {} wei from {} ({:?})", amount, from.short(), source);
        Ok(())
    }

    /// Fails without side effects when the balance cannot cover `amount`
    pub(crate) fn ensure_can_pay(&self, amount: Wei) -> Result<()> {
        if amount > self.balance {
            return Err(SuretyError::InsufficientReserves {
                needed: amount,
                available: self.balance,
            });
        }
        Ok(())
    }

    pub(crate) fn pay(&mut self, to: &AccountId, amount: Wei, height: u64) -> Result<()> {
        self.ensure_can_pay(amount)?;
        self.balance -= amount;
        *self.paid_out.entry(*to).or_insert(0) += amount;
        self.payout_history.push((*to, amount, height));
        Ok(())
    }

    /// Total received from one kind of source
    pub fn deposited(&self, source: DepositSource) -> Wei {
        self.deposits.get(&source).copied().unwrap_or(0)
    }

    pub fn total_deposited(&self) -> Wei {
        self.deposits.values().sum()
    }

    /// Total transferred to `account`
    pub fn paid_to(&self, account: &AccountId) -> Wei {
        self.paid_out.get(account).copied().unwrap_or(0)
    }

    pub fn total_paid_out(&self) -> Wei {
        self.paid_out.values().sum()
    }

    pub fn payout_history(&self) -> &[(AccountId, Wei, u64)] {
        &self.payout_history
    }
}
