//! Depositor principal ledger

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::utils::error::{arithmetic_err, StrategyError, StrategyResult};

/// Cumulative principal per depositor.
/// Tracks what depositors contributed, never how the vault allocated it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepositLedger {
    principal: HashMap<Address, U256>,
    /// Sum of all entries
    total: U256,
}

impl DepositLedger {
    /// Returns the principal `depositor` would hold after depositing `amount`,
    /// without recording anything
    pub fn preview_deposit(&self, depositor: Address, amount: U256) -> StrategyResult<U256> {
        if amount.is_zero() {
            return Err(StrategyError::ZeroAmount);
        }
        self.total
            .checked_add(amount)
            .ok_or_else(|| arithmetic_err("Total principal overflowed."))?;
        self.principal_of(depositor)
            .checked_add(amount)
            .ok_or_else(|| arithmetic_err("Depositor principal overflowed."))
    }

    /// Adds `amount` to the principal of `depositor`.
    /// On overflow nothing is recorded.
    pub fn record_deposit(&mut self, depositor: Address, amount: U256) -> StrategyResult<U256> {
        let principal = self.preview_deposit(depositor, amount)?;
        self.total += amount;
        self.principal.insert(depositor, principal);
        Ok(principal)
    }

    /// Principal recorded for `depositor`, zero if unknown
    pub fn principal_of(&self, depositor: Address) -> U256 {
        self.principal
            .get(&depositor)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_principal(&self) -> U256 {
        self.total
    }

    /// Number of distinct depositors
    pub fn depositors(&self) -> usize {
        self.principal.len()
    }
}
