//! ERC20 adapter

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::{
    evm::{query, send, EvmBackend},
    types::IERC20,
    utils::{
        common::decode_abi_response,
        error::{revert_reason, StrategyError, StrategyResult},
    },
};

/// Wraps the fungible-asset calls made on behalf of the vault.
/// Holds nothing but the vault's own address, used as `msg.sender`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TokenAdapter {
    pub vault: Address,
}

impl TokenAdapter {
    pub fn new(vault: Address) -> Self {
        Self { vault }
    }

    /// Balance of `account` in `token`
    pub fn balance_of<B: EvmBackend + ?Sized>(
        &self,
        backend: &B,
        token: Address,
        account: Address,
    ) -> StrategyResult<U256> {
        query(backend, token, &IERC20::balanceOfCall { account }).map(|data| data._0)
    }

    /// Allowance granted by `owner` to `spender` in `token`
    pub fn allowance<B: EvmBackend + ?Sized>(
        &self,
        backend: &B,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> StrategyResult<U256> {
        query(backend, token, &IERC20::allowanceCall { owner, spender }).map(|data| data._0)
    }

    /// Pulls `amount` of `token` from `from` into the vault.
    /// Allowance and balance are checked first so the failure names its cause.
    pub fn pull<B: EvmBackend + ?Sized>(
        &self,
        backend: &mut B,
        token: Address,
        from: Address,
        amount: U256,
    ) -> StrategyResult<()> {
        let allowance = self.allowance(backend, token, from, self.vault)?;
        if allowance < amount {
            return Err(StrategyError::TransferFailed(format!(
                "allowance {} is below the requested {}",
                allowance, amount
            )));
        }

        let balance = self.balance_of(backend, token, from)?;
        if balance < amount {
            return Err(StrategyError::TransferFailed(format!(
                "balance {} is below the requested {}",
                balance, amount
            )));
        }

        let call = IERC20::transferFromCall {
            from,
            to: self.vault,
            amount,
        };
        Self::expect_success(backend.call(self.vault, token, call.abi_encode()))
    }

    /// Sends `amount` of `token` from the vault to `to`
    pub fn transfer<B: EvmBackend + ?Sized>(
        &self,
        backend: &mut B,
        token: Address,
        to: Address,
        amount: U256,
    ) -> StrategyResult<()> {
        let call = IERC20::transferCall { to, amount };
        Self::expect_success(backend.call(self.vault, token, call.abi_encode()))
    }

    /// Approves `spender` to pull exactly `amount` of the vault's `token`
    pub fn approve<B: EvmBackend + ?Sized>(
        &self,
        backend: &mut B,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> StrategyResult<()> {
        let approved = send(backend, self.vault, token, &IERC20::approveCall { spender, amount })
            .map_err(|err| StrategyError::TransferFailed(format!("approve: {}", revert_reason(&err))))?;

        if !approved._0 {
            return Err(StrategyError::TransferFailed(
                "approve returned false".to_string(),
            ));
        }
        Ok(())
    }

    /// Interprets the raw result of a transfer-style call.
    /// Tokens that return nothing are treated as successful.
    fn expect_success(raw: StrategyResult<Vec<u8>>) -> StrategyResult<()> {
        let data = raw.map_err(|err| StrategyError::TransferFailed(revert_reason(&err)))?;
        if data.is_empty() {
            return Ok(());
        }

        let returned = decode_abi_response::<IERC20::transferReturn, IERC20::transferCall>(&data)?;
        if !returned._0 {
            return Err(StrategyError::TransferFailed(
                "token returned false".to_string(),
            ));
        }
        Ok(())
    }
}
