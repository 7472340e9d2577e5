//! Lending-market adapter
//!
//! Supplies to and redeems from the two Compound-style markets configured on
//! the strategy. The market controller is consulted before every supply so a
//! delisted or paused market fails with a named cause instead of a bare revert.

use alloy_primitives::{Address, U256};

use crate::{
    constants::MARKET_NO_ERROR,
    evm::{query, send, EvmBackend},
    types::{IComptroller, IMToken},
    utils::error::{arithmetic_err, revert_reason, StrategyError, StrategyResult},
};

use super::token::TokenAdapter;

/// Wraps a failed market interaction, keeping the raw revert reason
fn market_call_err(function: &'static str) -> impl Fn(StrategyError) -> StrategyError {
    move |err| StrategyError::MarketCallFailed(format!("{}: {}", function, revert_reason(&err)))
}

/// Selects one of the two configured markets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketId {
    Primary,
    Secondary,
}

/// A market token and the asset it accepts
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Market {
    pub market_token: Address,
    pub underlying: Address,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarketAdapter {
    vault: Address,
    comptroller: Address,
    primary: Market,
    secondary: Market,
}

impl MarketAdapter {
    pub fn new(vault: Address, comptroller: Address, primary: Market, secondary: Market) -> Self {
        Self {
            vault,
            comptroller,
            primary,
            secondary,
        }
    }

    /// Returns the market descriptor behind `id`
    pub fn market(&self, id: MarketId) -> Market {
        match id {
            MarketId::Primary => self.primary,
            MarketId::Secondary => self.secondary,
        }
    }

    /// Whether the controller lists `id` as an active market
    pub fn is_listed<B: EvmBackend + ?Sized>(&self, backend: &B, id: MarketId) -> StrategyResult<bool> {
        let market = self.market(id);
        query(
            backend,
            self.comptroller,
            &IComptroller::marketsCall {
                mToken: market.market_token,
            },
        )
        .map(|data| data.isListed)
        .map_err(|err| StrategyError::MarketCallFailed(format!("markets: {}", revert_reason(&err))))
    }

    /// Market tokens held by the vault in `id`
    pub fn supplied_balance<B: EvmBackend + ?Sized>(
        &self,
        backend: &B,
        id: MarketId,
    ) -> StrategyResult<U256> {
        let market = self.market(id);
        query(
            backend,
            market.market_token,
            &IMToken::balanceOfCall { owner: self.vault },
        )
        .map(|data| data._0)
    }

    /// Supplies `amount` of the underlying asset to `id`.
    /// Returns the market tokens minted to the vault.
    pub fn supply<B: EvmBackend + ?Sized>(
        &self,
        backend: &mut B,
        tokens: &TokenAdapter,
        id: MarketId,
        amount: U256,
    ) -> StrategyResult<U256> {
        if amount.is_zero() {
            return Err(StrategyError::ZeroAmount);
        }
        let market = self.market(id);

        if !self.is_listed(backend, id)? {
            return Err(StrategyError::MarketCallFailed(format!(
                "market {} is not listed",
                market.market_token
            )));
        }

        let paused = query(
            backend,
            self.comptroller,
            &IComptroller::mintGuardianPausedCall {
                mToken: market.market_token,
            },
        )
        .map_err(|err| {
            StrategyError::MarketCallFailed(format!("mintGuardianPaused: {}", revert_reason(&err)))
        })?;
        if paused._0 {
            return Err(StrategyError::MarketCallFailed(format!(
                "minting is paused on {}",
                market.market_token
            )));
        }

        tokens
            .approve(backend, market.underlying, market.market_token, amount)
            .map_err(|err| StrategyError::MarketCallFailed(err.to_string()))?;

        let before = self
            .supplied_balance(backend, id)
            .map_err(market_call_err("balanceOf"))?;
        let code = send(
            backend,
            self.vault,
            market.market_token,
            &IMToken::mintCall { mintAmount: amount },
        )
        .map_err(market_call_err("mint"))?;
        Self::expect_no_error("mint", code._0)?;

        let after = self
            .supplied_balance(backend, id)
            .map_err(market_call_err("balanceOf"))?;
        let minted = after
            .checked_sub(before)
            .ok_or_else(|| arithmetic_err("Market token balance decreased after mint."))?;

        tracing::debug!(market = %market.market_token, %amount, %minted, "supplied to market");
        Ok(minted)
    }

    /// Redeems `amount` of the underlying asset from `id`.
    /// Returns the underlying received by the vault.
    pub fn redeem<B: EvmBackend + ?Sized>(
        &self,
        backend: &mut B,
        tokens: &TokenAdapter,
        id: MarketId,
        amount: U256,
    ) -> StrategyResult<U256> {
        if amount.is_zero() {
            return Err(StrategyError::ZeroAmount);
        }
        let market = self.market(id);

        let before = tokens
            .balance_of(backend, market.underlying, self.vault)
            .map_err(market_call_err("underlying balanceOf"))?;
        let code = send(
            backend,
            self.vault,
            market.market_token,
            &IMToken::redeemUnderlyingCall {
                redeemAmount: amount,
            },
        )
        .map_err(market_call_err("redeemUnderlying"))?;
        Self::expect_no_error("redeemUnderlying", code._0)?;

        let after = tokens
            .balance_of(backend, market.underlying, self.vault)
            .map_err(market_call_err("underlying balanceOf"))?;
        let received = after
            .checked_sub(before)
            .ok_or_else(|| arithmetic_err("Underlying balance decreased after redeem."))?;

        tracing::debug!(market = %market.market_token, %amount, %received, "redeemed from market");
        Ok(received)
    }

    /// Markets report failures as a non-zero error code instead of reverting
    fn expect_no_error(function: &str, code: U256) -> StrategyResult<()> {
        if code != U256::from(MARKET_NO_ERROR) {
            return Err(StrategyError::MarketCallFailed(format!(
                "{} returned error code {}",
                function, code
            )));
        }
        Ok(())
    }
}
