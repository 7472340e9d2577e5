//! In-memory execution backend
//!
//! A small stand-in for a forked chain: ERC20 tokens, Compound-style markets
//! with their controller and a single-hop router, all answering the same ABI
//! the adapters speak. Every call runs against a copy of the world and only
//! replaces it on success, so a revert leaves nothing behind. Snapshots copy
//! the whole world.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolInterface, SolValue};

use crate::{
    constants::TOO_LITTLE_RECEIVED,
    evm::{EvmBackend, SnapshotId},
    types::{IComptroller, IMToken, ISwapRouter, IERC20},
    utils::error::{StrategyError, StrategyResult},
};

/// Scale of market exchange rates
const EXCHANGE_RATE_SCALE: u128 = 1_000_000_000_000_000_000; // e18

/// Denominator of router fee tiers
const FEE_DENOMINATOR: u32 = 1_000_000;

/// Collateral factor reported for every listed market
const COLLATERAL_FACTOR: u128 = 800_000_000_000_000_000; // 80%

fn revert<T, S: Into<String>>(reason: S) -> StrategyResult<T> {
    Err(StrategyError::Reverted(reason.into()))
}

#[derive(Clone, Debug, Default)]
struct TokenState {
    balances: HashMap<Address, U256>,
    /// (owner, spender) -> allowance
    allowances: HashMap<(Address, Address), U256>,
}

#[derive(Clone, Debug)]
struct MarketState {
    underlying: Address,
    listed: bool,
    mint_paused: bool,
    /// Underlying per market token, scaled by 1e18
    exchange_rate: U256,
    balances: HashMap<Address, U256>,
}

#[derive(Clone, Copy, Debug)]
struct Pool {
    /// `token_out` paid per `token_in`, before fees
    numerator: U256,
    denominator: U256,
}

#[derive(Clone, Debug, Default)]
struct World {
    tokens: HashMap<Address, TokenState>,
    markets: HashMap<Address, MarketState>,
    comptroller: Option<Address>,
    router: Option<Address>,
    /// (token_in, token_out, fee) -> pool
    pools: HashMap<(Address, Address, u32), Pool>,
}

impl World {
    fn execute(&mut self, from: Address, to: Address, data: &[u8], now: u64) -> StrategyResult<Vec<u8>> {
        if self.tokens.contains_key(&to) {
            self.execute_token(from, to, data)
        } else if self.markets.contains_key(&to) {
            self.execute_market(from, to, data)
        } else if self.comptroller == Some(to) {
            self.execute_comptroller(data)
        } else if self.router == Some(to) {
            self.execute_router(from, to, data, now)
        } else {
            revert(format!("call to {} which has no code", to))
        }
    }

    fn token_mut(&mut self, token: Address) -> StrategyResult<&mut TokenState> {
        match self.tokens.get_mut(&token) {
            Some(state) => Ok(state),
            None => revert(format!("{} is not a token", token)),
        }
    }

    fn balance(&self, token: Address, account: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|state| state.balances.get(&account).copied())
            .unwrap_or_default()
    }

    fn move_tokens(&mut self, token: Address, from: Address, to: Address, amount: U256) -> StrategyResult<()> {
        let state = self.token_mut(token)?;
        let from_balance = state.balances.get(&from).copied().unwrap_or_default();
        if from_balance < amount {
            return revert("ERC20: transfer amount exceeds balance");
        }
        state.balances.insert(from, from_balance - amount);
        let to_balance = state.balances.entry(to).or_default();
        *to_balance += amount;
        Ok(())
    }

    fn spend_allowance(&mut self, token: Address, owner: Address, spender: Address, amount: U256) -> StrategyResult<()> {
        let state = self.token_mut(token)?;
        let allowance = state
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default();
        if allowance < amount {
            return revert("ERC20: insufficient allowance");
        }
        state.allowances.insert((owner, spender), allowance - amount);
        Ok(())
    }

    fn execute_token(&mut self, from: Address, token: Address, data: &[u8]) -> StrategyResult<Vec<u8>> {
        let call = IERC20::IERC20Calls::abi_decode(data, true)
            .map_err(|err| StrategyError::Reverted(err.to_string()))?;

        match call {
            IERC20::IERC20Calls::balanceOf(call) => Ok(self.balance(token, call.account).abi_encode()),
            IERC20::IERC20Calls::allowance(call) => {
                let state = self.token_mut(token)?;
                let allowance = state
                    .allowances
                    .get(&(call.owner, call.spender))
                    .copied()
                    .unwrap_or_default();
                Ok(allowance.abi_encode())
            }
            IERC20::IERC20Calls::approve(call) => {
                self.token_mut(token)?
                    .allowances
                    .insert((from, call.spender), call.amount);
                Ok(true.abi_encode())
            }
            IERC20::IERC20Calls::transfer(call) => {
                self.move_tokens(token, from, call.to, call.amount)?;
                Ok(true.abi_encode())
            }
            IERC20::IERC20Calls::transferFrom(call) => {
                self.spend_allowance(token, call.from, from, call.amount)?;
                self.move_tokens(token, call.from, call.to, call.amount)?;
                Ok(true.abi_encode())
            }
        }
    }

    fn execute_market(&mut self, from: Address, market: Address, data: &[u8]) -> StrategyResult<Vec<u8>> {
        let call = IMToken::IMTokenCalls::abi_decode(data, true)
            .map_err(|err| StrategyError::Reverted(err.to_string()))?;
        let state = self
            .markets
            .get(&market)
            .cloned()
            .ok_or(StrategyError::NonExistentValue)?;
        let scale = U256::from(EXCHANGE_RATE_SCALE);

        match call {
            IMToken::IMTokenCalls::mint(call) => {
                if !state.listed {
                    return revert("market not listed");
                }
                if state.mint_paused {
                    return revert("mint is paused");
                }
                self.spend_allowance(state.underlying, from, market, call.mintAmount)?;
                self.move_tokens(state.underlying, from, market, call.mintAmount)?;
                let minted = call.mintAmount * scale / state.exchange_rate;
                self.credit_market(market, from, minted);
                Ok(U256::ZERO.abi_encode())
            }
            IMToken::IMTokenCalls::redeem(call) => {
                let underlying = call.redeemTokens * state.exchange_rate / scale;
                self.debit_market(market, from, call.redeemTokens)?;
                self.move_tokens(state.underlying, market, from, underlying)?;
                Ok(U256::ZERO.abi_encode())
            }
            IMToken::IMTokenCalls::redeemUnderlying(call) => {
                let burned = call.redeemAmount * scale / state.exchange_rate;
                self.debit_market(market, from, burned)?;
                self.move_tokens(state.underlying, market, from, call.redeemAmount)?;
                Ok(U256::ZERO.abi_encode())
            }
            IMToken::IMTokenCalls::balanceOf(call) => Ok(state
                .balances
                .get(&call.owner)
                .copied()
                .unwrap_or_default()
                .abi_encode()),
            IMToken::IMTokenCalls::underlying(_) => Ok(state.underlying.abi_encode()),
        }
    }

    fn credit_market(&mut self, market: Address, account: Address, amount: U256) {
        if let Some(state) = self.markets.get_mut(&market) {
            *state.balances.entry(account).or_default() += amount;
        }
    }

    fn debit_market(&mut self, market: Address, account: Address, amount: U256) -> StrategyResult<()> {
        let state = self
            .markets
            .get_mut(&market)
            .ok_or(StrategyError::NonExistentValue)?;
        let balance = state.balances.get(&account).copied().unwrap_or_default();
        if balance < amount {
            return revert("redeem amount exceeds balance");
        }
        state.balances.insert(account, balance - amount);
        Ok(())
    }

    fn execute_comptroller(&self, data: &[u8]) -> StrategyResult<Vec<u8>> {
        let call = IComptroller::IComptrollerCalls::abi_decode(data, true)
            .map_err(|err| StrategyError::Reverted(err.to_string()))?;

        match call {
            IComptroller::IComptrollerCalls::markets(call) => {
                let listed = self
                    .markets
                    .get(&call.mToken)
                    .map(|state| state.listed)
                    .unwrap_or(false);
                let factor = if listed {
                    U256::from(COLLATERAL_FACTOR)
                } else {
                    U256::ZERO
                };
                Ok((listed, factor).abi_encode_params())
            }
            IComptroller::IComptrollerCalls::mintGuardianPaused(call) => Ok(self
                .markets
                .get(&call.mToken)
                .map(|state| state.mint_paused)
                .unwrap_or(false)
                .abi_encode()),
        }
    }

    fn execute_router(&mut self, from: Address, router: Address, data: &[u8], now: u64) -> StrategyResult<Vec<u8>> {
        let call = ISwapRouter::ISwapRouterCalls::abi_decode(data, true)
            .map_err(|err| StrategyError::Reverted(err.to_string()))?;

        match call {
            ISwapRouter::ISwapRouterCalls::exactInputSingle(call) => {
                let params = call.params;
                if U256::from(now) > params.deadline {
                    return revert("Transaction too old");
                }
                let pool = match self.pools.get(&(params.tokenIn, params.tokenOut, params.fee)) {
                    Some(pool) => *pool,
                    None => return revert("pool does not exist"),
                };

                let gross = params.amountIn * pool.numerator / pool.denominator;
                let amount_out = gross * U256::from(FEE_DENOMINATOR.saturating_sub(params.fee)) / U256::from(FEE_DENOMINATOR);
                if amount_out < params.amountOutMinimum {
                    return revert(TOO_LITTLE_RECEIVED);
                }

                self.spend_allowance(params.tokenIn, from, router, params.amountIn)?;
                self.move_tokens(params.tokenIn, from, router, params.amountIn)?;
                self.move_tokens(params.tokenOut, router, params.recipient, amount_out)?;
                Ok(amount_out.abi_encode())
            }
        }
    }
}

/// In-memory [`EvmBackend`]
#[derive(Clone, Debug, Default)]
pub struct Sandbox {
    world: World,
    snapshots: Vec<World>,
    timestamp: u64,
}

impl Sandbox {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// Deploys an empty ERC20 token at `token`
    pub fn deploy_token(&mut self, token: Address) -> &mut Self {
        self.world.tokens.entry(token).or_default();
        self
    }

    /// Credits `amount` of `token` to `to` out of thin air
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> &mut Self {
        *self
            .world
            .tokens
            .entry(token)
            .or_default()
            .balances
            .entry(to)
            .or_default() += amount;
        self
    }

    /// Sets the allowance `owner` grants to `spender`, as if `owner` had called `approve`
    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) -> &mut Self {
        self.world
            .tokens
            .entry(token)
            .or_default()
            .allowances
            .insert((owner, spender), amount);
        self
    }

    pub fn deploy_comptroller(&mut self, comptroller: Address) -> &mut Self {
        self.world.comptroller = Some(comptroller);
        self
    }

    /// Deploys a listed market at `market` whose tokens trade 1:1 with `underlying`
    pub fn deploy_market(&mut self, market: Address, underlying: Address) -> &mut Self {
        self.world.markets.insert(
            market,
            MarketState {
                underlying,
                listed: true,
                mint_paused: false,
                exchange_rate: U256::from(EXCHANGE_RATE_SCALE),
                balances: HashMap::new(),
            },
        );
        self
    }

    pub fn set_market_listed(&mut self, market: Address, listed: bool) -> &mut Self {
        if let Some(state) = self.world.markets.get_mut(&market) {
            state.listed = listed;
        }
        self
    }

    pub fn pause_mint(&mut self, market: Address, paused: bool) -> &mut Self {
        if let Some(state) = self.world.markets.get_mut(&market) {
            state.mint_paused = paused;
        }
        self
    }

    /// Sets the underlying per market token, scaled by 1e18
    pub fn set_exchange_rate(&mut self, market: Address, exchange_rate: U256) -> &mut Self {
        if let Some(state) = self.world.markets.get_mut(&market) {
            state.exchange_rate = exchange_rate;
        }
        self
    }

    pub fn deploy_router(&mut self, router: Address) -> &mut Self {
        self.world.router = Some(router);
        self
    }

    /// Opens a one-directional pool paying `numerator / denominator` of `token_out` per `token_in`.
    /// The router pays out of its own `token_out` balance.
    pub fn add_pool(
        &mut self,
        token_in: Address,
        token_out: Address,
        fee: u32,
        numerator: U256,
        denominator: U256,
    ) -> &mut Self {
        self.world.pools.insert(
            (token_in, token_out, fee),
            Pool {
                numerator,
                denominator,
            },
        );
        self
    }

    pub fn advance_time(&mut self, seconds: u64) -> &mut Self {
        self.timestamp += seconds;
        self
    }

    pub fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.world.balance(token, account)
    }

    /// Market tokens `account` holds in `market`
    pub fn market_balance(&self, market: Address, account: Address) -> U256 {
        self.world
            .markets
            .get(&market)
            .and_then(|state| state.balances.get(&account).copied())
            .unwrap_or_default()
    }

    /// Number of live snapshots
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}

impl EvmBackend for Sandbox {
    fn call(&mut self, from: Address, to: Address, data: Vec<u8>) -> StrategyResult<Vec<u8>> {
        let mut world = self.world.clone();
        let output = world.execute(from, to, &data, self.timestamp)?;
        self.world = world;
        Ok(output)
    }

    fn static_call(&self, to: Address, data: Vec<u8>) -> StrategyResult<Vec<u8>> {
        self.world
            .clone()
            .execute(Address::ZERO, to, &data, self.timestamp)
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.snapshots.push(self.world.clone());
        (self.snapshots.len() - 1) as SnapshotId
    }

    fn revert_to(&mut self, snapshot: SnapshotId) -> StrategyResult<()> {
        let index = snapshot as usize;
        if index >= self.snapshots.len() {
            return Err(StrategyError::NonExistentValue);
        }
        self.snapshots.truncate(index + 1);
        self.world = self.snapshots.pop().ok_or(StrategyError::NonExistentValue)?;
        Ok(())
    }

    fn discard_snapshot(&mut self, snapshot: SnapshotId) {
        self.snapshots.truncate(snapshot as usize);
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    fn usdc() -> Address {
        Address::repeat_byte(0x01)
    }

    fn dai() -> Address {
        Address::repeat_byte(0x02)
    }

    fn alice() -> Address {
        Address::repeat_byte(0x77)
    }

    fn bob() -> Address {
        Address::repeat_byte(0x78)
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut sandbox = Sandbox::new(0);
        sandbox
            .mint(usdc(), alice(), U256::from(100))
            .approve(usdc(), alice(), bob(), U256::from(60));

        let call = IERC20::transferFromCall {
            from: alice(),
            to: bob(),
            amount: U256::from(60),
        };
        sandbox.call(bob(), usdc(), call.abi_encode()).unwrap();

        assert_eq!(sandbox.balance_of(usdc(), alice()), U256::from(40));
        assert_eq!(sandbox.balance_of(usdc(), bob()), U256::from(60));

        let again = sandbox.call(bob(), usdc(), call.abi_encode());
        assert_eq!(
            again,
            Err(StrategyError::Reverted("ERC20: insufficient allowance".to_string()))
        );
    }

    #[test]
    fn test_failed_call_leaves_no_trace() {
        let mut sandbox = Sandbox::new(0);
        sandbox
            .mint(usdc(), alice(), U256::from(10))
            .approve(usdc(), alice(), bob(), U256::from(100));

        // Allowance is spent before the balance check fails
        let call = IERC20::transferFromCall {
            from: alice(),
            to: bob(),
            amount: U256::from(50),
        };
        assert!(sandbox.call(bob(), usdc(), call.abi_encode()).is_err());

        let allowance = IERC20::allowanceCall {
            owner: alice(),
            spender: bob(),
        };
        let raw = sandbox.static_call(usdc(), allowance.abi_encode()).unwrap();
        assert_eq!(raw, U256::from(100).abi_encode());
    }

    #[test]
    fn test_snapshot_and_revert() {
        let mut sandbox = Sandbox::new(0);
        sandbox.mint(usdc(), alice(), U256::from(10));

        let snapshot = sandbox.snapshot();
        sandbox.mint(usdc(), alice(), U256::from(5));
        assert_eq!(sandbox.balance_of(usdc(), alice()), U256::from(15));

        sandbox.revert_to(snapshot).unwrap();
        assert_eq!(sandbox.balance_of(usdc(), alice()), U256::from(10));
        assert_eq!(sandbox.snapshot_count(), 0);
        assert_eq!(sandbox.revert_to(snapshot), Err(StrategyError::NonExistentValue));
    }

    #[test]
    fn test_router_enforces_floor_and_deadline() {
        let router = Address::repeat_byte(0x5e);
        let mut sandbox = Sandbox::new(1_000);
        sandbox
            .deploy_token(usdc())
            .deploy_router(router)
            .add_pool(usdc(), dai(), 100, U256::from(1), U256::from(1))
            .mint(usdc(), alice(), U256::from(1_000))
            .mint(dai(), router, U256::from(1_000))
            .approve(usdc(), alice(), router, U256::from(1_000));

        let mut params = ISwapRouter::ExactInputSingleParams {
            tokenIn: usdc(),
            tokenOut: dai(),
            fee: 100,
            recipient: alice(),
            deadline: U256::from(1_000),
            amountIn: U256::from(1_000),
            amountOutMinimum: U256::from(1_000),
            sqrtPriceLimitX96: Default::default(),
        };

        let result = sandbox.call(
            alice(),
            router,
            ISwapRouter::exactInputSingleCall {
                params: params.clone(),
            }
            .abi_encode(),
        );
        assert_eq!(result, Err(StrategyError::Reverted(TOO_LITTLE_RECEIVED.to_string())));

        params.amountOutMinimum = U256::from(999);
        sandbox.advance_time(1);
        let result = sandbox.call(
            alice(),
            router,
            ISwapRouter::exactInputSingleCall {
                params: params.clone(),
            }
            .abi_encode(),
        );
        assert_eq!(result, Err(StrategyError::Reverted("Transaction too old".to_string())));

        params.deadline = U256::from(2_000);
        let raw = sandbox
            .call(alice(), router, ISwapRouter::exactInputSingleCall { params }.abi_encode())
            .unwrap();
        // A 0.01% fee on 1000 rounds down to 999
        assert_eq!(raw, U256::from(999).abi_encode());
        assert_eq!(sandbox.balance_of(dai(), alice()), U256::from(999));
        assert_eq!(sandbox.balance_of(usdc(), router), U256::from(1_000));
    }

    #[test]
    fn test_market_mint_and_redeem() {
        let market = Address::repeat_byte(0x10);
        let mut sandbox = Sandbox::new(0);
        sandbox
            .deploy_market(market, usdc())
            .mint(usdc(), alice(), U256::from(500))
            .approve(usdc(), alice(), market, U256::from(500));

        let code = sandbox
            .call(alice(), market, IMToken::mintCall { mintAmount: U256::from(500) }.abi_encode())
            .unwrap();
        assert_eq!(code, U256::ZERO.abi_encode());
        assert_eq!(sandbox.market_balance(market, alice()), U256::from(500));

        sandbox
            .call(
                alice(),
                market,
                IMToken::redeemUnderlyingCall {
                    redeemAmount: U256::from(200),
                }
                .abi_encode(),
            )
            .unwrap();
        assert_eq!(sandbox.market_balance(market, alice()), U256::from(300));
        assert_eq!(sandbox.balance_of(usdc(), alice()), U256::from(200));
    }

    #[test]
    fn test_unknown_address_reverts() {
        let mut sandbox = Sandbox::new(0);
        let result = sandbox.call(alice(), bob(), vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(StrategyError::Reverted(reason)) if reason.contains("no code")));
    }
}
