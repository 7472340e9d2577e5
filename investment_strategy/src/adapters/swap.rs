//! Single-hop swap adapter

use alloy_primitives::{Address, U256};

use crate::{
    constants::TOO_LITTLE_RECEIVED,
    evm::{send, EvmBackend},
    types::ISwapRouter,
    utils::error::{revert_reason, StrategyError, StrategyResult},
};

use super::token::TokenAdapter;

/// Exact-input swaps through a Uniswap V3 style router.
/// This is the only place the strategy takes price risk, so the minimum
/// output is mandatory and is re-checked against what actually arrived.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwapAdapter {
    vault: Address,
    router: Address,
    fee: u32,
    deadline_window: u64,
}

fn balance_read_err(err: StrategyError) -> StrategyError {
    StrategyError::SwapFailed(format!("balanceOf: {}", revert_reason(&err)))
}

/// Parameters of an exact-input swap
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
}

impl SwapAdapter {
    pub fn new(vault: Address, router: Address, fee: u32, deadline_window: u64) -> Self {
        Self {
            vault,
            router,
            fee,
            deadline_window,
        }
    }

    /// Swaps exactly `amount_in` of `token_in` for at least `min_amount_out` of `token_out`.
    /// Returns the amount received by the recipient.
    pub fn swap_exact_input<B: EvmBackend + ?Sized>(
        &self,
        backend: &mut B,
        tokens: &TokenAdapter,
        request: SwapRequest,
    ) -> StrategyResult<U256> {
        if request.amount_in.is_zero() {
            return Err(StrategyError::ZeroAmount);
        }
        if request.min_amount_out.is_zero() {
            return Err(StrategyError::UnsafeSlippageFloor);
        }

        tokens
            .approve(backend, request.token_in, self.router, request.amount_in)
            .map_err(|err| StrategyError::SwapFailed(err.to_string()))?;

        let before = tokens
            .balance_of(backend, request.token_out, request.recipient)
            .map_err(balance_read_err)?;

        let params = ISwapRouter::ExactInputSingleParams {
            tokenIn: request.token_in,
            tokenOut: request.token_out,
            fee: self.fee,
            recipient: request.recipient,
            deadline: U256::from(backend.timestamp().saturating_add(self.deadline_window)),
            amountIn: request.amount_in,
            amountOutMinimum: request.min_amount_out,
            sqrtPriceLimitX96: U256::ZERO,
        };

        let reported = send(
            backend,
            self.vault,
            self.router,
            &ISwapRouter::exactInputSingleCall { params },
        )
        .map_err(|err| {
            let reason = revert_reason(&err);
            if reason.contains(TOO_LITTLE_RECEIVED) {
                StrategyError::SlippageExceeded(format!(
                    "router refused to return less than {}",
                    request.min_amount_out
                ))
            } else {
                StrategyError::SwapFailed(reason)
            }
        })?
        .amountOut;

        let after = tokens
            .balance_of(backend, request.token_out, request.recipient)
            .map_err(balance_read_err)?;
        let received = after.saturating_sub(before);

        if reported < request.min_amount_out || received < request.min_amount_out {
            return Err(StrategyError::SlippageExceeded(format!(
                "received {} (router reported {}), minimum {}",
                received, reported, request.min_amount_out
            )));
        }

        tracing::debug!(
            token_in = %request.token_in,
            token_out = %request.token_out,
            amount_in = %request.amount_in,
            %received,
            "swap settled"
        );
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{evm::MockEvmBackend, types::IERC20};
    use alloy_sol_types::{SolCall, SolValue};
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    fn vault() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn router() -> Address {
        Address::repeat_byte(0x5e)
    }

    fn request(min_amount_out: u64) -> SwapRequest {
        SwapRequest {
            token_in: Address::repeat_byte(0x01),
            token_out: Address::repeat_byte(0x02),
            amount_in: U256::from(1_000),
            min_amount_out: U256::from(min_amount_out),
            recipient: vault(),
        }
    }

    /// Router mock that credits `delivered` and reports `reported`
    fn backend(delivered: u64, reported: u64) -> MockEvmBackend {
        let balance = Arc::new(AtomicU64::new(0));
        let balance_view = balance.clone();

        let mut backend = MockEvmBackend::new();
        backend.expect_timestamp().return_const(1_000u64);
        backend
            .expect_static_call()
            .returning(move |_, _| Ok(U256::from(balance_view.load(Ordering::SeqCst)).abi_encode()));
        backend.expect_call().returning(move |_, to, data| {
            if data[..4] == IERC20::approveCall::SELECTOR {
                return Ok(true.abi_encode());
            }
            assert_eq!(to, router());
            balance.fetch_add(delivered, Ordering::SeqCst);
            Ok(U256::from(reported).abi_encode())
        });
        backend
    }

    #[test]
    fn test_swap_returns_received_amount() {
        let mut backend = backend(990, 990);
        let tokens = TokenAdapter::new(vault());
        let adapter = SwapAdapter::new(vault(), router(), 10_000, 300);

        let received = adapter
            .swap_exact_input(&mut backend, &tokens, request(980))
            .unwrap();
        assert_eq!(received, U256::from(990));
    }

    #[test]
    fn test_swap_maps_failed_balance_read() {
        let mut backend = MockEvmBackend::new();
        backend.expect_timestamp().return_const(1_000u64);
        backend
            .expect_static_call()
            .returning(|_, _| Err(StrategyError::Reverted("no code".to_string())));
        backend
            .expect_call()
            .returning(|_, _, _| Ok(true.abi_encode()));
        let tokens = TokenAdapter::new(vault());
        let adapter = SwapAdapter::new(vault(), router(), 10_000, 300);

        let result = adapter.swap_exact_input(&mut backend, &tokens, request(980));
        assert_eq!(
            result,
            Err(StrategyError::SwapFailed("balanceOf: no code".to_string()))
        );
    }

    #[test]
    fn test_swap_refuses_zero_floor() {
        let mut backend = MockEvmBackend::new();
        backend.expect_call().times(0);
        let tokens = TokenAdapter::new(vault());
        let adapter = SwapAdapter::new(vault(), router(), 10_000, 300);

        let result = adapter.swap_exact_input(&mut backend, &tokens, request(0));
        assert_eq!(result, Err(StrategyError::UnsafeSlippageFloor));
    }

    #[test]
    fn test_swap_checks_delivered_amount() {
        // Router claims success but under-delivers
        let mut backend = backend(500, 990);
        let tokens = TokenAdapter::new(vault());
        let adapter = SwapAdapter::new(vault(), router(), 10_000, 300);

        let result = adapter.swap_exact_input(&mut backend, &tokens, request(980));
        assert!(matches!(result, Err(StrategyError::SlippageExceeded(_))));
    }

    #[test]
    fn test_swap_maps_router_slippage_revert() {
        let mut backend = MockEvmBackend::new();
        backend.expect_timestamp().return_const(1_000u64);
        backend
            .expect_static_call()
            .returning(|_, _| Ok(U256::ZERO.abi_encode()));
        backend.expect_call().returning(|_, _, data| {
            if data[..4] == IERC20::approveCall::SELECTOR {
                Ok(true.abi_encode())
            } else {
                Err(StrategyError::Reverted("Too little received".to_string()))
            }
        });
        let tokens = TokenAdapter::new(vault());
        let adapter = SwapAdapter::new(vault(), router(), 10_000, 300);

        let result = adapter.swap_exact_input(&mut backend, &tokens, request(980));
        assert!(matches!(result, Err(StrategyError::SlippageExceeded(_))));
    }

    #[test]
    fn test_swap_encodes_deadline_and_fee() {
        let mut backend = MockEvmBackend::new();
        backend.expect_timestamp().return_const(1_000u64);
        backend
            .expect_static_call()
            .returning(|_, _| Ok(U256::ZERO.abi_encode()));
        backend
            .expect_call()
            .withf(|_, _, data| data[..4] == IERC20::approveCall::SELECTOR)
            .returning(|_, _, _| Ok(true.abi_encode()));
        backend
            .expect_call()
            .withf(|_, _, data| {
                let call = match ISwapRouter::exactInputSingleCall::abi_decode(data, true) {
                    Ok(call) => call,
                    Err(_) => return false,
                };
                call.params.fee == 3_000
                    && call.params.deadline == U256::from(1_060)
                    && call.params.amountOutMinimum == U256::from(980)
            })
            .returning(|_, _, _| Err(StrategyError::Reverted("STF".to_string())));
        let tokens = TokenAdapter::new(vault());
        let adapter = SwapAdapter::new(vault(), router(), 3_000, 60);

        let result = adapter.swap_exact_input(&mut backend, &tokens, request(980));
        assert_eq!(result, Err(StrategyError::SwapFailed("STF".to_string())));
    }
}
