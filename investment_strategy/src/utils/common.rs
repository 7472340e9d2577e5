//! Common utility and helper functions that are used across the project

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use candid::Nat;
use num_bigint::BigUint;

use crate::constants::{bps_denominator, pool_fee_denominator, POOL_FEE_DENOMINATOR};

use super::error::*;

/// Converts String to Address and returns StrategyError on failure
pub fn string_to_address(input: String) -> StrategyResult<Address> {
    Address::from_str(&input).map_err(|err| StrategyError::DecodingError(format!("{:#?}", err)))
}

/// Converts values of type `U256` to `Nat`
pub fn u256_to_nat(value: &U256) -> Nat {
    Nat::from(BigUint::from_bytes_be(&value.to_be_bytes::<32>()))
}

/// Returns `T` from the raw return data of a Solidity call.
pub fn decode_abi_response<T, F: SolCall<Return = T>>(data: &[u8]) -> StrategyResult<T> {
    F::abi_decode_returns(data, false).map_err(|err| StrategyError::DecodingError(err.to_string()))
}

/// Formats calldata the way block explorers show it
pub fn calldata_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Returns `amount * bps / 10_000`, rejecting overflow
pub fn apply_bps(amount: U256, bps: u16) -> StrategyResult<U256> {
    amount
        .checked_mul(U256::from(bps))
        .ok_or_else(|| arithmetic_err("Basis point multiplication overflowed."))?
        .checked_div(bps_denominator())
        .ok_or_else(|| arithmetic_err("Basis point denominator was zero."))
}

/// Returns what is left of `amount` after a pool fee of `fee` hundredths of a bip.
/// A fee at or above the denominator leaves nothing.
pub fn net_of_pool_fee(amount: U256, fee: u32) -> StrategyResult<U256> {
    amount
        .checked_mul(U256::from(POOL_FEE_DENOMINATOR.saturating_sub(fee)))
        .ok_or_else(|| arithmetic_err("Pool fee multiplication overflowed."))?
        .checked_div(pool_fee_denominator())
        .ok_or_else(|| arithmetic_err("Pool fee denominator was zero."))
}

/// Rescales `amount` from `from_decimals` to `to_decimals` precision.
/// Scaling down truncates.
pub fn rescale(amount: U256, from_decimals: u8, to_decimals: u8) -> StrategyResult<U256> {
    if from_decimals == to_decimals {
        return Ok(amount);
    }

    let gap = from_decimals.abs_diff(to_decimals);
    let factor = U256::from(10)
        .checked_pow(U256::from(gap))
        .ok_or_else(|| arithmetic_err("Decimals factor overflowed."))?;

    if to_decimals > from_decimals {
        amount
            .checked_mul(factor)
            .ok_or_else(|| arithmetic_err("Rescaling up overflowed."))
    } else {
        amount
            .checked_div(factor)
            .ok_or_else(|| arithmetic_err("Decimals factor was zero."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IERC20;
    use alloy_sol_types::SolValue;
    use proptest::prelude::*;

    #[test]
    fn test_string_to_address_valid() {
        // Valid Ethereum address
        let input = "0x0123456789abcdef0123456789abcdef01234567".to_string();
        let result = string_to_address(input.clone());
        assert!(result.is_ok());
        let address = result.unwrap();
        assert_eq!(address, Address::from_str(&input).unwrap());
    }

    #[test]
    fn test_string_to_address_invalid() {
        // Invalid Ethereum address
        let input = "invalid_address".to_string();
        let result = string_to_address(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_u256_to_nat() {
        let value = U256::from(1_234_567_890_u64);
        assert_eq!(u256_to_nat(&value), Nat::from(1_234_567_890_u64));
        assert_eq!(u256_to_nat(&U256::ZERO), Nat::from(0_u64));
    }

    #[test]
    fn test_decode_abi_response_balance() {
        let raw = U256::from(42_u64).abi_encode();
        let decoded = decode_abi_response::<IERC20::balanceOfReturn, IERC20::balanceOfCall>(&raw)
            .unwrap();
        assert_eq!(decoded._0, U256::from(42_u64));
    }

    #[test]
    fn test_decode_abi_response_garbage() {
        let result =
            decode_abi_response::<IERC20::balanceOfReturn, IERC20::balanceOfCall>(&[0x01, 0x02]);
        assert!(matches!(result, Err(StrategyError::DecodingError(_))));
    }

    #[test]
    fn test_calldata_hex() {
        assert_eq!(calldata_hex(&[0xa9, 0x05, 0x9c, 0xbb]), "0xa9059cbb");
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(U256::from(100), 5_000).unwrap(), U256::from(50));
        assert_eq!(apply_bps(U256::from(3), 5_000).unwrap(), U256::from(1));
        assert!(apply_bps(U256::MAX, 2).is_err());
    }

    #[test]
    fn test_net_of_pool_fee() {
        // 1% tier
        assert_eq!(net_of_pool_fee(U256::from(1_000), 10_000).unwrap(), U256::from(990));
        // 0.05% tier truncates
        assert_eq!(net_of_pool_fee(U256::from(1_000), 500).unwrap(), U256::from(999));
        assert_eq!(net_of_pool_fee(U256::from(1_000), 0).unwrap(), U256::from(1_000));
        assert_eq!(net_of_pool_fee(U256::from(1_000), 2_000_000).unwrap(), U256::ZERO);
        assert!(net_of_pool_fee(U256::MAX, 3_000).is_err());
    }

    #[test]
    fn test_rescale() {
        let one_usdc = U256::from(1_000_000_u64);
        let one_dai = U256::from(10_u64).pow(U256::from(18));
        assert_eq!(rescale(one_usdc, 6, 18).unwrap(), one_dai);
        assert_eq!(rescale(one_dai, 18, 6).unwrap(), one_usdc);
        assert_eq!(rescale(one_usdc, 6, 6).unwrap(), one_usdc);
        assert_eq!(rescale(U256::from(999_u64), 18, 6).unwrap(), U256::ZERO);
    }

    proptest! {
        #[test]
        fn test_apply_bps_never_exceeds_amount(amount in any::<u128>(), bps in 0u16..=10_000) {
            let amount = U256::from(amount);
            let share = apply_bps(amount, bps).unwrap();
            prop_assert!(share <= amount);
            prop_assert!(amount - share == apply_bps(amount, 10_000 - bps).unwrap()
                || amount - share == apply_bps(amount, 10_000 - bps).unwrap() + U256::from(1));
        }
    }
}
