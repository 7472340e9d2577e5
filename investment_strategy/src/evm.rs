//! Execution backend seam
//!
//! Every external interaction of the strategy is an ABI-encoded call routed
//! through an [`EvmBackend`]. The backend is the execution environment: it runs
//! individual calls and can snapshot and restore its whole state, which is
//! what makes a public strategy operation atomic.

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
#[cfg(test)]
use mockall::automock;

use crate::utils::{
    common::{calldata_hex, decode_abi_response},
    error::StrategyResult,
};

/// Snapshot identifier handed out by [`EvmBackend::snapshot`]
pub type SnapshotId = u64;

#[cfg_attr(test, automock)]
pub trait EvmBackend {
    /// Executes a state-changing call with `from` as `msg.sender`.
    /// A revert is reported as `StrategyError::Reverted` and leaves the backend unchanged.
    fn call(&mut self, from: Address, to: Address, data: Vec<u8>) -> StrategyResult<Vec<u8>>;

    /// Executes a read-only call
    fn static_call(&self, to: Address, data: Vec<u8>) -> StrategyResult<Vec<u8>>;

    /// Records the current state
    fn snapshot(&mut self) -> SnapshotId;

    /// Restores the state recorded by `snapshot`, discarding later snapshots
    fn revert_to(&mut self, snapshot: SnapshotId) -> StrategyResult<()>;

    /// Drops `snapshot` and every later one once the state they guard is final
    fn discard_snapshot(&mut self, snapshot: SnapshotId);

    /// Current block timestamp in seconds
    fn timestamp(&self) -> u64;
}

/// Encodes `call`, sends it from `from` to `to` and decodes the return data
pub fn send<C, B>(backend: &mut B, from: Address, to: Address, call: &C) -> StrategyResult<C::Return>
where
    C: SolCall,
    B: EvmBackend + ?Sized,
{
    let data = call.abi_encode();
    tracing::debug!(%from, %to, selector = %calldata_hex(&C::SELECTOR), "sending call");
    let raw = backend.call(from, to, data)?;
    decode_abi_response::<C::Return, C>(&raw)
}

/// Encodes `call`, runs it read-only against `to` and decodes the return data
pub fn query<C, B>(backend: &B, to: Address, call: &C) -> StrategyResult<C::Return>
where
    C: SolCall,
    B: EvmBackend + ?Sized,
{
    let raw = backend.static_call(to, call.abi_encode())?;
    decode_abi_response::<C::Return, C>(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{types::IERC20, utils::error::StrategyError};
    use alloy_primitives::U256;
    use alloy_sol_types::SolValue;

    #[test]
    fn test_send_encodes_and_decodes() {
        let vault = Address::repeat_byte(0xaa);
        let token = Address::repeat_byte(0x11);
        let recipient = Address::repeat_byte(0x22);

        let mut backend = MockEvmBackend::new();
        backend
            .expect_call()
            .withf(move |from, to, data| {
                *from == vault && *to == token && data[..4] == IERC20::transferCall::SELECTOR
            })
            .times(1)
            .returning(|_, _, _| Ok(true.abi_encode()));

        let result = send(
            &mut backend,
            vault,
            token,
            &IERC20::transferCall {
                to: recipient,
                amount: U256::from(5),
            },
        )
        .unwrap();
        assert!(result._0);
    }

    #[test]
    fn test_query_propagates_revert() {
        let mut backend = MockEvmBackend::new();
        backend
            .expect_static_call()
            .returning(|_, _| Err(StrategyError::Reverted("no code".to_string())));

        let result = query(
            &backend,
            Address::repeat_byte(0x11),
            &IERC20::balanceOfCall {
                account: Address::repeat_byte(0x22),
            },
        );
        assert_eq!(result.unwrap_err(), StrategyError::Reverted("no code".to_string()));
    }
}
