//! A vault strategy that takes stablecoin deposits, records each depositor's
//! principal and spreads idle capital across two lending markets, converting
//! part of it through a swap router on the way.

pub mod adapters;
mod constants;
pub mod evm;
pub mod journal;
#[cfg(any(test, feature = "sandbox"))]
pub mod sandbox;
pub mod strategy;
pub mod types;
mod utils;

pub use evm::{EvmBackend, SnapshotId};
pub use strategy::{InvestmentStrategy, StrategySettings};
pub use types::{DepositQuery, InitArgs};
pub use utils::error::{StrategyError, StrategyResult};
