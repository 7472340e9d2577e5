//! Allocation planning
//!
//! Splits the vault's idle primary balance into the part supplied directly to
//! the primary market and the part swapped into the secondary asset. The plan
//! is pure arithmetic; executing it is the controller's job.
//!
//! ```plain
//!                 idle primary
//!                      │
//!        ┌─────────────┴─────────────┐
//!        │ (1 - share)               │ share
//!        ▼                           ▼
//!   supply_primary              swap_primary ──swap──► ≥ parity - fee - slippage
//!        │                                                   │
//!        ▼                                                   ▼
//!   primary market                                   secondary market
//! ```

use alloy_primitives::U256;

use crate::{
    constants::BPS_DENOMINATOR,
    utils::{
        common::{apply_bps, net_of_pool_fee, rescale},
        error::{arithmetic_err, StrategyError, StrategyResult},
    },
};

use super::settings::StrategySettings;

/// How idle capital is split and how much price deviation a swap may take
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocationPolicy {
    pub secondary_share_bps: u16,
    pub max_slippage_bps: u16,
    /// Pool fee tier the swap pays, in hundredths of a bip
    pub pool_fee: u32,
    pub primary_decimals: u8,
    pub secondary_decimals: u8,
}

/// Amounts one allocation pass moves
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AllocationPlan {
    /// Primary asset supplied as is
    pub supply_primary: U256,
    /// Primary asset converted into the secondary asset
    pub swap_primary: U256,
    /// Minimum secondary output accepted for `swap_primary`
    pub min_secondary_out: U256,
}

impl AllocationPlan {
    /// Total primary asset leaving the idle balance
    pub fn routed(&self) -> U256 {
        self.supply_primary + self.swap_primary
    }
}

impl From<&StrategySettings> for AllocationPolicy {
    fn from(settings: &StrategySettings) -> Self {
        Self {
            secondary_share_bps: settings.secondary_share_bps,
            max_slippage_bps: settings.max_slippage_bps,
            pool_fee: settings.pool_fee,
            primary_decimals: settings.primary_decimals,
            secondary_decimals: settings.secondary_decimals,
        }
    }
}

impl AllocationPolicy {
    /// Plans the allocation of `idle_primary`.
    /// The whole idle balance is routed. The swap floor is the parity value
    /// net of the pool fee, less the slippage tolerance.
    pub fn plan(&self, idle_primary: U256) -> StrategyResult<AllocationPlan> {
        if self.max_slippage_bps >= BPS_DENOMINATOR {
            return Err(StrategyError::UnsafeSlippageFloor);
        }

        let swap_primary = apply_bps(idle_primary, self.secondary_share_bps)?;
        let supply_primary = idle_primary
            .checked_sub(swap_primary)
            .ok_or_else(|| arithmetic_err("Swap share exceeded the idle balance."))?;

        let min_secondary_out = if swap_primary.is_zero() {
            U256::ZERO
        } else {
            let at_parity = rescale(swap_primary, self.primary_decimals, self.secondary_decimals)?;
            let after_fee = net_of_pool_fee(at_parity, self.pool_fee)?;
            let floor = apply_bps(after_fee, BPS_DENOMINATOR - self.max_slippage_bps)?;
            if floor.is_zero() {
                // Dust that cannot be protected by a non-zero floor
                return Err(StrategyError::UnsafeSlippageFloor);
            }
            floor
        };

        Ok(AllocationPlan {
            supply_primary,
            swap_primary,
            min_secondary_out,
        })
    }
}
