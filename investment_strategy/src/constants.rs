//! Investment Strategy's Constants

use alloy_primitives::{address, Address, U256};

/// Denominator for basis-point parameters
pub const BPS_DENOMINATOR: u16 = 10_000;
pub fn bps_denominator() -> U256 {
    U256::from(BPS_DENOMINATOR)
}

/// Decimals of the primary asset (USDC)
pub const PRIMARY_DECIMALS: u8 = 6;

/// Decimals of the secondary asset (DAI)
pub const SECONDARY_DECIMALS: u8 = 18;

/// Upper bound accepted for token decimals
pub const MAX_DECIMALS: u8 = 36;

/// Uniswap V3 pool fee tier, in hundredths of a bip (1%)
pub const DEFAULT_POOL_FEE: u32 = 10_000;

/// Denominator of pool fee tiers (hundredths of a bip)
pub const POOL_FEE_DENOMINATOR: u32 = 1_000_000;
pub fn pool_fee_denominator() -> U256 {
    U256::from(POOL_FEE_DENOMINATOR)
}

/// Largest fee tier the router accepts (uint24 domain is larger, pools are not)
pub const MAX_POOL_FEE: u32 = POOL_FEE_DENOMINATOR;

/// Share of idle primary balance swapped into the secondary asset
pub const DEFAULT_SECONDARY_SHARE_BPS: u16 = 5_000; // 50%

/// Tolerated deviation from stable parity when swapping
pub const DEFAULT_MAX_SLIPPAGE_BPS: u16 = 100; // 1%

/// Journal entries kept in memory; older ones are pruned
pub const MAX_JOURNAL_ENTRIES: usize = 300;

/// Seconds added to the block timestamp to form the swap deadline
pub const DEFAULT_SWAP_DEADLINE_SECS: u64 = 300;

/// Compound-style error code for a successful market call
pub const MARKET_NO_ERROR: u64 = 0;

/// Revert string emitted by the swap router when the floor is not met
pub const TOO_LITTLE_RECEIVED: &str = "Too little received";

/// Base mainnet deployment
pub const BASE_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const BASE_MUSDC: Address = address!("Edc817A28E8B93B03976FBd4a3dDBc9f7D176c22");
pub const BASE_DAI: Address = address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb");
pub const BASE_MDAI: Address = address!("73b06D8d18De422E269645eaCe15400DE7462417");
pub const BASE_COMPTROLLER: Address = address!("fBb21d0380beE3312B33c4353c8936a0F13EF26C");
pub const BASE_SWAP_ROUTER: Address = address!("2626664c2603336E57B271c5C0b26F421741e481");
