use alloy_sol_types::sol;
use candid::{CandidType, Nat};
use serde::Deserialize;

use crate::{
    constants::{BASE_COMPTROLLER, BASE_DAI, BASE_MDAI, BASE_MUSDC, BASE_SWAP_ROUTER, BASE_USDC},
    utils::error::{StrategyError, StrategyResult},
};

/// Deployment arguments in the constructor's order, plus optional tuning.
/// Addresses are hex strings so the struct can be read from JSON or candid.
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct InitArgs {
    pub vault: String,
    pub primary_asset: String,
    pub primary_market: String,
    pub secondary_asset: String,
    pub secondary_market: String,
    pub market_controller: String,
    pub swap_router: String,
    #[serde(default)]
    pub pool_fee: Option<u32>,
    #[serde(default)]
    pub secondary_share_bps: Option<u16>,
    #[serde(default)]
    pub max_slippage_bps: Option<u16>,
    #[serde(default)]
    pub swap_deadline_secs: Option<u64>,
}

impl InitArgs {
    /// Arguments of the Base mainnet deployment for a vault living at `vault`
    pub fn base_mainnet(vault: String) -> Self {
        Self {
            vault,
            primary_asset: BASE_USDC.to_string(),
            primary_market: BASE_MUSDC.to_string(),
            secondary_asset: BASE_DAI.to_string(),
            secondary_market: BASE_MDAI.to_string(),
            market_controller: BASE_COMPTROLLER.to_string(),
            swap_router: BASE_SWAP_ROUTER.to_string(),
            pool_fee: None,
            secondary_share_bps: None,
            max_slippage_bps: None,
            swap_deadline_secs: None,
        }
    }

    /// Parses the arguments from a JSON document
    pub fn from_json(json: &str) -> StrategyResult<Self> {
        serde_json::from_str(json).map_err(|err| StrategyError::DecodingError(err.to_string()))
    }
}

/// Principal readback for a single depositor
#[derive(CandidType, Clone, Debug, PartialEq)]
pub struct DepositQuery {
    pub depositor: String,
    pub principal: Nat,
}

sol!(
    // Fungible asset
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
    }
);

sol!(
    // Compound-style market token
    #[derive(Debug)]
    interface IMToken {
        function mint(uint256 mintAmount) external returns (uint256);
        function redeem(uint256 redeemTokens) external returns (uint256);
        function redeemUnderlying(uint256 redeemAmount) external returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function underlying() external view returns (address);
    }
);

sol!(
    // Market controller
    #[derive(Debug)]
    interface IComptroller {
        function markets(address mToken) external view returns (bool isListed, uint256 collateralFactorMantissa);
        function mintGuardianPaused(address mToken) external view returns (bool);
    }
);

sol!(
    // Uniswap V3 style router
    #[derive(Debug)]
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
);
