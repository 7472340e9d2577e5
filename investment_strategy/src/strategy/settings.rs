//! Strategy settings fixed at construction

use alloy_primitives::Address;
use candid::CandidType;

use crate::{
    constants::{
        BPS_DENOMINATOR, DEFAULT_MAX_SLIPPAGE_BPS, DEFAULT_POOL_FEE, DEFAULT_SECONDARY_SHARE_BPS,
        DEFAULT_SWAP_DEADLINE_SECS, MAX_DECIMALS, MAX_POOL_FEE, PRIMARY_DECIMALS,
        SECONDARY_DECIMALS,
    },
    types::InitArgs,
    utils::{
        common::string_to_address,
        error::{StrategyError, StrategyResult},
    },
};

/// Immutable settings and configurations
/// Set once before the strategy is constructed and never mutated afterwards
#[derive(Clone, Debug, PartialEq)]
pub struct StrategySettings {
    /// Address the vault itself lives at, used as `msg.sender` for external calls
    pub vault: Address,
    /// Asset accepted from depositors (USDC)
    pub primary_asset: Address,
    /// Market token of the primary asset's lending market
    pub primary_market: Address,
    /// Asset the swap converts into (DAI)
    pub secondary_asset: Address,
    /// Market token of the secondary asset's lending market
    pub secondary_market: Address,
    /// Lending protocol's controller
    pub market_controller: Address,
    /// Swap router
    pub swap_router: Address,
    pub primary_decimals: u8,
    pub secondary_decimals: u8,
    /// Pool fee tier, in hundredths of a bip
    pub pool_fee: u32,
    /// Share of idle primary balance that is swapped, in basis points
    pub secondary_share_bps: u16,
    /// Maximum tolerated deviation from parity on swaps, in basis points
    pub max_slippage_bps: u16,
    /// Swap deadline, in seconds after the current block
    pub swap_deadline_secs: u64,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            vault: Address::ZERO,
            primary_asset: Address::ZERO,
            primary_market: Address::ZERO,
            secondary_asset: Address::ZERO,
            secondary_market: Address::ZERO,
            market_controller: Address::ZERO,
            swap_router: Address::ZERO,
            primary_decimals: PRIMARY_DECIMALS,
            secondary_decimals: SECONDARY_DECIMALS,
            pool_fee: DEFAULT_POOL_FEE,
            secondary_share_bps: DEFAULT_SECONDARY_SHARE_BPS,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            swap_deadline_secs: DEFAULT_SWAP_DEADLINE_SECS,
        }
    }
}

impl StrategySettings {
    /// Builds settings from the constructor's ordered argument list:
    /// `(primaryAsset, primaryMarket, secondaryAsset, secondaryMarket, marketController, swapRouter)`
    pub fn from_constructor_args(vault: Address, args: [Address; 6]) -> Self {
        let [primary_asset, primary_market, secondary_asset, secondary_market, market_controller, swap_router] =
            args;
        Self {
            vault,
            primary_asset,
            primary_market,
            secondary_asset,
            secondary_market,
            market_controller,
            swap_router,
            ..Default::default()
        }
    }

    /// Sets the vault's own address.
    pub fn vault(&mut self, vault: Address) -> &mut Self {
        self.vault = vault;
        self
    }

    /// Sets the primary asset.
    pub fn primary_asset(&mut self, primary_asset: Address) -> &mut Self {
        self.primary_asset = primary_asset;
        self
    }

    /// Sets the primary market token.
    pub fn primary_market(&mut self, primary_market: Address) -> &mut Self {
        self.primary_market = primary_market;
        self
    }

    /// Sets the secondary asset.
    pub fn secondary_asset(&mut self, secondary_asset: Address) -> &mut Self {
        self.secondary_asset = secondary_asset;
        self
    }

    /// Sets the secondary market token.
    pub fn secondary_market(&mut self, secondary_market: Address) -> &mut Self {
        self.secondary_market = secondary_market;
        self
    }

    /// Sets the lending protocol's controller.
    pub fn market_controller(&mut self, market_controller: Address) -> &mut Self {
        self.market_controller = market_controller;
        self
    }

    /// Sets the swap router.
    pub fn swap_router(&mut self, swap_router: Address) -> &mut Self {
        self.swap_router = swap_router;
        self
    }

    /// Sets the decimals of both assets.
    pub fn decimals(&mut self, primary: u8, secondary: u8) -> &mut Self {
        self.primary_decimals = primary;
        self.secondary_decimals = secondary;
        self
    }

    /// Sets the pool fee tier.
    pub fn pool_fee(&mut self, pool_fee: u32) -> &mut Self {
        self.pool_fee = pool_fee;
        self
    }

    /// Sets the swapped share of idle balance, in basis points.
    pub fn secondary_share_bps(&mut self, secondary_share_bps: u16) -> &mut Self {
        self.secondary_share_bps = secondary_share_bps;
        self
    }

    /// Sets the maximum tolerated slippage, in basis points.
    pub fn max_slippage_bps(&mut self, max_slippage_bps: u16) -> &mut Self {
        self.max_slippage_bps = max_slippage_bps;
        self
    }

    /// Sets the swap deadline window, in seconds.
    pub fn swap_deadline_secs(&mut self, swap_deadline_secs: u64) -> &mut Self {
        self.swap_deadline_secs = swap_deadline_secs;
        self
    }

    /// Rejects settings the strategy cannot run safely with
    pub fn validate(&self) -> StrategyResult<()> {
        let addresses = [
            ("vault", self.vault),
            ("primary_asset", self.primary_asset),
            ("primary_market", self.primary_market),
            ("secondary_asset", self.secondary_asset),
            ("secondary_market", self.secondary_market),
            ("market_controller", self.market_controller),
            ("swap_router", self.swap_router),
        ];

        for (name, address) in addresses.iter() {
            if address.is_zero() {
                return invalid(format!("{} is the zero address", name));
            }
        }

        for (index, (name, address)) in addresses.iter().enumerate() {
            if let Some((other, _)) = addresses[index + 1..]
                .iter()
                .find(|(_, candidate)| candidate == address)
            {
                return invalid(format!("{} and {} share the same address", name, other));
            }
        }

        if self.primary_decimals > MAX_DECIMALS || self.secondary_decimals > MAX_DECIMALS {
            return invalid(format!("decimals must not exceed {}", MAX_DECIMALS));
        }
        if self.pool_fee == 0 || self.pool_fee >= MAX_POOL_FEE {
            return invalid(format!("pool fee {} is out of range", self.pool_fee));
        }
        if self.secondary_share_bps > BPS_DENOMINATOR {
            return invalid(format!(
                "secondary share {} exceeds {} bps",
                self.secondary_share_bps, BPS_DENOMINATOR
            ));
        }
        // A slippage of 100% would make the swap floor zero
        if self.max_slippage_bps >= BPS_DENOMINATOR {
            return invalid(format!(
                "max slippage {} must stay below {} bps",
                self.max_slippage_bps, BPS_DENOMINATOR
            ));
        }
        if self.swap_deadline_secs == 0 {
            return invalid("swap deadline window must be positive".to_string());
        }
        Ok(())
    }
}

fn invalid(reason: String) -> StrategyResult<()> {
    Err(StrategyError::InvalidConfiguration(reason))
}

impl TryFrom<InitArgs> for StrategySettings {
    type Error = StrategyError;

    fn try_from(value: InitArgs) -> Result<Self, Self::Error> {
        let defaults = StrategySettings::default();
        Ok(Self {
            vault: string_to_address(value.vault)?,
            primary_asset: string_to_address(value.primary_asset)?,
            primary_market: string_to_address(value.primary_market)?,
            secondary_asset: string_to_address(value.secondary_asset)?,
            secondary_market: string_to_address(value.secondary_market)?,
            market_controller: string_to_address(value.market_controller)?,
            swap_router: string_to_address(value.swap_router)?,
            pool_fee: value.pool_fee.unwrap_or(defaults.pool_fee),
            secondary_share_bps: value
                .secondary_share_bps
                .unwrap_or(defaults.secondary_share_bps),
            max_slippage_bps: value.max_slippage_bps.unwrap_or(defaults.max_slippage_bps),
            swap_deadline_secs: value
                .swap_deadline_secs
                .unwrap_or(defaults.swap_deadline_secs),
            ..defaults
        })
    }
}

/// Readback of the configured addresses and parameters
#[derive(Clone, Debug, Default, CandidType, PartialEq)]
pub struct StrategySettingsQuery {
    pub vault: String,
    pub primary_asset: String,
    pub primary_market: String,
    pub secondary_asset: String,
    pub secondary_market: String,
    pub market_controller: String,
    pub swap_router: String,
    pub pool_fee: u32,
    pub secondary_share_bps: u16,
    pub max_slippage_bps: u16,
}

impl From<&StrategySettings> for StrategySettingsQuery {
    fn from(value: &StrategySettings) -> Self {
        Self {
            vault: value.vault.to_string(),
            primary_asset: value.primary_asset.to_string(),
            primary_market: value.primary_market.to_string(),
            secondary_asset: value.secondary_asset.to_string(),
            secondary_market: value.secondary_market.to_string(),
            market_controller: value.market_controller.to_string(),
            swap_router: value.swap_router.to_string(),
            pool_fee: value.pool_fee,
            secondary_share_bps: value.secondary_share_bps,
            max_slippage_bps: value.max_slippage_bps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_settings() -> StrategySettings {
        StrategySettings::from_constructor_args(
            Address::repeat_byte(0xaa),
            [
                Address::repeat_byte(0x01),
                Address::repeat_byte(0x10),
                Address::repeat_byte(0x02),
                Address::repeat_byte(0x20),
                Address::repeat_byte(0xc0),
                Address::repeat_byte(0x5e),
            ],
        )
    }

    #[test]
    fn test_constructor_args_order() {
        let settings = valid_settings();
        assert_eq!(settings.primary_asset, Address::repeat_byte(0x01));
        assert_eq!(settings.primary_market, Address::repeat_byte(0x10));
        assert_eq!(settings.secondary_asset, Address::repeat_byte(0x02));
        assert_eq!(settings.secondary_market, Address::repeat_byte(0x20));
        assert_eq!(settings.market_controller, Address::repeat_byte(0xc0));
        assert_eq!(settings.swap_router, Address::repeat_byte(0x5e));
        assert_eq!(settings.pool_fee, DEFAULT_POOL_FEE);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_address() {
        let mut settings = valid_settings();
        settings.swap_router(Address::ZERO);
        assert!(matches!(
            settings.validate(),
            Err(StrategyError::InvalidConfiguration(reason)) if reason.contains("swap_router")
        ));
    }

    #[test]
    fn test_validate_rejects_shared_address() {
        let mut settings = valid_settings();
        settings.secondary_asset(Address::repeat_byte(0x01));
        assert!(matches!(
            settings.validate(),
            Err(StrategyError::InvalidConfiguration(reason)) if reason.contains("same address")
        ));
    }

    #[test]
    fn test_validate_rejects_full_slippage() {
        let mut settings = valid_settings();
        settings.max_slippage_bps(10_000);
        assert!(settings.validate().is_err());

        settings.max_slippage_bps(9_999);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_share_above_one() {
        let mut settings = valid_settings();
        settings.secondary_share_bps(10_001);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_try_from_init_args() {
        let mut args = InitArgs::base_mainnet("0x00000000000000000000000000000000000000aa".to_string());
        args.secondary_share_bps = Some(2_500);

        let settings = StrategySettings::try_from(args).unwrap();
        assert_eq!(settings.secondary_share_bps, 2_500);
        assert_eq!(settings.max_slippage_bps, DEFAULT_MAX_SLIPPAGE_BPS);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_try_from_init_args_bad_address() {
        let mut args = InitArgs::base_mainnet("0x00000000000000000000000000000000000000aa".to_string());
        args.swap_router = "router".to_string();
        assert!(matches!(
            StrategySettings::try_from(args),
            Err(StrategyError::DecodingError(_))
        ));
    }

    #[test]
    fn test_query_readback() {
        let settings = valid_settings();
        let query = StrategySettingsQuery::from(&settings);
        assert_eq!(query.primary_asset, Address::repeat_byte(0x01).to_string());
        assert_eq!(query.swap_router, Address::repeat_byte(0x5e).to_string());
        assert_eq!(query.pool_fee, DEFAULT_POOL_FEE);
    }

    // Property-based test for StrategySettings setters
    proptest! {
        #[test]
        fn test_strategy_settings_proptest(
            vault in any::<[u8; 20]>(),
            primary_asset in any::<[u8; 20]>(),
            swap_router in any::<[u8; 20]>(),
            pool_fee in any::<u32>(),
            secondary_share_bps in any::<u16>(),
            max_slippage_bps in any::<u16>(),
        ) {
            let mut settings = StrategySettings::default();

            let vault = Address::from_slice(&vault);
            let primary_asset = Address::from_slice(&primary_asset);
            let swap_router = Address::from_slice(&swap_router);

            settings.vault(vault)
                .primary_asset(primary_asset)
                .swap_router(swap_router)
                .pool_fee(pool_fee)
                .secondary_share_bps(secondary_share_bps)
                .max_slippage_bps(max_slippage_bps);

            prop_assert_eq!(settings.vault, vault);
            prop_assert_eq!(settings.primary_asset, primary_asset);
            prop_assert_eq!(settings.swap_router, swap_router);
            prop_assert_eq!(settings.pool_fee, pool_fee);
            prop_assert_eq!(settings.secondary_share_bps, secondary_share_bps);
            prop_assert_eq!(settings.max_slippage_bps, max_slippage_bps);
        }
    }
}
