//! The strategy controller: the vault's public surface.
//!
//! Deposits are pulled into the vault and recorded per depositor. Idle
//! primary balance is later split between a direct supply to the primary
//! market and a swap into the secondary asset, which is supplied to the
//! secondary market. Each public operation runs under the re-entry lock and
//! against a backend snapshot: on any failure the backend is rolled back and
//! only the failure is journaled.

use alloy_primitives::{Address, U256};

use crate::{
    adapters::{Market, MarketAdapter, MarketId, SwapAdapter, SwapRequest, TokenAdapter},
    evm::EvmBackend,
    journal::{Journal, JournalCollection, JournalEntry, LogType},
    types::{DepositQuery, InitArgs},
    utils::{
        common::u256_to_nat,
        error::{arithmetic_err, StrategyError, StrategyResult},
    },
};

use super::{
    allocation::AllocationPolicy,
    ledger::DepositLedger,
    lock::Lock,
    settings::{StrategySettings, StrategySettingsQuery},
};

pub struct InvestmentStrategy<B: EvmBackend> {
    /// Immutable settings and configurations
    settings: StrategySettings,
    /// Principal per depositor
    ledger: DepositLedger,
    /// Held while a public operation runs
    pub(in crate::strategy) lock: Lock,
    journal: Journal,
    tokens: TokenAdapter,
    markets: MarketAdapter,
    router: SwapAdapter,
    backend: B,
}

impl<B: EvmBackend> InvestmentStrategy<B> {
    /// Validates `settings` and binds the strategy to `backend`
    pub fn new(settings: StrategySettings, backend: B) -> StrategyResult<Self> {
        settings.validate()?;

        let tokens = TokenAdapter::new(settings.vault);
        let markets = MarketAdapter::new(
            settings.vault,
            settings.market_controller,
            Market {
                market_token: settings.primary_market,
                underlying: settings.primary_asset,
            },
            Market {
                market_token: settings.secondary_market,
                underlying: settings.secondary_asset,
            },
        );
        let router = SwapAdapter::new(
            settings.vault,
            settings.swap_router,
            settings.pool_fee,
            settings.swap_deadline_secs,
        );

        tracing::info!(
            vault = %settings.vault,
            primary = %settings.primary_asset,
            secondary = %settings.secondary_asset,
            "investment strategy initialized"
        );

        Ok(Self {
            settings,
            ledger: DepositLedger::default(),
            lock: Lock::default(),
            journal: Journal::default(),
            tokens,
            markets,
            router,
            backend,
        })
    }

    pub fn from_init_args(args: InitArgs, backend: B) -> StrategyResult<Self> {
        Self::new(StrategySettings::try_from(args)?, backend)
    }

    /// Pulls `amount` of the primary asset from `caller` into the vault and
    /// credits it to the caller's principal.
    pub fn deposit_usdc(&mut self, caller: Address, amount: U256) -> StrategyResult<()> {
        self.execute("deposit_usdc", caller, |strategy, journal| {
            strategy.pull_deposit(caller, amount, journal)
        })
    }

    /// Allocates the vault's whole idle primary balance across both markets.
    /// Open to any caller; a vault with nothing idle is left untouched.
    pub fn deposit_in_strategy(&mut self, caller: Address) -> StrategyResult<()> {
        self.execute("deposit_in_strategy", caller, |strategy, journal| {
            strategy.allocate(journal)
        })
    }

    /// Runs `operation` under the lock and a backend snapshot.
    /// Buffered journal entries are committed only if the operation succeeds.
    fn execute<T>(
        &mut self,
        name: &str,
        caller: Address,
        operation: impl FnOnce(&mut Self, &mut JournalCollection) -> StrategyResult<T>,
    ) -> StrategyResult<T> {
        let now = self.backend.timestamp();

        if let Err(err) = self.lock.try_lock() {
            self.record_outcome(now, name, caller, Err(err.clone()));
            return Err(err);
        }

        let snapshot = self.backend.snapshot();
        let mut journal = JournalCollection::new(now);

        let result = match operation(self, &mut journal) {
            Ok(value) => {
                self.backend.discard_snapshot(snapshot);
                self.journal.commit_collection(journal);
                Ok(value)
            }
            Err(err) => match self.backend.revert_to(snapshot) {
                Ok(()) => Err(err),
                Err(revert_err) => {
                    tracing::error!(operation = name, error = %revert_err, "rollback failed");
                    Err(StrategyError::Custom(format!(
                        "{} and the rollback failed: {}",
                        err, revert_err
                    )))
                }
            },
        };

        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.record_outcome(now, name, caller, outcome);
        self.lock.unlock(true);
        result
    }

    fn record_outcome(&mut self, now: u64, name: &str, caller: Address, outcome: StrategyResult<()>) {
        self.journal.commit(
            JournalEntry::new(now, outcome, LogType::ExecutionResult)
                .account(caller)
                .note(name),
        );
    }

    fn pull_deposit(
        &mut self,
        caller: Address,
        amount: U256,
        journal: &mut JournalCollection,
    ) -> StrategyResult<()> {
        if amount.is_zero() {
            return Err(StrategyError::ZeroAmount);
        }
        // Fails on overflow before any funds move
        self.ledger.preview_deposit(caller, amount)?;

        let primary = self.settings.primary_asset;
        let vault = self.settings.vault;

        let before = self.tokens.balance_of(&self.backend, primary, vault)?;
        self.tokens.pull(&mut self.backend, primary, caller, amount)?;
        let after = self.tokens.balance_of(&self.backend, primary, vault)?;

        let received = after.saturating_sub(before);
        if received != amount {
            return Err(StrategyError::TransferFailed(format!(
                "vault received {} instead of {}",
                received, amount
            )));
        }

        let principal = self.ledger.record_deposit(caller, amount)?;
        journal.push(
            journal
                .prepare(LogType::Deposit)
                .account(caller)
                .amount(amount)
                .note(format!("Principal is now {}.", principal)),
        );
        Ok(())
    }

    fn allocate(&mut self, journal: &mut JournalCollection) -> StrategyResult<()> {
        let vault = self.settings.vault;
        let primary = self.settings.primary_asset;
        let secondary = self.settings.secondary_asset;

        let idle = self.tokens.balance_of(&self.backend, primary, vault)?;
        if idle.is_zero() {
            journal.append_note(LogType::Info, "No idle primary balance to allocate.");
            return Ok(());
        }

        let plan = AllocationPolicy::from(&self.settings).plan(idle)?;
        journal.push(
            journal
                .prepare(LogType::Allocation)
                .amount(idle)
                .note(format!(
                    "Planned {} to the primary market and {} through the swap (minimum out {}).",
                    plan.supply_primary, plan.swap_primary, plan.min_secondary_out
                )),
        );

        if !plan.swap_primary.is_zero() {
            let received = self.router.swap_exact_input(
                &mut self.backend,
                &self.tokens,
                SwapRequest {
                    token_in: primary,
                    token_out: secondary,
                    amount_in: plan.swap_primary,
                    min_amount_out: plan.min_secondary_out,
                    recipient: vault,
                },
            )?;
            journal.push(
                journal
                    .prepare(LogType::Swap)
                    .amount(received)
                    .note(format!("Swapped {} of the primary asset.", plan.swap_primary)),
            );
        }

        if !plan.supply_primary.is_zero() {
            let minted = self.markets.supply(
                &mut self.backend,
                &self.tokens,
                MarketId::Primary,
                plan.supply_primary,
            )?;
            journal.push(
                journal
                    .prepare(LogType::Supply)
                    .amount(plan.supply_primary)
                    .note(format!("Primary market minted {} market tokens.", minted)),
            );
        }

        // Includes any secondary balance the vault held before this pass
        let idle_secondary = self.tokens.balance_of(&self.backend, secondary, vault)?;
        if !idle_secondary.is_zero() {
            let minted = self.markets.supply(
                &mut self.backend,
                &self.tokens,
                MarketId::Secondary,
                idle_secondary,
            )?;
            journal.push(
                journal
                    .prepare(LogType::Supply)
                    .amount(idle_secondary)
                    .note(format!("Secondary market minted {} market tokens.", minted)),
            );
        }

        let expected = idle
            .checked_sub(plan.routed())
            .ok_or_else(|| arithmetic_err("Routed amount exceeded the idle balance."))?;
        let remaining = self.tokens.balance_of(&self.backend, primary, vault)?;
        if remaining != expected {
            return Err(StrategyError::Custom(format!(
                "Idle primary balance is {} after allocation, expected {}.",
                remaining, expected
            )));
        }

        Ok(())
    }

    /// Principal recorded for `depositor`; zero if they never deposited
    pub fn principal_of(&self, depositor: Address) -> U256 {
        self.ledger.principal_of(depositor)
    }

    pub fn total_principal(&self) -> U256 {
        self.ledger.total_principal()
    }

    /// Number of distinct depositors
    pub fn depositor_count(&self) -> usize {
        self.ledger.depositors()
    }

    pub fn deposit_query(&self, depositor: Address) -> DepositQuery {
        DepositQuery {
            depositor: depositor.to_string(),
            principal: u256_to_nat(&self.principal_of(depositor)),
        }
    }

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    pub fn settings_query(&self) -> StrategySettingsQuery {
        StrategySettingsQuery::from(&self.settings)
    }

    pub fn primary_asset(&self) -> Address {
        self.settings.primary_asset
    }

    pub fn secondary_asset(&self) -> Address {
        self.settings.secondary_asset
    }

    pub fn primary_market(&self) -> Address {
        self.settings.primary_market
    }

    pub fn secondary_market(&self) -> Address {
        self.settings.secondary_market
    }

    pub fn comptroller(&self) -> Address {
        self.settings.market_controller
    }

    pub fn swap_router(&self) -> Address {
        self.settings.swap_router
    }

    /// Primary asset held by the vault and not yet allocated
    pub fn idle_primary(&self) -> StrategyResult<U256> {
        self.tokens
            .balance_of(&self.backend, self.settings.primary_asset, self.settings.vault)
    }

    /// Secondary asset held by the vault and not yet supplied
    pub fn idle_secondary(&self) -> StrategyResult<U256> {
        self.tokens
            .balance_of(&self.backend, self.settings.secondary_asset, self.settings.vault)
    }

    /// Market tokens the vault holds in `id`
    pub fn supplied_balance(&self, id: MarketId) -> StrategyResult<U256> {
        self.markets.supplied_balance(&self.backend, id)
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
