pub(crate) mod allocation;
pub(crate) mod controller;
pub(crate) mod ledger;
// The controller is the only place the lock is taken and released.
pub(in crate::strategy) mod lock;
pub(crate) mod settings;

pub use allocation::{AllocationPlan, AllocationPolicy};
pub use controller::InvestmentStrategy;
pub use settings::{StrategySettings, StrategySettingsQuery};
