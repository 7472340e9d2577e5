//! Re-entry Guard
//!
//! A single-entry flag held for the whole duration of a public strategy
//! operation. An external call that re-enters the strategy while the flag is
//! held is refused before it can read or move any balance.
//!
//! ```plain
//! Lock State Machine:
//!
//!         ┌──────────┐
//!    ┌────► Unlocked │
//!    │    └──────────┘
//!    │         │
//! unlock    try_lock ──── held ───► Err(Locked)
//!    │         │
//!    │         ▼
//!    │    ┌─────────┐
//!    └────┤ Locked  │
//!         └─────────┘
//! ```
//!
//! Operations never suspend, so unlike a timer-driven lock there is no
//! timeout: the holder always releases before returning.

use crate::utils::error::{StrategyError, StrategyResult};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lock {
    /// Current lock state
    pub is_locked: bool,
}

impl Lock {
    /// Attempts to acquire the lock.
    ///
    /// # Returns
    /// * `Ok(())` - Lock successfully acquired
    /// * `Err(StrategyError::Locked)` - Lock is held
    pub fn try_lock(&mut self) -> StrategyResult<()> {
        if self.is_locked {
            return Err(StrategyError::Locked);
        }
        self.is_locked = true;
        Ok(())
    }

    /// Releases the lock if it was legitimately acquired.
    ///
    /// # Arguments
    /// * `acquired_lock` - Whether the caller previously acquired the lock
    pub fn unlock(&mut self, acquired_lock: bool) -> &mut Self {
        if acquired_lock {
            self.is_locked = false;
        }
        self
    }
}
