//! Concurrency and capability guards around strategy state.

use std::sync::RwLock;

use crate::domain::primitives::AccountId;
use crate::domain::strategy::StrategyStatus;
use crate::error::{EngineError, EngineResult};
use crate::ledger::strategy::StrategyState;

/// One strategy's state behind its exclusive-access lock.
///
/// A mutation holds the write lock for its whole settle, validate,
/// transfer, commit span, so operations on the same strategy serialize
/// and no reader ever observes a half-applied one. Queries share the
/// read lock. A poisoned lock surfaces as [`EngineError::LockPoisoned`]
/// instead of a panic.
#[derive(Debug)]
pub struct StrategyCell {
    inner: RwLock<StrategyState>,
}

impl StrategyCell {
    pub fn new(state: StrategyState) -> Self {
        StrategyCell {
            inner: RwLock::new(state),
        }
    }

    /// Run `op` with exclusive access to the state.
    pub fn mutate<T>(
        &self,
        op: impl FnOnce(&mut StrategyState) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut state = self.inner.write().map_err(|_| EngineError::LockPoisoned)?;
        op(&mut state)
    }

    /// Run `op` with shared read access to the state.
    pub fn read<T>(&self, op: impl FnOnce(&StrategyState) -> EngineResult<T>) -> EngineResult<T> {
        let state = self.inner.read().map_err(|_| EngineError::LockPoisoned)?;
        op(&state)
    }
}

/// Reject callers other than the strategy owner.
pub fn require_owner(state: &StrategyState, caller: &AccountId) -> EngineResult<()> {
    if state.owner() != caller {
        return Err(EngineError::Unauthorized);
    }
    Ok(())
}

/// Reject participant flows unless the strategy is fully active.
pub fn require_accepting(state: &StrategyState) -> EngineResult<()> {
    match state.status() {
        StrategyStatus::Active => Ok(()),
        StrategyStatus::Paused | StrategyStatus::EmergencyDrained => {
            Err(EngineError::StrategyInactive(state.id().clone()))
        }
    }
}

/// Reject everything on a drained strategy. Admin operations stay legal
/// while a strategy is merely paused.
pub fn require_not_drained(state: &StrategyState) -> EngineResult<()> {
    match state.status() {
        StrategyStatus::EmergencyDrained => Err(EngineError::StrategyInactive(state.id().clone())),
        StrategyStatus::Active | StrategyStatus::Paused => Ok(()),
    }
}

/// Reject amounts the ledger cannot meaningfully record.
pub fn require_positive(amount: u64) -> EngineResult<()> {
    if amount == 0 {
        return Err(EngineError::InvalidAmount);
    }
    Ok(())
}
