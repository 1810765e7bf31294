//! Per-participant principal book for a single strategy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::fixed::ArithmeticError;
use crate::domain::primitives::AccountId;
use crate::error::{EngineError, EngineResult};

/// One participant's stake in a strategy.
///
/// `checkpoint` and `pending` are only meaningful under the staking model;
/// interest-bearing strategies accrue at pool level and leave them at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Base units currently at stake.
    pub principal: u64,
    /// Accumulator value at this position's last settlement.
    pub checkpoint: u128,
    /// Settled, claimable reward units.
    pub pending: u64,
    /// Total ever deposited by this participant.
    pub lifetime_deposited: u64,
    /// Total ever withdrawn by this participant.
    pub lifetime_withdrawn: u64,
}

/// Precomputed outcome of a credit. All checked sums happen at staging
/// time so the commit is a plain field write that cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct StagedCredit {
    position_principal: u64,
    position_lifetime: u64,
    total_principal: u64,
    ledger_lifetime: u64,
}

/// Precomputed outcome of a debit, staged the same way as [`StagedCredit`].
#[derive(Debug, Clone, Copy)]
pub struct StagedDebit {
    position_principal: u64,
    position_lifetime: u64,
    total_principal: u64,
    ledger_lifetime: u64,
}

/// Principal ledger for one strategy.
///
/// Invariant: `total_principal` equals the sum of all position principals
/// and the net of the lifetime flow counters at every observable point
/// (`conservation_holds` recomputes both).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrincipalLedger {
    total_principal: u64,
    lifetime_deposited: u64,
    lifetime_withdrawn: u64,
    positions: HashMap<AccountId, Position>,
}

impl PrincipalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_principal(&self) -> u64 {
        self.total_principal
    }

    pub fn lifetime_deposited(&self) -> u64 {
        self.lifetime_deposited
    }

    pub fn lifetime_withdrawn(&self) -> u64 {
        self.lifetime_withdrawn
    }

    /// Number of positions ever opened, including ones withdrawn to zero.
    pub fn participants(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, owner: &AccountId) -> Option<&Position> {
        self.positions.get(owner)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&AccountId, &Position)> {
        self.positions.iter()
    }

    /// Mutable position access for settlement writes, inserting a fresh
    /// zero position for a first-time participant.
    pub(crate) fn entry(&mut self, owner: &AccountId) -> &mut Position {
        self.positions.entry(owner.clone()).or_default()
    }

    /// Validate a deposit of `amount` for `owner` without writing anything.
    pub(crate) fn stage_credit(
        &self,
        owner: &AccountId,
        amount: u64,
    ) -> Result<StagedCredit, ArithmeticError> {
        let (principal, lifetime) = self
            .positions
            .get(owner)
            .map(|p| (p.principal, p.lifetime_deposited))
            .unwrap_or((0, 0));
        Ok(StagedCredit {
            position_principal: principal.checked_add(amount).ok_or(ArithmeticError)?,
            position_lifetime: lifetime.checked_add(amount).ok_or(ArithmeticError)?,
            total_principal: self
                .total_principal
                .checked_add(amount)
                .ok_or(ArithmeticError)?,
            ledger_lifetime: self
                .lifetime_deposited
                .checked_add(amount)
                .ok_or(ArithmeticError)?,
        })
    }

    /// Apply a staged credit. Returns the position's new principal.
    pub(crate) fn commit_credit(&mut self, owner: &AccountId, staged: StagedCredit) -> u64 {
        let position = self.entry(owner);
        position.principal = staged.position_principal;
        position.lifetime_deposited = staged.position_lifetime;
        self.total_principal = staged.total_principal;
        self.lifetime_deposited = staged.ledger_lifetime;
        staged.position_principal
    }

    /// Validate a withdrawal of `amount` for `owner` without writing
    /// anything. A missing position holds zero principal.
    pub(crate) fn stage_debit(&self, owner: &AccountId, amount: u64) -> EngineResult<StagedDebit> {
        let (principal, lifetime) = self
            .positions
            .get(owner)
            .map(|p| (p.principal, p.lifetime_withdrawn))
            .unwrap_or((0, 0));
        let position_principal = principal
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientBalance)?;
        Ok(StagedDebit {
            position_principal,
            position_lifetime: lifetime
                .checked_add(amount)
                .ok_or(EngineError::ArithmeticOverflow)?,
            // Conservation guarantees the pool covers any single position,
            // but the subtraction stays checked all the same.
            total_principal: self
                .total_principal
                .checked_sub(amount)
                .ok_or(EngineError::ArithmeticOverflow)?,
            ledger_lifetime: self
                .lifetime_withdrawn
                .checked_add(amount)
                .ok_or(EngineError::ArithmeticOverflow)?,
        })
    }

    /// Apply a staged debit. Returns the position's remaining principal.
    pub(crate) fn commit_debit(&mut self, owner: &AccountId, staged: StagedDebit) -> u64 {
        let position = self.entry(owner);
        position.principal = staged.position_principal;
        position.lifetime_withdrawn = staged.position_lifetime;
        self.total_principal = staged.total_principal;
        self.lifetime_withdrawn = staged.ledger_lifetime;
        staged.position_principal
    }

    /// Recompute the position sum and compare it against `total_principal`,
    /// then cross-check the lifetime flow counters against the same total.
    pub fn conservation_holds(&self) -> bool {
        let sum: u128 = self.positions.values().map(|p| p.principal as u128).sum();
        sum == self.total_principal as u128
            && self.lifetime_withdrawn as u128 + self.total_principal as u128
                == self.lifetime_deposited as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice".to_string())
    }

    fn bob() -> AccountId {
        AccountId::new("bob".to_string())
    }

    #[test]
    fn test_credit_then_debit_keeps_conservation() {
        let mut ledger = PrincipalLedger::new();
        let staged = ledger.stage_credit(&alice(), 1_000).unwrap();
        assert_eq!(ledger.commit_credit(&alice(), staged), 1_000);
        let staged = ledger.stage_credit(&bob(), 500).unwrap();
        ledger.commit_credit(&bob(), staged);

        assert_eq!(ledger.total_principal(), 1_500);
        assert!(ledger.conservation_holds());

        let staged = ledger.stage_debit(&alice(), 400).unwrap();
        assert_eq!(ledger.commit_debit(&alice(), staged), 600);
        assert_eq!(ledger.total_principal(), 1_100);
        assert_eq!(ledger.lifetime_withdrawn(), 400);
        assert!(ledger.conservation_holds());
    }

    #[test]
    fn test_stage_debit_rejects_overdraw() {
        let mut ledger = PrincipalLedger::new();
        let staged = ledger.stage_credit(&alice(), 100).unwrap();
        ledger.commit_credit(&alice(), staged);

        assert_eq!(
            ledger.stage_debit(&alice(), 101).unwrap_err(),
            EngineError::InsufficientBalance
        );
        // Unknown participant holds zero.
        assert_eq!(
            ledger.stage_debit(&bob(), 1).unwrap_err(),
            EngineError::InsufficientBalance
        );
        assert_eq!(ledger.total_principal(), 100);
    }

    #[test]
    fn test_stage_credit_rejects_overflowing_position() {
        let mut ledger = PrincipalLedger::new();
        let staged = ledger.stage_credit(&alice(), u64::MAX).unwrap();
        ledger.commit_credit(&alice(), staged);
        assert_eq!(ledger.stage_credit(&alice(), 1).unwrap_err(), ArithmeticError);
        // Failed staging left everything untouched.
        assert_eq!(ledger.total_principal(), u64::MAX);
        assert!(ledger.conservation_holds());
    }

    #[test]
    fn test_withdraw_to_zero_keeps_position_record() {
        let mut ledger = PrincipalLedger::new();
        let staged = ledger.stage_credit(&alice(), 250).unwrap();
        ledger.commit_credit(&alice(), staged);
        let staged = ledger.stage_debit(&alice(), 250).unwrap();
        ledger.commit_debit(&alice(), staged);

        let position = ledger.position(&alice()).unwrap();
        assert_eq!(position.principal, 0);
        assert_eq!(position.lifetime_deposited, 250);
        assert_eq!(position.lifetime_withdrawn, 250);
        assert_eq!(ledger.participants(), 1);
    }
}
