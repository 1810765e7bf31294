//! Aggregate state of one registered strategy.

use serde::{Deserialize, Serialize};

use crate::domain::fixed::{scaled_fraction, ArithmeticError};
use crate::domain::primitives::{AccountId, StrategyId, Timestamp};
use crate::domain::strategy::{Assets, StrategyDef, StrategyKind, StrategyStatus};
use crate::engine::{Accrual, AccrualClock, PositionSettlement, Settlement};
use crate::ledger::position::PrincipalLedger;

/// Everything the engine tracks for one strategy: identity, lifecycle
/// status, the accrual model, the checkpoint clock, the principal ledger,
/// and the reward reserve.
///
/// A value of this type is only ever reached through its manager's lock,
/// so the methods here assume exclusive access and stay single-threaded.
#[derive(Debug, Clone)]
pub struct StrategyState {
    def: StrategyDef,
    owner: AccountId,
    status: StrategyStatus,
    clock: AccrualClock,
    accrual: Accrual,
    ledger: PrincipalLedger,
    reward_reserve: u64,
    total_paid_out: u64,
    created_at: Timestamp,
}

impl StrategyState {
    pub fn new(def: StrategyDef, owner: AccountId, now: Timestamp) -> Self {
        let accrual = Accrual::for_kind(def.kind, def.rate);
        StrategyState {
            def,
            owner,
            status: StrategyStatus::Active,
            clock: AccrualClock::new(now),
            accrual,
            ledger: PrincipalLedger::new(),
            reward_reserve: 0,
            total_paid_out: 0,
            created_at: now,
        }
    }

    pub fn id(&self) -> &StrategyId {
        &self.def.id
    }

    pub fn kind(&self) -> StrategyKind {
        self.def.kind
    }

    pub fn assets(&self) -> &Assets {
        &self.def.assets
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn status(&self) -> StrategyStatus {
        self.status
    }

    pub fn rate(&self) -> u128 {
        self.accrual.rate()
    }

    pub fn reward_reserve(&self) -> u64 {
        self.reward_reserve
    }

    pub fn total_paid_out(&self) -> u64 {
        self.total_paid_out
    }

    pub fn last_checkpoint(&self) -> Timestamp {
        self.clock.last_checkpoint()
    }

    pub fn ledger(&self) -> &PrincipalLedger {
        &self.ledger
    }

    pub fn accrual(&self) -> &Accrual {
        &self.accrual
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut PrincipalLedger {
        &mut self.ledger
    }

    pub(crate) fn set_status(&mut self, status: StrategyStatus) {
        self.status = status;
    }

    pub(crate) fn set_rate(&mut self, rate: u128) {
        self.accrual.set_rate(rate);
    }

    pub(crate) fn set_reward_reserve(&mut self, reserve: u64) {
        self.reward_reserve = reserve;
    }

    pub(crate) fn set_total_paid_out(&mut self, paid_out: u64) {
        self.total_paid_out = paid_out;
    }

    /// Stage the global settlement at `now` without writing anything.
    ///
    /// A drained strategy's books are frozen: its checkpoint still
    /// advances but the swept pool accrues nothing further.
    pub fn stage_settlement(&self, now: Timestamp) -> Result<Settlement, ArithmeticError> {
        let staked = match self.status {
            StrategyStatus::EmergencyDrained => 0,
            _ => self.ledger.total_principal(),
        };
        self.accrual.settle(&self.clock, staked, now)
    }

    /// Commit a staged settlement: advance the clock, fold the accrual.
    pub(crate) fn apply_settlement(&mut self, settlement: &Settlement) {
        self.clock.advance(settlement.checkpoint());
        self.accrual.apply(settlement);
    }

    /// Stage the per-position effect of `settlement` for `owner`. A
    /// participant without a position settles as an empty one.
    pub fn stage_position_settlement(
        &self,
        owner: &AccountId,
        settlement: &Settlement,
    ) -> Result<Option<PositionSettlement>, ArithmeticError> {
        let (principal, checkpoint, pending) = self
            .ledger
            .position(owner)
            .map(|p| (p.principal, p.checkpoint, p.pending))
            .unwrap_or((0, 0, 0));
        settlement.settle_position(principal, checkpoint, pending)
    }

    pub(crate) fn apply_position_settlement(
        &mut self,
        owner: &AccountId,
        settled: Option<PositionSettlement>,
    ) {
        if let Some(settled) = settled {
            let position = self.ledger.entry(owner);
            position.pending = settled.pending;
            position.checkpoint = settled.checkpoint;
        }
    }

    /// Accrued yield at `now`, settled or not.
    ///
    /// For interest strategies this is the pool-level cumulative yield
    /// including the unsettled tail; for staking it is the sum of every
    /// position's claimable rewards as of `now`.
    pub fn projected_yield(&self, now: Timestamp) -> Result<u64, ArithmeticError> {
        let settlement = self.stage_settlement(now)?;
        match settlement {
            Settlement::Interest { cumulative, .. } => Ok(cumulative),
            Settlement::Staking { .. } => {
                let mut outstanding: u64 = 0;
                for (_, position) in self.ledger.positions() {
                    let pending = settlement
                        .settle_position(position.principal, position.checkpoint, position.pending)?
                        .map(|p| p.pending)
                        .unwrap_or(0);
                    outstanding = outstanding.checked_add(pending).ok_or(ArithmeticError)?;
                }
                Ok(outstanding)
            }
        }
    }

    /// Principal plus accrued yield at `now`, in base units.
    pub fn total_value(&self, now: Timestamp) -> Result<u64, ArithmeticError> {
        self.ledger
            .total_principal()
            .checked_add(self.projected_yield(now)?)
            .ok_or(ArithmeticError)
    }

    /// PRECISION-scaled yield measure: accrued yield relative to current
    /// principal for interest strategies, the raw accumulator for staking.
    /// Zero when the pool is empty.
    pub fn yield_fraction(&self, now: Timestamp) -> Result<u128, ArithmeticError> {
        match self.stage_settlement(now)? {
            Settlement::Interest { cumulative, .. } => {
                Ok(scaled_fraction(cumulative, self.ledger.total_principal()))
            }
            Settlement::Staking { accumulator, .. } => Ok(accumulator),
        }
    }

    /// Point-in-time reporting snapshot.
    pub fn summarize(&self, now: Timestamp) -> Result<StrategySummary, ArithmeticError> {
        Ok(StrategySummary {
            id: self.def.id.clone(),
            kind: self.def.kind,
            assets: self.def.assets.to_string(),
            status: self.status,
            rate: self.accrual.rate(),
            total_principal: self.ledger.total_principal(),
            lifetime_deposited: self.ledger.lifetime_deposited(),
            lifetime_withdrawn: self.ledger.lifetime_withdrawn(),
            accrued_yield: self.projected_yield(now)?,
            reward_reserve: self.reward_reserve,
            total_paid_out: self.total_paid_out,
            participants: self.ledger.participants(),
            created_at: self.created_at,
            last_checkpoint: self.clock.last_checkpoint(),
        })
    }
}

/// Reporting view of a strategy, serialized as-is into the simulator's
/// end-of-run output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub id: StrategyId,
    pub kind: StrategyKind,
    pub assets: String,
    pub status: StrategyStatus,
    pub rate: u128,
    pub total_principal: u64,
    pub lifetime_deposited: u64,
    pub lifetime_withdrawn: u64,
    pub accrued_yield: u64,
    pub reward_reserve: u64,
    pub total_paid_out: u64,
    pub participants: usize,
    pub created_at: Timestamp,
    pub last_checkpoint: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixed::{PRECISION, SECONDS_PER_YEAR};
    use crate::domain::primitives::AssetId;

    fn lending_state() -> StrategyState {
        let def = StrategyDef {
            id: StrategyId::new("compound-sim".to_string()),
            kind: StrategyKind::Lending,
            assets: Assets::single(AssetId::new("DAI".to_string())),
            rate: PRECISION / 20,
        };
        StrategyState::new(def, AccountId::new("ops".to_string()), Timestamp::new(0))
    }

    fn staking_state() -> StrategyState {
        let def = StrategyDef {
            id: StrategyId::new("synthetix-sim".to_string()),
            kind: StrategyKind::Staking,
            assets: Assets::single(AssetId::new("SNX".to_string())),
            rate: 2,
        };
        StrategyState::new(def, AccountId::new("ops".to_string()), Timestamp::new(0))
    }

    fn fund(state: &mut StrategyState, owner: &AccountId, amount: u64) {
        let staged = state.ledger().stage_credit(owner, amount).unwrap();
        state.ledger_mut().commit_credit(owner, staged);
    }

    #[test]
    fn test_projected_yield_includes_unsettled_tail() {
        let mut state = lending_state();
        fund(&mut state, &AccountId::new("alice".to_string()), 1_000);
        assert_eq!(
            state.projected_yield(Timestamp::new(SECONDS_PER_YEAR)).unwrap(),
            50
        );
        // Settle halfway, then project to the full year.
        let settlement = state.stage_settlement(Timestamp::new(SECONDS_PER_YEAR / 2)).unwrap();
        state.apply_settlement(&settlement);
        assert_eq!(state.accrual().cumulative_yield(), 25);
        assert_eq!(
            state.projected_yield(Timestamp::new(SECONDS_PER_YEAR)).unwrap(),
            50
        );
    }

    #[test]
    fn test_settlement_always_advances_checkpoint() {
        let mut state = lending_state();
        // Empty pool: nothing accrues, the clock still moves.
        let settlement = state.stage_settlement(Timestamp::new(500)).unwrap();
        assert_eq!(settlement.accrued(), 0);
        state.apply_settlement(&settlement);
        assert_eq!(state.last_checkpoint(), Timestamp::new(500));
    }

    #[test]
    fn test_staking_projected_yield_sums_positions() {
        let mut state = staking_state();
        let alice = AccountId::new("alice".to_string());
        let bob = AccountId::new("bob".to_string());
        fund(&mut state, &alice, 200);
        fund(&mut state, &bob, 100);
        // 60s of 2 units/s split 2:1.
        assert_eq!(state.projected_yield(Timestamp::new(60)).unwrap(), 120);
    }

    #[test]
    fn test_drained_books_are_frozen() {
        let mut state = lending_state();
        fund(&mut state, &AccountId::new("alice".to_string()), 1_000);
        state.set_status(StrategyStatus::EmergencyDrained);
        assert_eq!(
            state.projected_yield(Timestamp::new(SECONDS_PER_YEAR)).unwrap(),
            0
        );
    }

    #[test]
    fn test_yield_fraction_relative_to_current_principal() {
        let mut state = lending_state();
        fund(&mut state, &AccountId::new("alice".to_string()), 1_000);
        let fraction = state.yield_fraction(Timestamp::new(SECONDS_PER_YEAR)).unwrap();
        assert_eq!(fraction, PRECISION / 20); // 50 over 1000
    }

    #[test]
    fn test_summary_snapshot() {
        let mut state = staking_state();
        fund(&mut state, &AccountId::new("alice".to_string()), 100);
        state.set_reward_reserve(5_000);
        let summary = state.summarize(Timestamp::new(50)).unwrap();
        assert_eq!(summary.total_principal, 100);
        assert_eq!(summary.accrued_yield, 100);
        assert_eq!(summary.reward_reserve, 5_000);
        assert_eq!(summary.participants, 1);
        assert_eq!(summary.status, StrategyStatus::Active);
    }

    #[test]
    fn test_summary_keeps_creation_time_fixed() {
        let def = StrategyDef {
            id: StrategyId::new("late-sim".to_string()),
            kind: StrategyKind::Lending,
            assets: Assets::single(AssetId::new("DAI".to_string())),
            rate: PRECISION / 20,
        };
        let mut state =
            StrategyState::new(def, AccountId::new("ops".to_string()), Timestamp::new(7_200));
        let settlement = state.stage_settlement(Timestamp::new(10_000)).unwrap();
        state.apply_settlement(&settlement);

        let summary = state.summarize(Timestamp::new(10_000)).unwrap();
        assert_eq!(summary.created_at, Timestamp::new(7_200));
        assert_eq!(summary.last_checkpoint, Timestamp::new(10_000));
    }
}
