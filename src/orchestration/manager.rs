//! Position manager: the single entry point for every strategy operation.
//!
//! Each mutation runs the same pipeline under the strategy's write lock:
//! settle accrual, validate preconditions, execute the external transfer,
//! then commit precomputed field writes and publish events. Because every
//! fallible step happens before the transfer and every write after it is
//! staged, a failure at any point leaves the books exactly as they were.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::custody::TokenGateway;
use crate::domain::primitives::{AccountId, StrategyId, Timestamp};
use crate::domain::strategy::{StrategyDef, StrategyStatus};
use crate::engine::{distributor, Settlement};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventSink, LedgerEvent};
use crate::ledger::position::Position;
use crate::ledger::strategy::{StrategyState, StrategySummary};
use crate::orchestration::guard::{
    require_accepting, require_not_drained, require_owner, require_positive, StrategyCell,
};

/// Outcome of a committed deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub strategy: StrategyId,
    pub owner: AccountId,
    pub amount: u64,
    pub position_principal: u64,
    pub total_principal: u64,
    pub at: Timestamp,
}

/// Outcome of a committed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub strategy: StrategyId,
    pub owner: AccountId,
    pub amount: u64,
    pub position_principal: u64,
    pub total_principal: u64,
    pub at: Timestamp,
}

/// Outcome of a claim. `amount` is zero when nothing was claimable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub strategy: StrategyId,
    pub owner: AccountId,
    pub amount: u64,
    pub at: Timestamp,
}

/// Outcome of an emergency drain: everything custodied, in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyReceipt {
    pub strategy: StrategyId,
    pub owner: AccountId,
    pub amount: u64,
    pub at: Timestamp,
}

/// Registry of strategies plus the collaborators every operation needs.
///
/// The outer registry lock is only held long enough to resolve a
/// [`StrategyCell`]; per-strategy work happens under that cell's own lock,
/// so operations on different strategies never contend.
#[derive(Debug)]
pub struct PositionManager {
    strategies: RwLock<HashMap<StrategyId, Arc<StrategyCell>>>,
    gateway: Arc<dyn TokenGateway>,
    events: Arc<dyn EventSink>,
}

impl PositionManager {
    pub fn new(gateway: Arc<dyn TokenGateway>, events: Arc<dyn EventSink>) -> Self {
        PositionManager {
            strategies: RwLock::new(HashMap::new()),
            gateway,
            events,
        }
    }

    /// Register a new strategy owned by `owner`, with its accrual clock
    /// starting at `now`.
    pub fn create_strategy(
        &self,
        def: StrategyDef,
        owner: AccountId,
        now: Timestamp,
    ) -> EngineResult<()> {
        let mut strategies = self
            .strategies
            .write()
            .map_err(|_| EngineError::LockPoisoned)?;
        if strategies.contains_key(&def.id) {
            return Err(EngineError::StrategyExists(def.id));
        }
        let id = def.id.clone();
        let state = StrategyState::new(def, owner.clone(), now);
        strategies.insert(id.clone(), Arc::new(StrategyCell::new(state)));
        drop(strategies);
        self.events.publish(&LedgerEvent::StrategyCreated {
            strategy: id,
            owner,
            at: now,
        });
        Ok(())
    }

    /// Registered strategy ids in stable order.
    pub fn strategy_ids(&self) -> EngineResult<Vec<StrategyId>> {
        let strategies = self
            .strategies
            .read()
            .map_err(|_| EngineError::LockPoisoned)?;
        let mut ids: Vec<StrategyId> = strategies.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn cell(&self, id: &StrategyId) -> EngineResult<Arc<StrategyCell>> {
        let strategies = self
            .strategies
            .read()
            .map_err(|_| EngineError::LockPoisoned)?;
        strategies
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::StrategyNotFound(id.clone()))
    }

    /// Deposit `amount` base units into `id` for `owner`.
    pub fn deposit(
        &self,
        id: &StrategyId,
        owner: &AccountId,
        amount: u64,
        now: Timestamp,
    ) -> EngineResult<DepositReceipt> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_accepting(state)?;
            require_positive(amount)?;
            let settlement = state.stage_settlement(now)?;
            let position_settlement = state.stage_position_settlement(owner, &settlement)?;
            let staged = state.ledger().stage_credit(owner, amount)?;

            self.gateway
                .transfer_in(owner, state.assets().principal_asset(), amount)?;

            state.apply_settlement(&settlement);
            state.apply_position_settlement(owner, position_settlement);
            let position_principal = state.ledger_mut().commit_credit(owner, staged);

            self.emit_accrued(state.id(), &settlement);
            let receipt = DepositReceipt {
                strategy: state.id().clone(),
                owner: owner.clone(),
                amount,
                position_principal,
                total_principal: state.ledger().total_principal(),
                at: settlement.checkpoint(),
            };
            self.events.publish(&LedgerEvent::DepositCompleted {
                strategy: receipt.strategy.clone(),
                owner: receipt.owner.clone(),
                amount: receipt.amount,
                position_principal: receipt.position_principal,
                total_principal: receipt.total_principal,
                at: receipt.at,
            });
            Ok(receipt)
        })
    }

    /// Withdraw `amount` base units of principal from `id` for `owner`.
    ///
    /// Bounded by the caller's recorded principal. Accrued yield is not
    /// withdrawable here; staking rewards flow through [`Self::claim`].
    pub fn withdraw(
        &self,
        id: &StrategyId,
        owner: &AccountId,
        amount: u64,
        now: Timestamp,
    ) -> EngineResult<WithdrawReceipt> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_accepting(state)?;
            require_positive(amount)?;
            let settlement = state.stage_settlement(now)?;
            let position_settlement = state.stage_position_settlement(owner, &settlement)?;
            let staged = state.ledger().stage_debit(owner, amount)?;

            self.gateway
                .transfer_out(owner, state.assets().principal_asset(), amount)?;

            state.apply_settlement(&settlement);
            state.apply_position_settlement(owner, position_settlement);
            let position_principal = state.ledger_mut().commit_debit(owner, staged);

            self.emit_accrued(state.id(), &settlement);
            let receipt = WithdrawReceipt {
                strategy: state.id().clone(),
                owner: owner.clone(),
                amount,
                position_principal,
                total_principal: state.ledger().total_principal(),
                at: settlement.checkpoint(),
            };
            self.events.publish(&LedgerEvent::WithdrawCompleted {
                strategy: receipt.strategy.clone(),
                owner: receipt.owner.clone(),
                amount: receipt.amount,
                position_principal: receipt.position_principal,
                total_principal: receipt.total_principal,
                at: receipt.at,
            });
            Ok(receipt)
        })
    }

    /// Claim every reward unit `owner` is entitled to in `id`.
    ///
    /// Settles first, so the claim covers rewards up to `now`. A claim
    /// with nothing pending commits the settlement and returns a zero
    /// receipt without touching the gateway.
    pub fn claim(
        &self,
        id: &StrategyId,
        owner: &AccountId,
        now: Timestamp,
    ) -> EngineResult<ClaimReceipt> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_accepting(state)?;
            let claim = distributor::stage_claim(state, owner, now)?;

            if claim.amount > 0 {
                self.gateway
                    .transfer_out(owner, state.assets().reward_asset(), claim.amount)?;
            }

            state.apply_settlement(&claim.global);
            state.apply_position_settlement(owner, claim.position);
            state.set_reward_reserve(claim.reserve_after);
            state.set_total_paid_out(claim.paid_out_after);

            self.emit_accrued(state.id(), &claim.global);
            if claim.amount > 0 {
                self.events.publish(&LedgerEvent::RewardClaimed {
                    strategy: state.id().clone(),
                    owner: owner.clone(),
                    amount: claim.amount,
                    at: claim.global.checkpoint(),
                });
            }
            Ok(ClaimReceipt {
                strategy: state.id().clone(),
                owner: owner.clone(),
                amount: claim.amount,
                at: claim.global.checkpoint(),
            })
        })
    }

    /// Owner-only: change the strategy's rate parameter.
    ///
    /// The old rate is settled through `now` first, so the change applies
    /// strictly prospectively and already-accrued value is untouched.
    pub fn update_rate(
        &self,
        id: &StrategyId,
        caller: &AccountId,
        new_rate: u128,
        now: Timestamp,
    ) -> EngineResult<()> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_owner(state, caller)?;
            require_not_drained(state)?;
            let settlement = state.stage_settlement(now)?;
            let old_rate = state.rate();

            state.apply_settlement(&settlement);
            state.set_rate(new_rate);

            self.emit_accrued(state.id(), &settlement);
            self.events.publish(&LedgerEvent::RateUpdated {
                strategy: state.id().clone(),
                old_rate,
                new_rate,
                at: settlement.checkpoint(),
            });
            Ok(())
        })
    }

    /// Owner-only: move `amount` of the reward asset from the caller into
    /// the strategy's claim reserve. Principal accounting is unaffected.
    pub fn add_reward_supply(
        &self,
        id: &StrategyId,
        caller: &AccountId,
        amount: u64,
        now: Timestamp,
    ) -> EngineResult<()> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_owner(state, caller)?;
            require_not_drained(state)?;
            require_positive(amount)?;
            let settlement = state.stage_settlement(now)?;
            let reserve_after = state
                .reward_reserve()
                .checked_add(amount)
                .ok_or(EngineError::ArithmeticOverflow)?;

            self.gateway
                .transfer_in(caller, state.assets().reward_asset(), amount)?;

            state.apply_settlement(&settlement);
            state.set_reward_reserve(reserve_after);

            self.emit_accrued(state.id(), &settlement);
            self.events.publish(&LedgerEvent::RewardSupplyAdded {
                strategy: state.id().clone(),
                amount,
                reserve: reserve_after,
                at: settlement.checkpoint(),
            });
            Ok(())
        })
    }

    /// Owner-only incident path: sweep all custodied funds back to the
    /// owner and permanently drain the strategy.
    ///
    /// Position records are deliberately left on the books so holdings at
    /// the moment of the incident stay auditable; reconciliation happens
    /// out of band.
    ///
    /// When the principal and reward assets differ the sweep takes two
    /// transfers. A failed leg aborts with the books unchanged, but a leg
    /// that already landed is not clawed back: after a reward-leg failure
    /// the principal sits with the owner while the books still count it,
    /// and a retry requests the full principal from custody again.
    /// Squaring that away belongs to the same out-of-band reconciliation
    /// as the position records.
    pub fn emergency_withdraw(
        &self,
        id: &StrategyId,
        caller: &AccountId,
        now: Timestamp,
    ) -> EngineResult<EmergencyReceipt> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_owner(state, caller)?;
            require_not_drained(state)?;
            let settlement = state.stage_settlement(now)?;
            let principal = state.ledger().total_principal();
            let reserve = state.reward_reserve();
            let total = principal
                .checked_add(reserve)
                .ok_or(EngineError::ArithmeticOverflow)?;

            // Principal is custodied in the base asset, the reserve in the
            // reward asset; one transfer when they coincide, two otherwise.
            let principal_asset = state.assets().principal_asset().clone();
            let reward_asset = state.assets().reward_asset().clone();
            if principal_asset == reward_asset {
                if total > 0 {
                    self.gateway.transfer_out(caller, &principal_asset, total)?;
                }
            } else {
                if principal > 0 {
                    self.gateway.transfer_out(caller, &principal_asset, principal)?;
                }
                if reserve > 0 {
                    self.gateway.transfer_out(caller, &reward_asset, reserve)?;
                }
            }

            state.apply_settlement(&settlement);
            state.set_reward_reserve(0);
            state.set_status(StrategyStatus::EmergencyDrained);

            self.emit_accrued(state.id(), &settlement);
            self.events.publish(&LedgerEvent::EmergencyWithdrawn {
                strategy: state.id().clone(),
                owner: caller.clone(),
                amount: total,
                at: settlement.checkpoint(),
            });
            self.events.publish(&LedgerEvent::StatusChanged {
                strategy: state.id().clone(),
                status: StrategyStatus::EmergencyDrained,
                at: settlement.checkpoint(),
            });
            Ok(EmergencyReceipt {
                strategy: state.id().clone(),
                owner: caller.clone(),
                amount: total,
                at: settlement.checkpoint(),
            })
        })
    }

    /// Owner-only: pause or resume participant operations. Accrual keeps
    /// running while paused; a drained strategy cannot be revived.
    pub fn set_active(
        &self,
        id: &StrategyId,
        caller: &AccountId,
        active: bool,
        now: Timestamp,
    ) -> EngineResult<()> {
        let cell = self.cell(id)?;
        cell.mutate(|state| {
            require_owner(state, caller)?;
            require_not_drained(state)?;
            let status = if active {
                StrategyStatus::Active
            } else {
                StrategyStatus::Paused
            };
            if state.status() != status {
                state.set_status(status);
                self.events.publish(&LedgerEvent::StatusChanged {
                    strategy: state.id().clone(),
                    status,
                    at: now,
                });
            }
            Ok(())
        })
    }

    /// Current rate parameter for `id`.
    pub fn current_rate(&self, id: &StrategyId) -> EngineResult<u128> {
        self.cell(id)?.read(|state| Ok(state.rate()))
    }

    /// Accrued yield at `now` without settling anything.
    pub fn preview_accrued_yield(&self, id: &StrategyId, now: Timestamp) -> EngineResult<u64> {
        self.cell(id)?.read(|state| Ok(state.projected_yield(now)?))
    }

    /// Principal plus accrued yield at `now`.
    pub fn total_value(&self, id: &StrategyId, now: Timestamp) -> EngineResult<u64> {
        self.cell(id)?.read(|state| Ok(state.total_value(now)?))
    }

    /// PRECISION-scaled yield fraction at `now`.
    pub fn yield_fraction(&self, id: &StrategyId, now: Timestamp) -> EngineResult<u128> {
        self.cell(id)?.read(|state| Ok(state.yield_fraction(now)?))
    }

    /// Rewards `owner` could claim at `now`, settled or not.
    pub fn pending_reward(
        &self,
        id: &StrategyId,
        owner: &AccountId,
        now: Timestamp,
    ) -> EngineResult<u64> {
        self.cell(id)?.read(|state| {
            let settlement = state.stage_settlement(now)?;
            Ok(state
                .stage_position_settlement(owner, &settlement)?
                .map(|p| p.pending)
                .unwrap_or(0))
        })
    }

    /// Snapshot of `owner`'s position in `id`, if one was ever opened.
    pub fn position(&self, id: &StrategyId, owner: &AccountId) -> EngineResult<Option<Position>> {
        self.cell(id)?
            .read(|state| Ok(state.ledger().position(owner).cloned()))
    }

    /// Reporting snapshot of one strategy at `now`.
    pub fn strategy_summary(
        &self,
        id: &StrategyId,
        now: Timestamp,
    ) -> EngineResult<StrategySummary> {
        self.cell(id)?.read(|state| Ok(state.summarize(now)?))
    }

    /// Audit hook: recheck that position principals sum to the pool total.
    pub fn conservation_holds(&self, id: &StrategyId) -> EngineResult<bool> {
        self.cell(id)?
            .read(|state| Ok(state.ledger().conservation_holds()))
    }

    fn emit_accrued(&self, strategy: &StrategyId, settlement: &Settlement) {
        if let Settlement::Interest {
            checkpoint,
            accrued,
            cumulative,
        } = settlement
        {
            if *accrued > 0 {
                self.events.publish(&LedgerEvent::YieldAccrued {
                    strategy: strategy.clone(),
                    amount: *accrued,
                    cumulative: *cumulative,
                    at: *checkpoint,
                });
            }
        }
    }
}
