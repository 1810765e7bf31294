//! Pure accrual computation: models, settlements, claim staging.

use serde::{Deserialize, Serialize};

use crate::domain::fixed::ArithmeticError;
use crate::domain::primitives::Timestamp;
use crate::domain::strategy::StrategyKind;

pub mod clock;
pub mod distributor;
pub mod interest;
pub mod staking;

pub use clock::AccrualClock;
pub use distributor::ClaimSettlement;
pub use interest::SimpleInterest;
pub use staking::RewardPerStake;

/// A strategy's accrual model together with its accrued state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accrual {
    Interest(SimpleInterest),
    Staking(RewardPerStake),
}

impl Accrual {
    /// Pick the model for a strategy kind at its configured rate.
    pub fn for_kind(kind: StrategyKind, rate: u128) -> Accrual {
        match kind {
            StrategyKind::Lending | StrategyKind::LiquidityPool => {
                Accrual::Interest(SimpleInterest::new(rate))
            }
            StrategyKind::Staking => Accrual::Staking(RewardPerStake::new(rate)),
        }
    }

    /// Current rate parameter: annual fraction for interest models, reward
    /// units per second for staking.
    pub fn rate(&self) -> u128 {
        match self {
            Accrual::Interest(model) => model.rate,
            Accrual::Staking(model) => model.reward_rate,
        }
    }

    /// Swap the rate parameter. Accrued state is untouched, so the new
    /// rate applies strictly from the last settled checkpoint onwards.
    pub fn set_rate(&mut self, rate: u128) {
        match self {
            Accrual::Interest(model) => model.rate = rate,
            Accrual::Staking(model) => model.reward_rate = rate,
        }
    }

    /// Yield settled at pool level so far; zero for staking models.
    pub fn cumulative_yield(&self) -> u64 {
        match self {
            Accrual::Interest(model) => model.cumulative_yield,
            Accrual::Staking(_) => 0,
        }
    }

    /// Current accumulator value; zero for interest models.
    pub fn accumulator(&self) -> u128 {
        match self {
            Accrual::Interest(_) => 0,
            Accrual::Staking(model) => model.accumulator,
        }
    }

    /// Stage a global settlement at `now` without writing anything.
    pub fn settle(
        &self,
        clock: &AccrualClock,
        total_staked: u64,
        now: Timestamp,
    ) -> Result<Settlement, ArithmeticError> {
        let checkpoint = clock.advanced(now);
        let elapsed = clock.elapsed(now);
        match self {
            Accrual::Interest(model) => {
                let accrued = model.projected(total_staked, elapsed)?;
                Ok(Settlement::Interest {
                    checkpoint,
                    accrued,
                    cumulative: model
                        .cumulative_yield
                        .checked_add(accrued)
                        .ok_or(ArithmeticError)?,
                })
            }
            Accrual::Staking(model) => Ok(Settlement::Staking {
                checkpoint,
                accumulator: model.advanced(total_staked, elapsed)?,
            }),
        }
    }

    /// Fold a staged settlement into the model. Infallible: every checked
    /// sum already happened while staging.
    pub fn apply(&mut self, settlement: &Settlement) {
        match (self, settlement) {
            (Accrual::Interest(model), Settlement::Interest { cumulative, .. }) => {
                model.cumulative_yield = *cumulative;
            }
            (Accrual::Staking(model), Settlement::Staking { accumulator, .. }) => {
                model.accumulator = *accumulator;
            }
            // A settlement is always staged from this same value moments
            // earlier, so mismatched variants cannot occur.
            (Accrual::Interest(_), Settlement::Staking { .. })
            | (Accrual::Staking(_), Settlement::Interest { .. }) => {}
        }
    }
}

/// Staged outcome of settling a strategy's global accrual at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Interest {
        /// Checkpoint the clock will hold after the commit.
        checkpoint: Timestamp,
        /// Yield newly earned over the settled window.
        accrued: u64,
        /// Pool-level cumulative yield after the commit.
        cumulative: u64,
    },
    Staking {
        checkpoint: Timestamp,
        /// Accumulator value after the commit.
        accumulator: u128,
    },
}

impl Settlement {
    pub fn checkpoint(&self) -> Timestamp {
        match self {
            Settlement::Interest { checkpoint, .. } | Settlement::Staking { checkpoint, .. } => {
                *checkpoint
            }
        }
    }

    /// Pool-level yield newly earned in this settlement; zero for staking.
    pub fn accrued(&self) -> u64 {
        match self {
            Settlement::Interest { accrued, .. } => *accrued,
            Settlement::Staking { .. } => 0,
        }
    }

    /// Stage the per-position effect of this settlement: fold the
    /// accumulator delta into pending and move the position checkpoint up.
    /// Interest settlements accrue at pool level and have none.
    pub fn settle_position(
        &self,
        principal: u64,
        checkpoint: u128,
        pending: u64,
    ) -> Result<Option<PositionSettlement>, ArithmeticError> {
        match self {
            Settlement::Interest { .. } => Ok(None),
            Settlement::Staking { accumulator, .. } => {
                let owed = RewardPerStake::owed(principal, *accumulator, checkpoint)?;
                Ok(Some(PositionSettlement {
                    pending: pending.checked_add(owed).ok_or(ArithmeticError)?,
                    checkpoint: *accumulator,
                }))
            }
        }
    }
}

/// Staged update of one position's pending reward and checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSettlement {
    pub pending: u64,
    pub checkpoint: u128,
}
