//! Claim staging: turns a settled position into a payable amount.

use crate::custody::TransferError;
use crate::domain::primitives::{AccountId, Timestamp};
use crate::engine::{PositionSettlement, Settlement};
use crate::error::{EngineError, EngineResult};
use crate::ledger::strategy::StrategyState;

/// Everything a claim commits, staged before the external transfer so the
/// commit itself cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct ClaimSettlement {
    /// Global settlement backing the claim.
    pub global: Settlement,
    /// Position state after the claim: pending zeroed, checkpoint moved.
    pub position: Option<PositionSettlement>,
    /// Amount payable to the claimant. Zero makes the claim a settling
    /// no-op with no transfer and no event.
    pub amount: u64,
    /// Reward reserve left after paying out.
    pub reserve_after: u64,
    /// Lifetime paid-out counter after paying out.
    pub paid_out_after: u64,
}

/// Stage a claim of everything `owner` is entitled to at `now`.
///
/// Interest strategies accrue at pool level and have nothing claimable,
/// so their claims always stage as zero. An account the ledger has never
/// seen also stages a zero claim with no position write: records only
/// open on deposit.
///
/// # Errors
///
/// `TransferFailed` when the reward reserve cannot cover the settled
/// entitlement. The participant's pending balance is untouched and the
/// claim can be retried once the reserve is topped up.
pub fn stage_claim(
    state: &StrategyState,
    owner: &AccountId,
    now: Timestamp,
) -> EngineResult<ClaimSettlement> {
    let global = state.stage_settlement(now)?;
    let settled = state.stage_position_settlement(owner, &global)?;
    let amount = settled.map(|p| p.pending).unwrap_or(0);
    if amount > state.reward_reserve() {
        return Err(EngineError::TransferFailed(TransferError::InsufficientFunds));
    }
    let position = if amount == 0 && state.ledger().position(owner).is_none() {
        None
    } else {
        settled.map(|p| PositionSettlement {
            pending: 0,
            checkpoint: p.checkpoint,
        })
    };
    Ok(ClaimSettlement {
        global,
        position,
        amount,
        reserve_after: state
            .reward_reserve()
            .checked_sub(amount)
            .ok_or(EngineError::ArithmeticOverflow)?,
        paid_out_after: state
            .total_paid_out()
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?,
    })
}
