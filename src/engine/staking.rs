//! Reward-per-unit-stake accrual for staking strategies.

use serde::{Deserialize, Serialize};

use crate::domain::fixed::{to_amount, ArithmeticError, PRECISION};

/// Global reward accumulator in the style of on-chain staking rewards
/// contracts.
///
/// `accumulator` is a monotonically non-decreasing, PRECISION-scaled count
/// of reward units emitted per staked unit since inception. A position's
/// earnings over any span are its principal times the accumulator delta
/// across that span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPerStake {
    /// Reward units emitted per second while the pool is non-empty.
    pub reward_rate: u128,
    /// PRECISION-scaled rewards per staked unit since inception.
    pub accumulator: u128,
}

impl RewardPerStake {
    pub fn new(reward_rate: u128) -> Self {
        RewardPerStake {
            reward_rate,
            accumulator: 0,
        }
    }

    /// Accumulator value after `elapsed` seconds with `total_staked` units
    /// in the pool. While the pool is empty the accumulator holds still,
    /// so no rewards are minted for an ownerless window.
    pub fn advanced(&self, total_staked: u64, elapsed: u64) -> Result<u128, ArithmeticError> {
        if total_staked == 0 || elapsed == 0 || self.reward_rate == 0 {
            return Ok(self.accumulator);
        }
        let delta = (elapsed as u128)
            .checked_mul(self.reward_rate)
            .ok_or(ArithmeticError)?
            .checked_mul(PRECISION)
            .ok_or(ArithmeticError)?
            / total_staked as u128;
        self.accumulator.checked_add(delta).ok_or(ArithmeticError)
    }

    /// Reward units owed to a position holding `principal` whose last
    /// settlement saw `checkpoint`, against the given accumulator value.
    ///
    /// # Errors
    ///
    /// A checkpoint ahead of the accumulator means corrupted books and is
    /// reported as an arithmetic error rather than wrapped around.
    pub fn owed(principal: u64, accumulator: u128, checkpoint: u128) -> Result<u64, ArithmeticError> {
        let delta = accumulator.checked_sub(checkpoint).ok_or(ArithmeticError)?;
        if principal == 0 || delta == 0 {
            return Ok(0);
        }
        let owed = (principal as u128)
            .checked_mul(delta)
            .ok_or(ArithmeticError)?
            / PRECISION;
        to_amount(owed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sole_staker_earns_full_emission() {
        let model = RewardPerStake::new(2);
        let accumulator = model.advanced(100, 50).unwrap();
        // 50s of 2 units/s spread over 100 staked units.
        assert_eq!(accumulator, PRECISION);
        assert_eq!(RewardPerStake::owed(100, accumulator, 0).unwrap(), 100);
    }

    #[test]
    fn test_split_is_pro_rata() {
        let model = RewardPerStake::new(10);
        // 300 staked total, 60 seconds, 600 units emitted.
        let accumulator = model.advanced(300, 60).unwrap();
        assert_eq!(RewardPerStake::owed(200, accumulator, 0).unwrap(), 400);
        assert_eq!(RewardPerStake::owed(100, accumulator, 0).unwrap(), 200);
    }

    #[test]
    fn test_empty_pool_holds_accumulator_still() {
        let mut model = RewardPerStake::new(5);
        model.accumulator = 42;
        assert_eq!(model.advanced(0, 1_000_000).unwrap(), 42);
    }

    #[test]
    fn test_checkpoint_ahead_of_accumulator_is_an_error() {
        assert_eq!(
            RewardPerStake::owed(10, PRECISION, PRECISION + 1),
            Err(ArithmeticError)
        );
    }

    #[test]
    fn test_indivisible_emission_floors() {
        let model = RewardPerStake::new(1);
        // 1 unit/s for 1s over 3 staked units: each unit earns 1/3.
        let accumulator = model.advanced(3, 1).unwrap();
        assert_eq!(accumulator, PRECISION / 3);
        assert_eq!(RewardPerStake::owed(1, accumulator, 0).unwrap(), 0);
        assert_eq!(RewardPerStake::owed(3, accumulator, 0).unwrap(), 0);
    }
}
