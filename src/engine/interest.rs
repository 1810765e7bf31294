//! Simple-interest accrual for lending and pooled-fee strategies.

use serde::{Deserialize, Serialize};

use crate::domain::fixed::{to_amount, ArithmeticError, PRECISION, SECONDS_PER_YEAR};

/// Pool-level simple interest.
///
/// Yield over a window is `principal * rate * elapsed` divided by
/// `SECONDS_PER_YEAR * PRECISION`, floored. Nothing compounds: settled
/// yield is recorded in `cumulative_yield` and does not itself earn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleInterest {
    /// PRECISION-scaled annual fraction (5% APY is `PRECISION / 20`).
    pub rate: u128,
    /// Yield settled into the books so far, in base units.
    pub cumulative_yield: u64,
}

impl SimpleInterest {
    pub fn new(rate: u128) -> Self {
        SimpleInterest {
            rate,
            cumulative_yield: 0,
        }
    }

    /// Yield earned by `principal` over `elapsed` seconds at the current
    /// rate. An empty pool or an empty window earns zero.
    pub fn projected(&self, principal: u64, elapsed: u64) -> Result<u64, ArithmeticError> {
        if principal == 0 || elapsed == 0 || self.rate == 0 {
            return Ok(0);
        }
        let numerator = (principal as u128)
            .checked_mul(self.rate)
            .ok_or(ArithmeticError)?
            .checked_mul(elapsed as u128)
            .ok_or(ArithmeticError)?;
        to_amount(numerator / (SECONDS_PER_YEAR as u128 * PRECISION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_year_at_five_percent() {
        let model = SimpleInterest::new(PRECISION / 20);
        assert_eq!(model.projected(1_000, SECONDS_PER_YEAR).unwrap(), 50);
    }

    #[test]
    fn test_partial_year_floors() {
        let model = SimpleInterest::new(PRECISION / 20);
        assert_eq!(model.projected(1_000, SECONDS_PER_YEAR / 2).unwrap(), 25);
        // Sub-unit yield truncates to zero rather than rounding up.
        assert_eq!(model.projected(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_empty_pool_or_window_earns_nothing() {
        let model = SimpleInterest::new(PRECISION / 20);
        assert_eq!(model.projected(0, SECONDS_PER_YEAR).unwrap(), 0);
        assert_eq!(model.projected(1_000, 0).unwrap(), 0);
    }

    #[test]
    fn test_overflowing_window_is_detected() {
        let model = SimpleInterest::new(PRECISION);
        assert_eq!(
            model.projected(u64::MAX, u64::MAX),
            Err(ArithmeticError)
        );
    }
}
