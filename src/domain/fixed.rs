//! Integer fixed-point arithmetic for accrual math.
//!
//! Rates and the reward accumulator are scaled by [`PRECISION`]; token
//! amounts stay in raw `u64` base units. Every multiplication widens to
//! `u128` and is checked, and every division floors, so accrued value is
//! never rounded up past what the books can cover.

use thiserror::Error;

/// Scale factor for fractional rates and the reward accumulator.
pub const PRECISION: u128 = 1_000_000_000_000_000_000; // 10^18

/// Seconds in a 365-day year, the denominator for annualized rates.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// A widened multiplication or a narrowing conversion did not fit.
///
/// Fatal to the single operation that computed it, never to state that was
/// already committed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("fixed-point arithmetic overflow")]
pub struct ArithmeticError;

/// `a * b / denom` with a checked widened product and floor division.
pub fn mul_div(a: u128, b: u128, denom: u128) -> Result<u128, ArithmeticError> {
    a.checked_mul(b)
        .and_then(|product| product.checked_div(denom))
        .ok_or(ArithmeticError)
}

/// Narrow a `u128` intermediate back into a `u64` token amount.
pub fn to_amount(value: u128) -> Result<u64, ArithmeticError> {
    u64::try_from(value).map_err(|_| ArithmeticError)
}

/// Convert a rate given in hundredths of a percent into a PRECISION-scaled
/// annual fraction (`500` hundredths = 5% = `0.05 * PRECISION`).
pub fn rate_from_hundredths_percent(hundredths: u64) -> Result<u128, ArithmeticError> {
    mul_div(hundredths as u128, PRECISION, 10_000)
}

/// `part * PRECISION / whole`, or zero when `whole` is zero.
///
/// Cannot overflow: `u64::MAX * PRECISION` fits in a `u128`.
pub fn scaled_fraction(part: u64, whole: u64) -> u128 {
    if whole == 0 {
        return 0;
    }
    (part as u128) * PRECISION / (whole as u128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floors() {
        assert_eq!(mul_div(7, 3, 2).unwrap(), 10); // 21 / 2 truncates
        assert_eq!(mul_div(1, 1, 3).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_overflow_detected() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(ArithmeticError));
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), Err(ArithmeticError));
    }

    #[test]
    fn test_to_amount_narrowing() {
        assert_eq!(to_amount(u64::MAX as u128).unwrap(), u64::MAX);
        assert_eq!(to_amount(u64::MAX as u128 + 1), Err(ArithmeticError));
    }

    #[test]
    fn test_rate_scaling() {
        // 5% APY expressed as 500 hundredths of a percent.
        assert_eq!(
            rate_from_hundredths_percent(500).unwrap(),
            50_000_000_000_000_000
        );
        // 0.30% pool fee rate.
        assert_eq!(
            rate_from_hundredths_percent(30).unwrap(),
            3_000_000_000_000_000
        );
    }

    #[test]
    fn test_scaled_fraction() {
        assert_eq!(scaled_fraction(50, 1000), PRECISION / 20);
        assert_eq!(scaled_fraction(1, 0), 0);
        // Extreme operands stay in range.
        assert_eq!(
            scaled_fraction(u64::MAX, 1),
            (u64::MAX as u128) * PRECISION
        );
    }
}
