//! Discounts
//!
//! Percentage helpers shared by line discounts, the global discount, loyalty
//! discounts and tax rates. All of them are stored as a [`Percentage`]
//! fraction (`0.19` for 19%) and applied to amounts in minor currency units.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Errors specific to percentage calculations.
#[derive(Debug, Error, PartialEq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Rate outside of 0% to 100% (value in percent points).
    #[error("rate {0}% is outside the range 0% to 100%")]
    OutOfRange(Decimal),
}

/// Zero percent.
#[must_use]
pub fn zero() -> Percentage {
    Percentage::from(Decimal::ZERO)
}

/// The underlying fraction of a percentage, e.g. `0.19` for 19%.
#[must_use]
pub fn fraction(percent: Percentage) -> Decimal {
    // decimal_percentage doesn't expose the inner Decimal
    percent * Decimal::ONE
}

/// Percent points of a percentage, e.g. `19` for 19%.
#[must_use]
pub fn percent_points(percent: Percentage) -> Decimal {
    (fraction(percent) * Decimal::ONE_HUNDRED).normalize()
}

/// Returns true when the percentage is exactly zero.
#[must_use]
pub fn is_zero(percent: Percentage) -> bool {
    fraction(percent).is_zero()
}

/// Build a rate from percent points (`10` for 10%).
///
/// # Errors
///
/// Returns [`DiscountError::OutOfRange`] if `points` is negative or above 100.
pub fn rate_from_points(points: Decimal) -> Result<Percentage, DiscountError> {
    if points < Decimal::ZERO || points > Decimal::ONE_HUNDRED {
        return Err(DiscountError::OutOfRange(points));
    }

    Ok(Percentage::from(points / Decimal::ONE_HUNDRED))
}

/// Check that an already built percentage lies within 0% to 100%.
///
/// # Errors
///
/// Returns [`DiscountError::OutOfRange`] otherwise.
pub fn ensure_rate(percent: Percentage) -> Result<Percentage, DiscountError> {
    let value = fraction(percent);

    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(DiscountError::OutOfRange(percent_points(percent)));
    }

    Ok(percent)
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// Rounds half away from zero.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the calculation overflows.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    fraction(*percent)
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

/// Apply a percentage discount to a minor unit amount, returning what is left.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the calculation overflows.
pub fn discounted_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let discount = percent_of_minor(percent, minor)?;

    minor
        .checked_sub(discount)
        .ok_or(DiscountError::PercentConversion)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percent_of_minor_calculates_correctly() -> TestResult {
        let percent = rate_from_points(Decimal::from(25))?;

        assert_eq!(percent_of_minor(&percent, 200)?, 50);

        Ok(())
    }

    #[test]
    fn percent_of_minor_rounds_half_away_from_zero() -> TestResult {
        let percent = rate_from_points(Decimal::from(5))?;

        // 5% of 1.10 is 0.055
        assert_eq!(percent_of_minor(&percent, 110)?, 6);

        Ok(())
    }

    #[test]
    fn percent_of_minor_overflow_returns_error() {
        let percent = Percentage::from(2.0);
        let result = percent_of_minor(&percent, i64::MAX);

        assert_eq!(result, Err(DiscountError::PercentConversion));
    }

    #[test]
    fn discounted_minor_subtracts_the_discount() -> TestResult {
        let percent = rate_from_points(Decimal::from(10))?;

        assert_eq!(discounted_minor(&percent, 10_000)?, 9_000);

        Ok(())
    }

    #[test]
    fn rate_from_points_accepts_bounds() -> TestResult {
        assert!(is_zero(rate_from_points(Decimal::ZERO)?));
        assert_eq!(
            fraction(rate_from_points(Decimal::ONE_HUNDRED)?),
            Decimal::ONE
        );

        Ok(())
    }

    #[test]
    fn rate_from_points_rejects_out_of_range() {
        assert_eq!(
            rate_from_points(Decimal::from(-1)).err(),
            Some(DiscountError::OutOfRange(Decimal::from(-1)))
        );
        assert_eq!(
            rate_from_points(Decimal::from(101)).err(),
            Some(DiscountError::OutOfRange(Decimal::from(101)))
        );
    }

    #[test]
    fn ensure_rate_rejects_fractions_above_one() {
        let result = ensure_rate(Percentage::from(Decimal::TWO));

        assert!(matches!(result, Err(DiscountError::OutOfRange(_))));
    }

    #[test]
    fn percent_points_round_trips_points() -> TestResult {
        let percent = rate_from_points(Decimal::new(195, 1))?;

        assert_eq!(percent_points(percent), Decimal::new(195, 1));

        Ok(())
    }
}
