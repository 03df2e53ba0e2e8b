//! Rounding rules for turning fractional forecasts into whole pairs
//!
//! All forecasts round half to even, the same rule the dashboard used, so
//! 110.5 becomes 110 and 111.5 becomes 112.

use crate::{MathError, Result};

/// Round to the nearest integer, ties to the even neighbour.
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

/// Round half to even and convert to `i64`.
pub fn to_whole(value: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(MathError::CalculationError(format!(
            "Cannot round non-finite value {}",
            value
        )));
    }

    let rounded = round_half_even(value);
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return Err(MathError::CalculationError(format!(
            "Value {} is out of range for a whole-number forecast",
            value
        )));
    }

    Ok(rounded as i64)
}

/// Largest possible gap between a rounded allocation and its total when
/// `buckets` shares summing to one are rounded independently.
///
/// Each bucket is off by at most one half, so the sum is off by at most
/// `buckets / 2`, rounded up.
pub fn max_allocation_drift(buckets: usize) -> i64 {
    buckets.div_ceil(2) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(110.5, 110.0)]
    #[case(111.5, 112.0)]
    #[case(110.4, 110.0)]
    #[case(110.6, 111.0)]
    #[case(-2.5, -2.0)]
    #[case(0.5, 0.0)]
    fn test_round_half_even(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round_half_even(input), expected);
    }

    #[test]
    fn test_to_whole() {
        assert_eq!(to_whole(22.000_000_000_000_004).unwrap(), 22);
        assert_eq!(to_whole(54.5).unwrap(), 54);
        assert!(to_whole(f64::NAN).is_err());
        assert!(to_whole(f64::INFINITY).is_err());
        assert!(to_whole(1e30).is_err());
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(3, 2)]
    #[case(12, 6)]
    fn test_max_allocation_drift(#[case] buckets: usize, #[case] expected: i64) {
        assert_eq!(max_allocation_drift(buckets), expected);
    }
}
