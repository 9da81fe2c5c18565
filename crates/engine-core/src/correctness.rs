//! Functions for correctness checks, similar to the *design by contract* philosophy.
//!
//! A condition is a predicate which must hold just prior to the execution of some
//! section of code for correct behaviour. An [`anyhow::Result`] is returned with a
//! descriptive message when the condition check fails.

/// A message prefix used with `expect` calls at sites that are unreachable given
/// upstream validation.
pub const FAILED: &str = "Condition failed";

/// Checks that `predicate` is true.
///
/// # Errors
///
/// Returns an error if the predicate does not hold.
#[inline(always)]
pub fn check_predicate_true(predicate: bool, fail_msg: &str) -> anyhow::Result<()> {
    if !predicate {
        anyhow::bail!("{fail_msg}")
    }
    Ok(())
}

/// Checks that a string is non-empty.
///
/// # Errors
///
/// Returns an error if `s` is empty.
#[inline(always)]
pub fn check_nonempty_string<T: AsRef<str>>(s: T, param: &str) -> anyhow::Result<()> {
    if s.as_ref().is_empty() {
        anyhow::bail!("invalid string for '{param}', was empty");
    }
    Ok(())
}

/// Checks that `value` lies within `[lower, upper]` inclusive.
///
/// # Errors
///
/// Returns an error if `value` is outside of the range.
#[inline(always)]
pub fn check_in_range_inclusive_f64(
    value: f64,
    lower: f64,
    upper: f64,
    param: &str,
) -> anyhow::Result<()> {
    if value < lower || value > upper {
        anyhow::bail!(
            "invalid f64 for '{param}' not in range [{lower}, {upper}], was {value}"
        );
    }
    Ok(())
}

/// Checks that `value` is non-negative.
///
/// # Errors
///
/// Returns an error if `value` is negative.
#[inline(always)]
pub fn check_non_negative_i64(value: i64, param: &str) -> anyhow::Result<()> {
    if value < 0 {
        anyhow::bail!("invalid i64 for '{param}' was negative: {value}");
    }
    Ok(())
}

/// Checks that `value` is strictly positive.
///
/// # Errors
///
/// Returns an error if `value` is zero or negative.
#[inline(always)]
pub fn check_positive_u64(value: u64, param: &str) -> anyhow::Result<()> {
    if value == 0 {
        anyhow::bail!("invalid u64 for '{param}' was zero");
    }
    Ok(())
}

/// Checks that two values of the same comparable type are equal.
///
/// # Errors
///
/// Returns an error if `lhs != rhs`.
#[inline(always)]
pub fn check_equal<T: PartialEq + std::fmt::Debug>(
    lhs: &T,
    rhs: &T,
    lhs_name: &str,
    rhs_name: &str,
) -> anyhow::Result<()> {
    if lhs != rhs {
        anyhow::bail!("{lhs_name} {lhs:?} was not equal to {rhs_name} {rhs:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_range_inclusive_f64_rejects_out_of_range() {
        assert!(check_in_range_inclusive_f64(1.1, 0.0, 1.0, "p").is_err());
        assert!(check_in_range_inclusive_f64(0.5, 0.0, 1.0, "p").is_ok());
    }

    #[test]
    fn test_check_equal() {
        assert!(check_equal(&1, &1, "a", "b").is_ok());
        assert!(check_equal(&1, &2, "a", "b").is_err());
    }
}
