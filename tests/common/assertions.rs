//! Assertion utilities for testing.
//!
//! Decoded values contain NaN for missing data, so these comparisons treat
//! two NaNs as equal.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two values are approximately equal, or both NaN.
///
/// # Panics
///
/// Panics if the absolute difference between `actual` and `expected` is greater than `epsilon`.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    if actual.is_nan() && expected.is_nan() {
        return;
    }

    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that two arrays are approximately element-wise equal, NaN matching NaN.
///
/// # Panics
///
/// Panics if the arrays have different lengths or if any element-wise comparison fails.
pub fn assert_array_approx_eq(actual: &[f64], expected: &[f64], epsilon: Option<f64>) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Arrays have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        if a.is_nan() && e.is_nan() {
            continue;
        }
        let diff = (a - e).abs();

        assert!(
            diff <= eps,
            "Arrays differ at index {}: actual = {}, expected = {}, diff = {}, epsilon = {}",
            i,
            a,
            e,
            diff,
            eps
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.0 + 1e-12, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
        assert_approx_eq(f64::NAN, f64::NAN, None);
    }

    #[test]
    fn test_assert_array_approx_eq() {
        assert_array_approx_eq(&[1.0, f64::NAN, 3.0], &[1.0, f64::NAN, 3.0], None);
        assert_array_approx_eq(&[1.0, 2.0], &[1.001, 2.001], Some(0.01));
    }

    #[test]
    #[should_panic(expected = "Arrays differ at index 1")]
    fn test_nan_does_not_match_number() {
        assert_array_approx_eq(&[1.0, f64::NAN], &[1.0, 2.0], None);
    }
}
