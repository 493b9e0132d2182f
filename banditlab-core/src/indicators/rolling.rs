//! Rolling window extremes.

/// Rolling maximum over a trailing `window` (inclusive of the current value).
/// Warmup prefix (fewer than `window` values available) is NaN.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::max)
}

/// Rolling minimum over a trailing `window` (inclusive of the current value).
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::min)
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = slice.iter().copied().fold(f64::NEG_INFINITY, pick);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_max_basic() {
        let result = rolling_max(&[1.0, 3.0, 2.0, 5.0, 4.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 3.0, DEFAULT_EPSILON);
        assert_approx(result[3], 5.0, DEFAULT_EPSILON);
        assert_approx(result[4], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_min_basic() {
        let result = rolling_min(&[5.0, 3.0, 4.0, 1.0, 2.0], 2);
        assert!(result[0].is_nan());
        assert_approx(result[1], 3.0, DEFAULT_EPSILON);
        assert_approx(result[2], 3.0, DEFAULT_EPSILON);
        assert_approx(result[3], 1.0, DEFAULT_EPSILON);
        assert_approx(result[4], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_window_larger_than_series() {
        let result = rolling_max(&[1.0, 2.0], 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_nan_in_window_skipped() {
        let result = rolling_max(&[1.0, f64::NAN, 2.0, 3.0], 2);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 3.0, DEFAULT_EPSILON);
    }
}
