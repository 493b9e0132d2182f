//! Indicator helpers — pure functions over price series.
//!
//! Every function takes an f64 slice and returns a same-length vector with
//! NaN in the warmup prefix. Strategies treat NaN as "no opinion" and emit a
//! flat signal for those bars.

mod ema;
mod rolling;
mod rsi;

pub use ema::ema_of_series;
pub use rolling::{rolling_max, rolling_min};
pub use rsi::rsi_of_series;

#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-9;

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual}"
    );
}
