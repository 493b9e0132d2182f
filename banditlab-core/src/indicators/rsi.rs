//! Relative Strength Index over simple rolling mean gains/losses.
//!
//! RSI[t] = 100 - 100 / (1 + avg_gain / avg_loss), averaged over the last
//! `period` one-bar deltas. Lookback: period (one delta needs two bars).

/// Compute RSI values from an f64 slice. Warmup prefix is NaN.
///
/// Zero average loss maps to 100 when there were gains and 50 (neutral)
/// when the window was completely flat, so the output is never NaN past
/// the warmup.
pub fn rsi_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    // One-bar deltas; deltas[i] covers values[i] - values[i-1]
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = values[i] - values[i - 1];
        if delta.is_nan() {
            return result;
        }
        if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }

    for i in period..n {
        let window = (i - period + 1)..=i;
        let avg_gain: f64 = window.clone().map(|j| gains[j]).sum::<f64>() / period as f64;
        let avg_loss: f64 = window.map(|j| losses[j]).sum::<f64>() / period as f64;

        result[i] = if avg_loss > 0.0 {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        } else if avg_gain > 0.0 {
            100.0
        } else {
            50.0
        };
    }

    result
}
