//! Channel breakout: trade pushes through the prior lookback range.

use crate::domain::{Candle, Signal};
use crate::indicators::{rolling_max, rolling_min};
use crate::params::ParamSet;

use super::SignalStrategy;

/// Parameters: `lookback` (default 20), `buffer_bps` (default 2).
///
/// The reference range is the rolling high/low of the bars *before* the
/// current one; comparing against a range that includes the current bar can
/// never trigger with a positive buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Breakout;

impl SignalStrategy for Breakout {
    fn id(&self) -> &'static str {
        "breakout"
    }

    fn generate(&self, candles: &[Candle], params: &ParamSet) -> Vec<Signal> {
        let lookback = params.get_or("lookback", 20.0).max(1.0) as usize;
        let buffer = params.get_or("buffer_bps", 2.0) / 10_000.0;

        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let channel_high = rolling_max(&highs, lookback);
        let channel_low = rolling_min(&lows, lookback);

        candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == 0 {
                    return Signal::Flat;
                }
                let upper = channel_high[i - 1];
                let lower = channel_low[i - 1];
                if upper.is_nan() || lower.is_nan() {
                    Signal::Flat
                } else if c.high > upper * (1.0 + buffer) {
                    Signal::Long
                } else if c.low < lower * (1.0 - buffer) {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            })
            .collect()
    }
}
