//! RSI mean reversion: long when oversold, short when overbought.

use crate::domain::{Candle, Signal};
use crate::indicators::rsi_of_series;
use crate::params::ParamSet;

use super::SignalStrategy;

/// Parameters: `period` (default 14), `lo` (default 30), `hi` (default 70).
#[derive(Debug, Clone, Copy, Default)]
pub struct RsiMeanReversion;

impl SignalStrategy for RsiMeanReversion {
    fn id(&self) -> &'static str {
        "rsi_mr"
    }

    fn generate(&self, candles: &[Candle], params: &ParamSet) -> Vec<Signal> {
        let period = params.get_or("period", 14.0).max(1.0) as usize;
        let lo = params.get_or("lo", 30.0);
        let hi = params.get_or("hi", 70.0);

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = rsi_of_series(&closes, period);

        rsi.iter()
            .map(|&r| {
                if r.is_nan() {
                    Signal::Flat
                } else if r < lo {
                    Signal::Long
                } else if r > hi {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::candles_from_closes;

    fn params() -> ParamSet {
        [("period", 5.0), ("lo", 30.0), ("hi", 70.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn sustained_selloff_goes_long() {
        let closes: Vec<f64> = (0..20).map(|i| 200.0 - 2.0 * i as f64).collect();
        let candles = candles_from_closes(&closes);
        let signals = RsiMeanReversion.generate(&candles, &params());
        assert_eq!(signals[19], Signal::Long);
    }

    #[test]
    fn sustained_rally_goes_short() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * i as f64).collect();
        let candles = candles_from_closes(&closes);
        let signals = RsiMeanReversion.generate(&candles, &params());
        assert_eq!(signals[19], Signal::Short);
    }

    #[test]
    fn flat_market_stays_flat() {
        let candles = candles_from_closes(&vec![100.0; 20]);
        let signals = RsiMeanReversion.generate(&candles, &params());
        assert!(signals.iter().all(|s| s.is_flat()));
    }
}
