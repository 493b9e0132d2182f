//! EMA crossover: long while the fast EMA is above the slow EMA.

use crate::domain::{Candle, Signal};
use crate::indicators::ema_of_series;
use crate::params::ParamSet;

use super::SignalStrategy;

/// Parameters: `fast` (default 9), `slow` (default 21).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaCross;

impl SignalStrategy for EmaCross {
    fn id(&self) -> &'static str {
        "ema_cross"
    }

    fn generate(&self, candles: &[Candle], params: &ParamSet) -> Vec<Signal> {
        let fast = params.get_or("fast", 9.0).max(1.0) as usize;
        let slow = params.get_or("slow", 21.0).max(1.0) as usize;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let ema_fast = ema_of_series(&closes, fast);
        let ema_slow = ema_of_series(&closes, slow);

        ema_fast
            .iter()
            .zip(&ema_slow)
            .map(|(&f, &s)| {
                if f.is_nan() || s.is_nan() {
                    Signal::Flat
                } else if f > s {
                    Signal::Long
                } else if f < s {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            })
            .collect()
    }
}
