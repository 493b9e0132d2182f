//! Candle — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV candle for a single bar.
///
/// Timestamps are strictly increasing within a batch but bar spacing may be
/// irregular; nothing downstream assumes a fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: `low <= open, close <= high` and positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_candle() -> Candle {
        Candle {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle().is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut c = sample_candle();
        c.close = f64::NAN;
        assert!(c.is_void());
        assert!(!c.is_sane());
    }

    #[test]
    fn candle_detects_inverted_high_low() {
        let mut c = sample_candle();
        c.high = 97.0; // below low
        assert!(!c.is_sane());
    }

    #[test]
    fn candle_detects_close_above_high() {
        let mut c = sample_candle();
        c.close = 106.0;
        assert!(!c.is_sane());
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let c = sample_candle();
        let json = serde_json::to_string(&c).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(c, deser);
    }
}
