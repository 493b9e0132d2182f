//! Candle ingestion — CSV loading and synthetic series for tests and demos.

use std::path::Path;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

use banditlab_core::domain::Candle;

/// Errors loading candle data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read candle file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse candle file: {0}")]
    Csv(#[from] csv::Error),
    #[error("unparseable timestamp {value:?} at row {row}")]
    BadTimestamp { row: usize, value: String },
    #[error("timestamps not strictly increasing at row {row}")]
    NonMonotonic { row: usize },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load candles from a CSV file with header
/// `timestamp,open,high,low,close,volume`.
///
/// Timestamps may be unix epoch seconds or `YYYY-MM-DDTHH:MM:SS` (a space
/// separator also works). Strictly increasing order is enforced; irregular
/// spacing is fine.
pub fn load_candles_csv(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles: Vec<Candle> = Vec::new();

    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::BadTimestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;

        if let Some(prev) = candles.last() {
            if timestamp <= prev.timestamp {
                return Err(DataError::NonMonotonic { row: i + 1 });
            }
        }

        candles.push(Candle {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    Ok(candles)
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Generate a seeded random-walk OHLCV series: hourly bars, always sane.
/// The same seed reproduces the same series.
pub fn synthetic_candles(n: usize, seed: u64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .expect("valid base date")
        .and_hms_opt(0, 0, 0)
        .expect("valid base time");

    let volatility = 0.02;
    let mut close = 50_000.0_f64;
    let mut candles = Vec::with_capacity(n);

    for i in 0..n {
        let open = close;
        let ret = rng.gen_range(-volatility..volatility);
        close = (open * (1.0 + ret)).max(1.0);

        let span = rng.gen_range(0.0..0.005);
        let high = open.max(close) * (1.0 + span);
        let low = open.min(close) * (1.0 - span);

        candles.push(Candle {
            timestamp: base + chrono::Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: rng.gen_range(100.0..1_000.0),
        });
    }

    candles
}
