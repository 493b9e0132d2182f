//! Trial serialization — flat CSV and JSON artifacts for offline analysis.
//!
//! Metric fields are flattened into named columns so the CSV loads directly
//! into analysis tools; parameters travel as their canonical JSON string.

use crate::experience::{StoreError, Trial};

/// Render trials as CSV with one row per trial and flattened metric columns.
pub fn trials_to_csv(trials: &[Trial]) -> Result<String, StoreError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "timestamp",
        "strategy_id",
        "params",
        "total_return",
        "sharpe",
        "max_drawdown",
        "win_rate",
        "turnover",
        "trade_count",
        "bar_count",
        "reward",
    ])?;

    for t in trials {
        let m = &t.metrics;
        wtr.write_record([
            &t.id.to_string(),
            &t.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            &t.strategy_id,
            &t.params.canonical_json(),
            &format!("{:.8}", m.total_return),
            &format!("{:.6}", m.sharpe),
            &format!("{:.8}", m.max_drawdown),
            &format!("{:.6}", m.win_rate),
            &format!("{:.6}", m.turnover),
            &m.trade_count.to_string(),
            &m.bar_count.to_string(),
            &format!("{:.6}", t.reward),
        ])?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    String::from_utf8(data)
        .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Render trials as a pretty JSON array.
pub fn trials_to_json(trials: &[Trial]) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(trials)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::BacktestMetrics;
    use banditlab_core::params::ParamSet;
    use chrono::NaiveDate;

    fn sample_trial(id: u64) -> Trial {
        Trial {
            id,
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            strategy_id: "ema_cross".into(),
            params: [("fast", 9.0), ("slow", 21.0)].into_iter().collect(),
            metrics: BacktestMetrics {
                total_return: 0.12,
                sharpe: 1.4,
                max_drawdown: 0.08,
                win_rate: 0.55,
                turnover: 0.3,
                trade_count: 42,
                bar_count: 250,
            },
            reward: 1.33,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = trials_to_csv(&[sample_trial(1), sample_trial(2)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,timestamp,strategy_id,params"));
        assert!(lines[1].contains("ema_cross"));
        assert!(lines[1].contains("42"));
    }

    #[test]
    fn csv_of_empty_is_header_only() {
        let csv = trials_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn csv_params_are_canonical() {
        let csv = trials_to_csv(&[sample_trial(1)]).unwrap();
        assert!(csv.contains(r#"{""fast"":9.0,""slow"":21.0}"#) || csv.contains(r#"{"fast":9.0,"slow":21.0}"#));
    }

    #[test]
    fn json_roundtrips() {
        let trials = vec![sample_trial(1)];
        let json = trials_to_json(&trials).unwrap();
        let parsed: Vec<Trial> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, trials);
    }
}
