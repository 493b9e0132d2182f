//! Walk-forward evaluation — rolling out-of-sample scoring.
//!
//! The series is split into sliding windows of `train_size` bars followed by
//! `test_size` test bars, stepping by half the test size (50% overlap).
//! Signals are regenerated over each test segment only, with the same
//! parameters across all windows (no refitting), and each segment is scored
//! with the single-pass evaluator.
//!
//! Aggregation weights every metric by its window's bar count, except
//! max drawdown (worst window wins) and trade count (summed).

use serde::{Deserialize, Serialize};

use banditlab_core::domain::Candle;
use banditlab_core::params::ParamSet;
use banditlab_core::strategy::SignalStrategy;

use crate::backtest::{evaluate, BacktestMetrics, EvalCfg, EvalError};

/// Minimum usable bars in a test segment; shorter windows are skipped.
pub const MIN_WINDOW_BARS: usize = 10;

/// Walk-forward window sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardCfg {
    pub train_size: usize,
    pub test_size: usize,
}

impl Default for WalkForwardCfg {
    fn default() -> Self {
        Self {
            train_size: 1000,
            test_size: 250,
        }
    }
}

impl WalkForwardCfg {
    /// Step between window starts: half the test size, at least one bar.
    pub fn step(&self) -> usize {
        (self.test_size / 2).max(1)
    }
}

/// One transient walk-forward window (bar index ranges, end-exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub train_end: usize,
    pub test_end: usize,
}

impl Window {
    pub fn test_len(&self) -> usize {
        self.test_end - self.train_end
    }
}

/// Generate sliding windows across `n_bars`. Empty when the series is too
/// short for a single full window.
pub fn windows(n_bars: usize, cfg: &WalkForwardCfg) -> Vec<Window> {
    let full = cfg.train_size + cfg.test_size;
    if n_bars < full {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut start = 0;
    while start + full <= n_bars {
        let train_end = start + cfg.train_size;
        out.push(Window {
            start,
            train_end,
            test_end: (train_end + cfg.test_size).min(n_bars),
        });
        start += cfg.step();
    }
    out
}

/// Walk-forward evaluation of one strategy/parameter pair.
///
/// Falls back to a single whole-series evaluation when the series is shorter
/// than `train_size + test_size` or when no window yields enough usable bars.
pub fn walk_forward(
    candles: &[Candle],
    strategy: &dyn SignalStrategy,
    params: &ParamSet,
    wf_cfg: &WalkForwardCfg,
    eval_cfg: &EvalCfg,
) -> Result<BacktestMetrics, EvalError> {
    let min_window = MIN_WINDOW_BARS.max(eval_cfg.min_bars);
    let mut window_metrics = Vec::new();

    for window in windows(candles.len(), wf_cfg) {
        if window.test_len() < min_window {
            continue;
        }
        let segment = &candles[window.train_end..window.test_end];
        let signals = strategy.generate(segment, params);
        window_metrics.push(evaluate(segment, &signals, eval_cfg)?);
    }

    if window_metrics.is_empty() {
        let signals = strategy.generate(candles, params);
        return evaluate(candles, &signals, eval_cfg);
    }

    Ok(aggregate(&window_metrics))
}

/// Combine per-window metrics into one summary.
fn aggregate(windows: &[BacktestMetrics]) -> BacktestMetrics {
    let total_bars: usize = windows.iter().map(|m| m.bar_count).sum();
    let weight_sum = total_bars as f64;

    let weighted = |f: fn(&BacktestMetrics) -> f64| -> f64 {
        windows
            .iter()
            .map(|m| f(m) * m.bar_count as f64)
            .sum::<f64>()
            / weight_sum
    };

    BacktestMetrics {
        total_return: weighted(|m| m.total_return),
        sharpe: weighted(|m| m.sharpe),
        max_drawdown: windows
            .iter()
            .map(|m| m.max_drawdown)
            .fold(0.0, f64::max),
        win_rate: weighted(|m| m.win_rate),
        turnover: weighted(|m| m.turnover),
        trade_count: windows.iter().map(|m| m.trade_count).sum(),
        bar_count: total_bars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banditlab_core::domain::Signal;
    use chrono::NaiveDate;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: base + chrono::Duration::hours(i as i64),
                open: close,
                high: close * 1.001,
                low: close * 0.999,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    /// Always-long test double.
    struct AlwaysLong;

    impl SignalStrategy for AlwaysLong {
        fn id(&self) -> &'static str {
            "always_long"
        }
        fn generate(&self, candles: &[Candle], _params: &ParamSet) -> Vec<Signal> {
            vec![Signal::Long; candles.len()]
        }
    }

    fn wavy_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 8.0)
            .collect()
    }

    // ── Window generation ──

    #[test]
    fn window_count_matches_overlap_formula() {
        // 200 bars, train 50, test 10, step 5: (200-50-10)/5 + 1 = 29 windows
        let cfg = WalkForwardCfg {
            train_size: 50,
            test_size: 10,
        };
        let w = windows(200, &cfg);
        assert_eq!(w.len(), 29);
        assert_eq!(w[0].start, 0);
        assert_eq!(w[0].train_end, 50);
        assert_eq!(w[0].test_end, 60);
        assert_eq!(w[1].start, 5);
        assert_eq!(w.last().unwrap().test_end, 200);
    }

    #[test]
    fn windows_empty_for_short_series() {
        let cfg = WalkForwardCfg {
            train_size: 50,
            test_size: 10,
        };
        assert!(windows(59, &cfg).is_empty());
    }

    #[test]
    fn step_is_at_least_one() {
        let cfg = WalkForwardCfg {
            train_size: 5,
            test_size: 1,
        };
        assert_eq!(cfg.step(), 1);
    }

    // ── Aggregation ──

    #[test]
    fn aggregate_drawdown_takes_worst_window() {
        let mut a = BacktestMetrics {
            max_drawdown: 0.05,
            bar_count: 10,
            ..Default::default()
        };
        let b = BacktestMetrics {
            max_drawdown: 0.20,
            bar_count: 10,
            ..Default::default()
        };
        a.sharpe = 1.0;
        let agg = aggregate(&[a, b]);
        assert!((agg.max_drawdown - 0.20).abs() < 1e-12);
        // Sharpe is weighted, not maxed
        assert!((agg.sharpe - 0.5).abs() < 1e-12);
    }

    #[test]
    fn aggregate_weights_by_bar_count() {
        let a = BacktestMetrics {
            sharpe: 2.0,
            bar_count: 30,
            ..Default::default()
        };
        let b = BacktestMetrics {
            sharpe: 0.0,
            bar_count: 10,
            ..Default::default()
        };
        let agg = aggregate(&[a, b]);
        assert!((agg.sharpe - 1.5).abs() < 1e-12);
        assert_eq!(agg.bar_count, 40);
    }

    #[test]
    fn aggregate_sums_trade_counts() {
        let a = BacktestMetrics {
            trade_count: 7,
            bar_count: 10,
            ..Default::default()
        };
        let b = BacktestMetrics {
            trade_count: 5,
            bar_count: 10,
            ..Default::default()
        };
        assert_eq!(aggregate(&[a, b]).trade_count, 12);
    }

    // ── End-to-end walk-forward ──

    #[test]
    fn walk_forward_aggregates_windows() {
        let candles = candles_from_closes(&wavy_closes(200));
        let wf = WalkForwardCfg {
            train_size: 50,
            test_size: 20,
        };
        let eval_cfg = EvalCfg {
            fee_rate_bps: 0.0,
            ..Default::default()
        };
        let m = walk_forward(&candles, &AlwaysLong, &ParamSet::new(), &wf, &eval_cfg).unwrap();
        // 14 windows of 20 test bars each
        assert_eq!(m.bar_count, 14 * 20);
        assert!(m.max_drawdown >= 0.0);
    }

    #[test]
    fn walk_forward_drawdown_is_worst_window() {
        let candles = candles_from_closes(&wavy_closes(200));
        let wf = WalkForwardCfg {
            train_size: 50,
            test_size: 20,
        };
        let eval_cfg = EvalCfg {
            fee_rate_bps: 0.0,
            ..Default::default()
        };

        let mut worst = 0.0_f64;
        for w in windows(candles.len(), &wf) {
            let segment = &candles[w.train_end..w.test_end];
            let signals = AlwaysLong.generate(segment, &ParamSet::new());
            let m = evaluate(segment, &signals, &eval_cfg).unwrap();
            worst = worst.max(m.max_drawdown);
        }

        let agg = walk_forward(&candles, &AlwaysLong, &ParamSet::new(), &wf, &eval_cfg).unwrap();
        assert!((agg.max_drawdown - worst).abs() < 1e-12);
    }

    #[test]
    fn short_series_falls_back_to_single_pass() {
        let candles = candles_from_closes(&wavy_closes(60));
        let wf = WalkForwardCfg {
            train_size: 100,
            test_size: 50,
        };
        let eval_cfg = EvalCfg {
            fee_rate_bps: 0.0,
            ..Default::default()
        };
        let wf_metrics =
            walk_forward(&candles, &AlwaysLong, &ParamSet::new(), &wf, &eval_cfg).unwrap();
        let signals = AlwaysLong.generate(&candles, &ParamSet::new());
        let single = evaluate(&candles, &signals, &eval_cfg).unwrap();
        assert_eq!(wf_metrics, single);
    }

    #[test]
    fn tiny_test_windows_fall_back_to_single_pass() {
        // test_size below MIN_WINDOW_BARS: every window is skipped
        let candles = candles_from_closes(&wavy_closes(120));
        let wf = WalkForwardCfg {
            train_size: 50,
            test_size: 4,
        };
        let eval_cfg = EvalCfg {
            fee_rate_bps: 0.0,
            ..Default::default()
        };
        let wf_metrics =
            walk_forward(&candles, &AlwaysLong, &ParamSet::new(), &wf, &eval_cfg).unwrap();
        let signals = AlwaysLong.generate(&candles, &ParamSet::new());
        let single = evaluate(&candles, &signals, &eval_cfg).unwrap();
        assert_eq!(wf_metrics, single);
    }
}
