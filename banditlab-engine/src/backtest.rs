//! Signal backtest — converts a candle/signal pair into performance metrics.
//!
//! Execution model: a signal observed on bar `i` is acted on starting bar
//! `i+1` (no look-ahead). Transaction costs are charged on every position
//! change, proportional to the magnitude of the change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use banditlab_core::domain::{Candle, Signal};

/// Evaluation settings for a single backtest pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCfg {
    /// Transaction cost in basis points, charged per unit of position change.
    pub fee_rate_bps: f64,
    /// Periods per year for Sharpe annualization.
    pub annualization_factor: f64,
    /// Minimum bar count accepted by `evaluate`.
    pub min_bars: usize,
}

impl Default for EvalCfg {
    fn default() -> Self {
        Self {
            fee_rate_bps: 1.5,
            annualization_factor: 252.0,
            min_bars: 10,
        }
    }
}

/// Aggregate performance metrics for one evaluated signal series.
///
/// All fields are neutral (zero) when the series produced no trades, so
/// downstream reward computation is total — never NaN or infinite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub sharpe: f64,
    /// Peak-to-trough decline as a non-negative fraction.
    pub max_drawdown: f64,
    /// Winning bars / non-zero-return bars, in [0, 1].
    pub win_rate: f64,
    /// Sum of absolute position changes divided by bar count.
    pub turnover: f64,
    /// Count of bars with a non-zero net return.
    pub trade_count: usize,
    /// Bars the metrics were computed over.
    pub bar_count: usize,
}

/// Rejected inputs. Nothing is computed or mutated when these fire.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("candle/signal length mismatch: {candles} candles, {signals} signals")]
    LengthMismatch { candles: usize, signals: usize },
    #[error("too few bars: {bars} < minimum {min}")]
    TooFewBars { bars: usize, min: usize },
    #[error("malformed candle at index {index}: OHLC out of order or non-positive")]
    MalformedCandle { index: usize },
}

/// Run a single backtest pass over aligned candles and signals.
pub fn evaluate(
    candles: &[Candle],
    signals: &[Signal],
    cfg: &EvalCfg,
) -> Result<BacktestMetrics, EvalError> {
    if candles.len() != signals.len() {
        return Err(EvalError::LengthMismatch {
            candles: candles.len(),
            signals: signals.len(),
        });
    }
    if candles.len() < cfg.min_bars {
        return Err(EvalError::TooFewBars {
            bars: candles.len(),
            min: cfg.min_bars,
        });
    }
    if let Some(index) = candles.iter().position(|c| !c.is_sane()) {
        return Err(EvalError::MalformedCandle { index });
    }

    let n = candles.len();
    let fee = cfg.fee_rate_bps / 10_000.0;

    let mut net_returns = Vec::with_capacity(n);
    let mut turnover_sum = 0.0;
    let mut prev_position = 0.0;

    for i in 0..n {
        // Position on bar i is the signal from bar i-1; the first bar starts flat.
        let position = if i == 0 { 0.0 } else { signals[i - 1].as_f64() };
        let bar_return = if i == 0 {
            0.0
        } else {
            (candles[i].close - candles[i - 1].close) / candles[i - 1].close
        };

        let delta = (position - prev_position).abs();
        turnover_sum += delta;
        net_returns.push(position * bar_return - delta * fee);
        prev_position = position;
    }

    Ok(metrics_from_returns(&net_returns, turnover_sum, cfg))
}

fn metrics_from_returns(net_returns: &[f64], turnover_sum: f64, cfg: &EvalCfg) -> BacktestMetrics {
    let n = net_returns.len();

    let total_return = net_returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;

    // Sharpe: sample std over all bars; zero variance maps to zero, never NaN.
    let mean = mean_f64(net_returns);
    let std = std_dev(net_returns);
    let sharpe = if std < 1e-15 {
        0.0
    } else {
        (mean / std) * cfg.annualization_factor.sqrt()
    };

    // Max drawdown on the cumulative product curve, reported non-negative.
    let mut cumulative = 1.0;
    let mut peak = 1.0;
    let mut max_drawdown = 0.0_f64;
    for &r in net_returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        }
        if peak > 0.0 {
            let dd = (peak - cumulative) / peak;
            if dd > max_drawdown {
                max_drawdown = dd;
            }
        }
    }

    let winners = net_returns.iter().filter(|&&r| r > 0.0).count();
    let trade_count = net_returns.iter().filter(|&&r| r != 0.0).count();
    let win_rate = if trade_count > 0 {
        winners as f64 / trade_count as f64
    } else {
        0.0
    };

    BacktestMetrics {
        total_return,
        sharpe,
        max_drawdown,
        win_rate,
        turnover: turnover_sum / n as f64,
        trade_count,
        bar_count: n,
    }
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
