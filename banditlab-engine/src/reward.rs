//! Reward shaping — collapse backtest metrics into one bandit reward.
//!
//! `reward = sharpe − λ_dd · max_drawdown − λ_cost · turnover`
//!
//! The drawdown term penalizes risk, the turnover term penalizes trading
//! frequency; both metrics are non-negative so the penalties only subtract.

use serde::{Deserialize, Serialize};

use crate::backtest::BacktestMetrics;

/// Penalty weights applied on top of the risk-adjusted return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RewardShaping {
    pub lambda_drawdown: f64,
    pub lambda_turnover: f64,
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self {
            lambda_drawdown: 0.5,
            lambda_turnover: 0.1,
        }
    }
}

impl RewardShaping {
    pub fn shape(&self, metrics: &BacktestMetrics) -> f64 {
        metrics.sharpe
            - self.lambda_drawdown * metrics.max_drawdown
            - self.lambda_turnover * metrics.turnover
    }
}
