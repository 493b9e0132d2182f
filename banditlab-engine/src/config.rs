//! Engine configuration — the full tunable surface, read once at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::EvalCfg;
use crate::experience::StoreCfg;
use crate::reward::RewardShaping;
use crate::walk_forward::WalkForwardCfg;

/// Complete engine configuration. Every field has a default, so a TOML file
/// only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transaction cost in basis points.
    pub fee_rate_bps: f64,
    /// Drawdown penalty weight in the reward.
    pub lambda_drawdown: f64,
    /// Turnover penalty weight in the reward.
    pub lambda_turnover: f64,
    /// Walk-forward training window, in bars.
    pub train_window_size: usize,
    /// Walk-forward test window, in bars.
    pub test_window_size: usize,
    /// Trial log retention bound.
    pub max_trials_retained: usize,
    /// Backup cadence, in appends.
    pub backup_every_n_appends: u64,
    /// Backup snapshots kept, oldest deleted first.
    pub backups_to_keep: usize,
    /// Periods per year for Sharpe annualization.
    pub annualization_factor: f64,
    /// Minimum bars accepted per evaluation.
    pub min_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_rate_bps: 1.5,
            lambda_drawdown: 0.5,
            lambda_turnover: 0.1,
            train_window_size: 1000,
            test_window_size: 250,
            max_trials_retained: 10_000,
            backup_every_n_appends: 100,
            backups_to_keep: 10,
            annualization_factor: 252.0,
            min_bars: 10,
        }
    }
}

/// Errors loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn eval_cfg(&self) -> EvalCfg {
        EvalCfg {
            fee_rate_bps: self.fee_rate_bps,
            annualization_factor: self.annualization_factor,
            min_bars: self.min_bars,
        }
    }

    pub fn walk_forward_cfg(&self) -> WalkForwardCfg {
        WalkForwardCfg {
            train_size: self.train_window_size,
            test_size: self.test_window_size,
        }
    }

    pub fn reward_shaping(&self) -> RewardShaping {
        RewardShaping {
            lambda_drawdown: self.lambda_drawdown,
            lambda_turnover: self.lambda_turnover,
        }
    }

    pub fn store_cfg(&self) -> StoreCfg {
        StoreCfg {
            max_trials_retained: self.max_trials_retained,
            backup_every_n_appends: self.backup_every_n_appends,
            backups_to_keep: self.backups_to_keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.fee_rate_bps, 1.5);
        assert_eq!(cfg.lambda_drawdown, 0.5);
        assert_eq!(cfg.lambda_turnover, 0.1);
        assert_eq!(cfg.train_window_size, 1000);
        assert_eq!(cfg.test_window_size, 250);
        assert_eq!(cfg.max_trials_retained, 10_000);
        assert_eq!(cfg.backup_every_n_appends, 100);
        assert_eq!(cfg.backups_to_keep, 10);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            fee_rate_bps = 2.5
            train_window_size = 500
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fee_rate_bps, 2.5);
        assert_eq!(cfg.train_window_size, 500);
        // Everything else stays at the default
        assert_eq!(cfg.test_window_size, 250);
        assert_eq!(cfg.lambda_drawdown, 0.5);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = toml::to_string(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.max_trials_retained, cfg.max_trials_retained);
    }

    #[test]
    fn from_toml_file_missing_is_io_error() {
        let err = EngineConfig::from_toml_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(err, Err(ConfigError::Io(_))));
    }

    #[test]
    fn sub_configs_inherit_fields() {
        let mut cfg = EngineConfig::default();
        cfg.fee_rate_bps = 3.0;
        cfg.lambda_turnover = 0.2;
        assert_eq!(cfg.eval_cfg().fee_rate_bps, 3.0);
        assert_eq!(cfg.reward_shaping().lambda_turnover, 0.2);
        assert_eq!(cfg.walk_forward_cfg().train_size, 1000);
        assert_eq!(cfg.store_cfg().backups_to_keep, 10);
    }
}
