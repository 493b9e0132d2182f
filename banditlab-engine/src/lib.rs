//! BanditLab Engine — adaptive strategy selection over candle batches.
//!
//! This crate builds on `banditlab-core` to provide:
//! - Single-pass signal backtest with transaction costs and safe edge cases
//! - Walk-forward evaluation with bar-weighted aggregation
//! - UCB1 arm registry with durable, all-or-nothing statistics
//! - Experience store (JSONL trial log) with retention, backups, and export
//! - Reward shaping (Sharpe minus drawdown and turnover penalties)
//! - The cycle orchestrator gluing it all together with degrade-don't-crash
//!   semantics

pub mod backtest;
pub mod bandit;
pub mod config;
pub mod data;
pub mod engine;
pub mod experience;
pub mod export;
pub mod reward;
pub mod walk_forward;

pub use backtest::{evaluate, BacktestMetrics, EvalCfg, EvalError};
pub use bandit::{default_seeds, ucb_score, Arm, ArmSeed, BanditError, BanditRegistry};
pub use config::{ConfigError, EngineConfig};
pub use data::{load_candles_csv, synthetic_candles, DataError};
pub use engine::{CycleError, CycleReport, CycleStage, Engine};
pub use experience::{
    ExperienceStore, ExportFormat, StoreCfg, StoreError, Trial, TrialDraft, TrialFilter,
};
pub use reward::RewardShaping;
pub use walk_forward::{walk_forward, WalkForwardCfg, Window};
