//! Cycle orchestrator — ties selection, evaluation, and persistence together.
//!
//! One cycle per incoming candle batch:
//! select arm → generate signals → evaluate → update arm → log trial →
//! emit the latest bar's signal.
//!
//! The cycle is a strict synchronous sequence with no internal parallelism:
//! the reward must be applied to the arm that was selected, so a host driving
//! the engine from a concurrent feed must serialize cycles (one in-flight
//! cycle per engine). The registry and store carry their own locks, but those
//! protect individual operations, not the select-then-update span.

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use banditlab_core::domain::{Candle, Signal};
use banditlab_core::params::ParamSet;
use banditlab_core::strategy::StrategyRegistry;

use crate::backtest::{evaluate, BacktestMetrics, EvalError};
use crate::bandit::{BanditError, BanditRegistry};
use crate::config::EngineConfig;
use crate::experience::{ExperienceStore, StoreError, TrialDraft};
use crate::walk_forward::walk_forward;

/// Where in the cycle a failure occurred; named in the degrade log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    SelectArm,
    GenerateSignals,
    Evaluate,
    UpdateArm,
    LogTrial,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::SelectArm => "select_arm",
            CycleStage::GenerateSignals => "generate_signals",
            CycleStage::Evaluate => "evaluate",
            CycleStage::UpdateArm => "update_arm",
            CycleStage::LogTrial => "log_trial",
        };
        f.write_str(name)
    }
}

/// Underlying failure inside a cycle.
#[derive(Debug, Error)]
pub enum CycleErrorKind {
    #[error(transparent)]
    Bandit(#[from] BanditError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A failed cycle, tagged with the stage it degraded from.
#[derive(Debug, Error)]
#[error("cycle failed during {stage}: {source}")]
pub struct CycleError {
    pub stage: CycleStage,
    #[source]
    pub source: CycleErrorKind,
}

impl CycleError {
    fn at(stage: CycleStage) -> impl FnOnce(CycleErrorKind) -> CycleError {
        move |source| CycleError { stage, source }
    }
}

/// Everything one completed cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub strategy_id: String,
    pub params: ParamSet,
    pub metrics: BacktestMetrics,
    pub reward: f64,
    pub trial_id: u64,
    /// The most recent bar's signal — the actionable output of the cycle.
    pub last_signal: Signal,
}

/// The learning engine: bandit registry + experience store + sub-strategies.
///
/// Both stores are owned by the engine and passed in at construction, never
/// ambient state, so engines for different symbols stay isolated.
pub struct Engine {
    config: EngineConfig,
    registry: BanditRegistry,
    store: ExperienceStore,
    strategies: StrategyRegistry,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        registry: BanditRegistry,
        store: ExperienceStore,
        strategies: StrategyRegistry,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            strategies,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &BanditRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ExperienceStore {
        &self.store
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Run one full learning cycle, propagating failures with their stage.
    ///
    /// An unknown strategy id is not a failure: it produces an all-flat
    /// signal series and the cycle records the resulting zero-effect trial.
    pub fn try_cycle(&self, candles: &[Candle]) -> Result<CycleReport, CycleError> {
        let arm = self
            .registry
            .select_arm()
            .map_err(|e| CycleError::at(CycleStage::SelectArm)(e.into()))?;

        if !self.strategies.contains(&arm.strategy_id) {
            warn!(
                strategy_id = %arm.strategy_id,
                "unknown strategy id, emitting flat signals"
            );
        }
        let strategy = self.strategies.resolve(&arm.strategy_id);
        let signals = strategy.generate(candles, &arm.params);

        let wf_cfg = self.config.walk_forward_cfg();
        let eval_cfg = self.config.eval_cfg();
        let metrics = if candles.len() >= wf_cfg.train_size + wf_cfg.test_size {
            walk_forward(candles, strategy, &arm.params, &wf_cfg, &eval_cfg)
        } else {
            evaluate(candles, &signals, &eval_cfg)
        }
        .map_err(|e| CycleError::at(CycleStage::Evaluate)(e.into()))?;

        let reward = self.config.reward_shaping().shape(&metrics);

        self.registry
            .update(&arm.strategy_id, &arm.params, reward)
            .map_err(|e| CycleError::at(CycleStage::UpdateArm)(e.into()))?;

        let trial = self
            .store
            .append(TrialDraft {
                strategy_id: arm.strategy_id.clone(),
                params: arm.params.clone(),
                metrics: metrics.clone(),
                reward,
            })
            .map_err(|e| CycleError::at(CycleStage::LogTrial)(e.into()))?;

        let last_signal = signals.last().copied().unwrap_or(Signal::Flat);
        info!(
            strategy_id = %arm.strategy_id,
            reward,
            sharpe = metrics.sharpe,
            trial_id = trial.id,
            signal = i8::from(last_signal),
            "cycle complete"
        );

        Ok(CycleReport {
            strategy_id: arm.strategy_id,
            params: arm.params,
            metrics,
            reward,
            trial_id: trial.id,
            last_signal,
        })
    }

    /// Run one cycle, degrading any failure to a flat signal.
    ///
    /// A single bad evaluation must never crash the caller: the failure is
    /// logged with the stage it came from and the caller gets `Signal::Flat`.
    pub fn run_cycle(&self, candles: &[Candle]) -> Signal {
        match self.try_cycle(candles) {
            Ok(report) => report.last_signal,
            Err(e) => {
                warn!(stage = %e.stage, error = %e.source, "cycle degraded to flat signal");
                Signal::Flat
            }
        }
    }
}
