//! Sub-strategy interface and registry.
//!
//! A `SignalStrategy` is a pure function of its inputs: the same candles and
//! parameters always produce the same signal series, and the output length
//! always equals the input length. The registry resolves strategy ids to
//! implementations and falls back to [`FlatStrategy`] for unknown ids so a
//! misconfigured arm degrades to a no-op instead of failing the caller.

mod breakout;
mod ema_cross;
mod rsi_mr;

use std::collections::HashMap;

use crate::domain::{Candle, Signal};
use crate::params::ParamSet;

pub use breakout::Breakout;
pub use ema_cross::EmaCross;
pub use rsi_mr::RsiMeanReversion;

/// A signal-generating sub-strategy.
pub trait SignalStrategy: Send + Sync {
    fn id(&self) -> &'static str;

    /// Produce one signal per candle. Must be pure: no hidden state, no I/O.
    fn generate(&self, candles: &[Candle], params: &ParamSet) -> Vec<Signal>;
}

/// No-op strategy: always flat. Fallback for unknown strategy ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatStrategy;

impl SignalStrategy for FlatStrategy {
    fn id(&self) -> &'static str {
        "flat"
    }

    fn generate(&self, candles: &[Candle], _params: &ParamSet) -> Vec<Signal> {
        vec![Signal::Flat; candles.len()]
    }
}

/// Registry of sub-strategies keyed by strategy id.
pub struct StrategyRegistry {
    strategies: HashMap<String, Box<dyn SignalStrategy>>,
    fallback: FlatStrategy,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
            fallback: FlatStrategy,
        }
    }

    /// Registry with the built-in strategies: `ema_cross`, `rsi_mr`, `breakout`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(EmaCross));
        registry.register(Box::new(RsiMeanReversion));
        registry.register(Box::new(Breakout));
        registry
    }

    pub fn register(&mut self, strategy: Box<dyn SignalStrategy>) {
        self.strategies.insert(strategy.id().to_string(), strategy);
    }

    pub fn contains(&self, strategy_id: &str) -> bool {
        self.strategies.contains_key(strategy_id)
    }

    /// Resolve a strategy id, falling back to the flat no-op for unknown ids.
    pub fn resolve(&self, strategy_id: &str) -> &dyn SignalStrategy {
        match self.strategies.get(strategy_id) {
            Some(s) => s.as_ref(),
            None => &self.fallback,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
