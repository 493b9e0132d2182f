//! UCB1 arm registry — strategy/parameter selection with persistent statistics.
//!
//! Each arm is one `(strategy_id, canonical params)` pair, unique across the
//! registry. Selection visits every arm once in registration order before any
//! exploitation, then maximizes the UCB1 score
//! `mean_reward + sqrt(2·ln(total_pulls) / pulls)` with first-seen tie-break.
//!
//! Statistics survive restarts: every mutation writes a full JSON snapshot via
//! temp-file + rename, and the in-memory state is committed only after the
//! snapshot landed. A mutation therefore either fully applies or not at all.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use banditlab_core::params::{ArmKey, ParamSet};

/// One bandit arm: identity plus mutable pull statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arm {
    pub strategy_id: String,
    pub params: ParamSet,
    pub pulls: u64,
    pub total_reward: f64,
    pub mean_reward: f64,
    pub last_update: NaiveDateTime,
}

impl Arm {
    fn fresh(strategy_id: String, params: ParamSet) -> Self {
        Self {
            strategy_id,
            params,
            pulls: 0,
            total_reward: 0.0,
            mean_reward: 0.0,
            last_update: Utc::now().naive_utc(),
        }
    }

    pub fn key(&self) -> ArmKey {
        ArmKey::derive(&self.strategy_id, &self.params)
    }
}

/// Seed definition for `ensure_arms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSeed {
    pub strategy_id: String,
    pub params: ParamSet,
}

impl ArmSeed {
    pub fn new(strategy_id: impl Into<String>, params: ParamSet) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            params,
        }
    }

    pub fn key(&self) -> ArmKey {
        ArmKey::derive(&self.strategy_id, &self.params)
    }
}

/// The default arm pool: three sub-strategies, three parameter variants each.
pub fn default_seeds() -> Vec<ArmSeed> {
    fn params(pairs: &[(&str, f64)]) -> ParamSet {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    vec![
        ArmSeed::new("ema_cross", params(&[("fast", 9.0), ("slow", 21.0)])),
        ArmSeed::new("ema_cross", params(&[("fast", 12.0), ("slow", 26.0)])),
        ArmSeed::new("ema_cross", params(&[("fast", 20.0), ("slow", 50.0)])),
        ArmSeed::new("rsi_mr", params(&[("period", 14.0), ("lo", 30.0), ("hi", 70.0)])),
        ArmSeed::new("rsi_mr", params(&[("period", 8.0), ("lo", 25.0), ("hi", 75.0)])),
        ArmSeed::new("rsi_mr", params(&[("period", 21.0), ("lo", 35.0), ("hi", 65.0)])),
        ArmSeed::new("breakout", params(&[("lookback", 20.0), ("buffer_bps", 2.0)])),
        ArmSeed::new("breakout", params(&[("lookback", 55.0), ("buffer_bps", 3.0)])),
        ArmSeed::new("breakout", params(&[("lookback", 10.0), ("buffer_bps", 1.0)])),
    ]
}

/// UCB1 score for one arm given the registry-wide pull total.
pub fn ucb_score(mean_reward: f64, pulls: u64, total_pulls: u64) -> f64 {
    mean_reward + (2.0 * (total_pulls as f64).ln() / pulls as f64).sqrt()
}

/// Errors from the arm registry.
#[derive(Debug, Error)]
pub enum BanditError {
    #[error("no arms registered")]
    EmptyRegistry,
    #[error("arm store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("arm store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

struct State {
    /// Registration order; exploration walks this front to back.
    arms: Vec<Arm>,
    index: HashMap<ArmKey, usize>,
}

/// Persistent UCB1 registry.
///
/// A single writer at a time; `stats()`/`select_arm()` readers may run
/// concurrently with each other.
pub struct BanditRegistry {
    state: RwLock<State>,
    path: Option<PathBuf>,
}

impl BanditRegistry {
    /// Open a registry backed by a JSON snapshot file, loading any existing
    /// arms.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BanditError> {
        let path = path.into();
        let arms: Vec<Arm> = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let index = build_index(&arms);
        Ok(Self {
            state: RwLock::new(State { arms, index }),
            path: Some(path),
        })
    }

    /// Registry without persistence.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(State {
                arms: Vec::new(),
                index: HashMap::new(),
            }),
            path: None,
        }
    }

    /// Idempotently insert any seed not already present, with zero pulls.
    /// Existing arms keep their statistics untouched. Returns how many arms
    /// were added.
    pub fn ensure_arms(&self, seeds: &[ArmSeed]) -> Result<usize, BanditError> {
        let mut state = self.write_lock();

        let mut next = state.arms.clone();
        let mut known: HashSet<ArmKey> = state.index.keys().cloned().collect();
        let mut added = 0;

        for seed in seeds {
            let key = seed.key();
            if !known.insert(key) {
                continue;
            }
            next.push(Arm::fresh(seed.strategy_id.clone(), seed.params.clone()));
            added += 1;
        }

        if added > 0 {
            self.commit(&mut state, next)?;
            debug!(added, "seeded new arms");
        }
        Ok(added)
    }

    /// Select the next arm to try.
    ///
    /// Zero-pull arms are returned first, in registration order, so every arm
    /// is explored once before UCB1 exploitation begins.
    pub fn select_arm(&self) -> Result<Arm, BanditError> {
        let state = self.read_lock();
        if state.arms.is_empty() {
            return Err(BanditError::EmptyRegistry);
        }

        if let Some(arm) = state.arms.iter().find(|a| a.pulls == 0) {
            debug!(strategy_id = %arm.strategy_id, "selected unexplored arm");
            return Ok(arm.clone());
        }

        let total_pulls: u64 = state.arms.iter().map(|a| a.pulls).sum();
        let mut best = &state.arms[0];
        let mut best_score = ucb_score(best.mean_reward, best.pulls, total_pulls);
        for arm in &state.arms[1..] {
            let score = ucb_score(arm.mean_reward, arm.pulls, total_pulls);
            // Strict: ties keep the first-seen arm
            if score > best_score {
                best = arm;
                best_score = score;
            }
        }

        debug!(strategy_id = %best.strategy_id, score = best_score, "selected arm by UCB1");
        Ok(best.clone())
    }

    /// Record an observed reward for an arm, creating it with `pulls = 1`
    /// if the pair was never seeded.
    pub fn update(
        &self,
        strategy_id: &str,
        params: &ParamSet,
        reward: f64,
    ) -> Result<Arm, BanditError> {
        let mut state = self.write_lock();
        let key = ArmKey::derive(strategy_id, params);
        let now = Utc::now().naive_utc();

        let mut next = state.arms.clone();
        let updated = match state.index.get(&key) {
            Some(&i) => {
                let arm = &mut next[i];
                arm.pulls += 1;
                arm.total_reward += reward;
                arm.mean_reward = arm.total_reward / arm.pulls as f64;
                arm.last_update = now;
                arm.clone()
            }
            None => {
                let arm = Arm {
                    strategy_id: strategy_id.to_string(),
                    params: params.clone(),
                    pulls: 1,
                    total_reward: reward,
                    mean_reward: reward,
                    last_update: now,
                };
                next.push(arm.clone());
                arm
            }
        };

        self.commit(&mut state, next)?;
        Ok(updated)
    }

    /// All arms ranked by mean reward descending, pulls descending.
    pub fn stats(&self) -> Vec<Arm> {
        let state = self.read_lock();
        let mut arms = state.arms.clone();
        arms.sort_by(|a, b| {
            b.mean_reward
                .partial_cmp(&a.mean_reward)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.pulls.cmp(&a.pulls))
        });
        arms
    }

    pub fn len(&self) -> usize {
        self.read_lock().arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lock().arms.is_empty()
    }

    pub fn total_pulls(&self) -> u64 {
        self.read_lock().arms.iter().map(|a| a.pulls).sum()
    }

    /// Persist a candidate arm list, then commit it in memory. The snapshot
    /// write happens first so a storage failure leaves the registry unchanged.
    fn commit(
        &self,
        state: &mut std::sync::RwLockWriteGuard<'_, State>,
        next: Vec<Arm>,
    ) -> Result<(), BanditError> {
        self.persist(&next)?;
        state.index = build_index(&next);
        state.arms = next;
        Ok(())
    }

    fn persist(&self, arms: &[Arm]) -> Result<(), BanditError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(arms)?;
        match write_atomic(path, &json) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(error = %first, "arm snapshot write failed, retrying once");
                write_atomic(path, &json).map_err(BanditError::Io)
            }
        }
    }

    // Commits are all-or-nothing, so state stays consistent even after a
    // panicked writer; recover instead of propagating poison.
    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn build_index(arms: &[Arm]) -> HashMap<ArmKey, usize> {
    arms.iter().enumerate().map(|(i, a)| (a.key(), i)).collect()
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
