//! Experience store — durable, append-mostly trial log.
//!
//! Trials are one JSON object per line (`trials.jsonl`). The line-oriented
//! format keeps appends all-or-nothing from the reader's perspective: a
//! partially written trailing line never parses and is skipped on read.
//!
//! Three maintenance policies run inside `append`:
//! - retention: once the log exceeds `max_trials_retained`, it is rewritten
//!   keeping only the newest records (oldest-first eviction)
//! - backup: every `backup_every_n_appends` appends a snapshot is copied to
//!   `backups/`, keeping the newest `backups_to_keep`
//! - retry: transient write failures are retried once, then surfaced

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use banditlab_core::params::ParamSet;

use crate::backtest::BacktestMetrics;
use crate::export::{trials_to_csv, trials_to_json};

const TRIALS_FILE: &str = "trials.jsonl";
const BACKUP_DIR: &str = "backups";
const BACKUP_PREFIX: &str = "trials_";

/// One recorded learning trial. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: u64,
    pub timestamp: NaiveDateTime,
    pub strategy_id: String,
    pub params: ParamSet,
    pub metrics: BacktestMetrics,
    pub reward: f64,
}

/// Trial fields supplied by the caller; id and timestamp are assigned on append.
#[derive(Debug, Clone)]
pub struct TrialDraft {
    pub strategy_id: String,
    pub params: ParamSet,
    pub metrics: BacktestMetrics,
    pub reward: f64,
}

/// Retention and backup policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCfg {
    pub max_trials_retained: usize,
    pub backup_every_n_appends: u64,
    pub backups_to_keep: usize,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            max_trials_retained: 10_000,
            backup_every_n_appends: 100,
            backups_to_keep: 10,
        }
    }
}

/// Errors from the experience store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid trial record: {0}")]
    InvalidRecord(String),
    #[error("trial store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("trial store serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("trial export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Query filters for `query`. All fields optional; results are most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct TrialFilter {
    pub strategy_id: Option<String>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub limit: Option<usize>,
}

/// Flat export formats for offline analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported export format: {other}")),
        }
    }
}

struct StoreState {
    next_id: u64,
    record_count: usize,
    appends_since_backup: u64,
}

/// Durable trial log rooted at one directory.
///
/// A single internal lock guards every read-modify-write; callers share the
/// store by reference.
pub struct ExperienceStore {
    dir: PathBuf,
    cfg: StoreCfg,
    state: Mutex<StoreState>,
}

impl ExperienceStore {
    /// Open (or create) a store directory, scanning any existing log to
    /// restore the id sequence and record count.
    pub fn open(dir: impl Into<PathBuf>, cfg: StoreCfg) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(BACKUP_DIR))?;

        let trials = read_trials(&dir.join(TRIALS_FILE))?;
        let next_id = trials.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let record_count = trials.len();

        Ok(Self {
            dir,
            cfg,
            state: Mutex::new(StoreState {
                next_id,
                record_count,
                appends_since_backup: 0,
            }),
        })
    }

    pub fn trials_path(&self) -> PathBuf {
        self.dir.join(TRIALS_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }

    /// Number of trials currently retained.
    pub fn len(&self) -> usize {
        self.lock().record_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate and durably append one trial. Returns the stored record with
    /// its assigned id and timestamp.
    pub fn append(&self, draft: TrialDraft) -> Result<Trial, StoreError> {
        validate_draft(&draft)?;

        let mut state = self.lock();
        let trial = Trial {
            id: state.next_id,
            timestamp: Utc::now().naive_utc(),
            strategy_id: draft.strategy_id,
            params: draft.params,
            metrics: draft.metrics,
            reward: draft.reward,
        };

        let line = serde_json::to_string(&trial)?;
        self.append_line(&line)?;

        state.next_id += 1;
        state.record_count += 1;
        state.appends_since_backup += 1;

        if state.record_count > self.cfg.max_trials_retained {
            self.enforce_retention(&mut state)?;
        }
        if state.appends_since_backup >= self.cfg.backup_every_n_appends {
            self.create_backup(trial.id)?;
            state.appends_since_backup = 0;
        }

        Ok(trial)
    }

    /// Retrieve trials, most recent first.
    pub fn query(&self, filter: &TrialFilter) -> Result<Vec<Trial>, StoreError> {
        let _state = self.lock();
        let mut trials = read_trials(&self.trials_path())?;

        if let Some(strategy_id) = &filter.strategy_id {
            trials.retain(|t| &t.strategy_id == strategy_id);
        }
        if let Some(since) = filter.since {
            trials.retain(|t| t.timestamp >= since);
        }
        if let Some(until) = filter.until {
            trials.retain(|t| t.timestamp <= until);
        }

        trials.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        if let Some(limit) = filter.limit {
            trials.truncate(limit);
        }
        Ok(trials)
    }

    /// Serialize the full trial set to a flat file next to the log.
    /// The live store is not modified. Returns the written path.
    pub fn export(&self, format: ExportFormat) -> Result<PathBuf, StoreError> {
        let _state = self.lock();
        let trials = read_trials(&self.trials_path())?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .dir
            .join(format!("trials_export_{stamp}.{}", format.extension()));

        let contents = match format {
            ExportFormat::Csv => trials_to_csv(&trials)?,
            ExportFormat::Json => trials_to_json(&trials)?,
        };
        fs::write(&path, contents)?;
        debug!(path = %path.display(), count = trials.len(), "exported trials");
        Ok(path)
    }

    /// Take a final backup snapshot, then clear all trials. Operator-triggered
    /// only; nothing in the engine calls this automatically.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        let path = self.trials_path();
        if path.exists() {
            self.create_backup(state.next_id.saturating_sub(1))?;
            fs::remove_file(&path)?;
        }
        state.next_id = 1;
        state.record_count = 0;
        state.appends_since_backup = 0;
        warn!("experience store reset, learning history cleared");
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Writes are line-atomic and counters are re-derivable from the log,
        // so recovering a poisoned lock is safe.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append_line(&self, line: &str) -> Result<(), StoreError> {
        let path = self.trials_path();
        let write = |path: &Path| -> io::Result<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{line}")?;
            file.flush()
        };
        match write(&path) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(error = %first, "trial append failed, retrying once");
                write(&path).map_err(StoreError::Io)
            }
        }
    }

    /// Rewrite the log keeping only the newest `max_trials_retained` records.
    fn enforce_retention(&self, state: &mut MutexGuard<'_, StoreState>) -> Result<(), StoreError> {
        let path = self.trials_path();
        let mut trials = read_trials(&path)?;
        let max = self.cfg.max_trials_retained;
        if trials.len() <= max {
            state.record_count = trials.len();
            return Ok(());
        }

        trials.sort_by_key(|t| t.id);
        let evicted = trials.len() - max;
        let keep = trials.split_off(evicted);

        let mut contents = String::new();
        for trial in &keep {
            contents.push_str(&serde_json::to_string(trial)?);
            contents.push('\n');
        }
        write_atomic_with_retry(&path, &contents)?;

        state.record_count = keep.len();
        debug!(evicted, retained = keep.len(), "evicted oldest trials");
        Ok(())
    }

    /// Copy the current log into `backups/`, then drop backups beyond the
    /// configured keep count (oldest first).
    fn create_backup(&self, last_id: u64) -> Result<(), StoreError> {
        let src = self.trials_path();
        if !src.exists() {
            return Ok(());
        }
        let dst = self
            .backup_dir()
            .join(format!("{BACKUP_PREFIX}{last_id:010}.jsonl"));
        match fs::copy(&src, &dst) {
            Ok(_) => {}
            Err(first) => {
                warn!(error = %first, "backup copy failed, retrying once");
                fs::copy(&src, &dst)?;
            }
        }
        debug!(backup = %dst.display(), "created trial backup");
        self.rotate_backups()
    }

    fn rotate_backups(&self) -> Result<(), StoreError> {
        let mut backups: Vec<PathBuf> = fs::read_dir(self.backup_dir())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".jsonl"))
            })
            .collect();

        if backups.len() <= self.cfg.backups_to_keep {
            return Ok(());
        }

        // Zero-padded ids make lexical order chronological
        backups.sort();
        let excess = backups.len() - self.cfg.backups_to_keep;
        for stale in backups.into_iter().take(excess) {
            fs::remove_file(&stale)?;
            debug!(backup = %stale.display(), "removed stale backup");
        }
        Ok(())
    }
}

fn validate_draft(draft: &TrialDraft) -> Result<(), StoreError> {
    if draft.strategy_id.trim().is_empty() {
        return Err(StoreError::InvalidRecord("empty strategy id".into()));
    }
    if !draft.reward.is_finite() {
        return Err(StoreError::InvalidRecord(format!(
            "non-finite reward: {}",
            draft.reward
        )));
    }
    let m = &draft.metrics;
    for (name, value) in [
        ("total_return", m.total_return),
        ("sharpe", m.sharpe),
        ("max_drawdown", m.max_drawdown),
        ("win_rate", m.win_rate),
        ("turnover", m.turnover),
    ] {
        if !value.is_finite() {
            return Err(StoreError::InvalidRecord(format!(
                "non-finite metric {name}: {value}"
            )));
        }
    }
    Ok(())
}

/// Read every parseable trial from a JSONL file. Malformed lines (including a
/// torn trailing write) are skipped.
fn read_trials(path: &Path) -> Result<Vec<Trial>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let mut trials = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Trial>(&line) {
            Ok(trial) => trials.push(trial),
            Err(_) => continue,
        }
    }
    Ok(trials)
}

fn write_atomic_with_retry(path: &Path, contents: &str) -> Result<(), StoreError> {
    let write = |path: &Path| -> io::Result<()> {
        let tmp = path.with_extension("jsonl.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)
    };
    match write(path) {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(error = %first, "trial log rewrite failed, retrying once");
            write(path).map_err(StoreError::Io)
        }
    }
}
