//! BanditLab CLI — drive the learning engine from candle files or synthetic data.
//!
//! Commands:
//! - `learn` — run learning cycles over a CSV candle file (or synthetic bars)
//! - `arms` — show the bandit arm ranking
//! - `trials` — show recent trials from the experience store
//! - `export` — write the trial log as CSV or JSON for offline analysis
//! - `reset` — back up and clear the learned state

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use banditlab_core::strategy::StrategyRegistry;
use banditlab_engine::{
    default_seeds, load_candles_csv, synthetic_candles, BanditRegistry, Engine, EngineConfig,
    ExperienceStore, ExportFormat, TrialFilter,
};

const ARMS_FILE: &str = "arms.json";

#[derive(Parser)]
#[command(name = "banditlab", about = "BanditLab — adaptive strategy selection engine")]
struct Cli {
    /// Directory holding learned state (arm snapshot, trial log, backups).
    #[arg(long, default_value = "memory", global = true)]
    memory_dir: PathBuf,

    /// Optional TOML engine configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run learning cycles and print the resulting arm ranking.
    Learn {
        /// CSV candle file (timestamp,open,high,low,close,volume). Synthetic
        /// data is generated when omitted.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Number of learning cycles to run.
        #[arg(long, default_value_t = 10)]
        cycles: usize,

        /// Bars of synthetic data when no --data file is given.
        #[arg(long, default_value_t = 2000)]
        synthetic_bars: usize,

        /// Seed for synthetic data generation.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Show all arms ranked by mean reward.
    Arms,
    /// Show recent trials, most recent first.
    Trials {
        /// Only trials for this strategy id.
        #[arg(long)]
        strategy: Option<String>,

        /// Maximum trials to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Export the full trial log to a flat file.
    Export {
        /// Output format: csv or json.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
    },
    /// Take a final backup, then clear arms and trials.
    Reset {
        /// Required confirmation flag.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Learn {
            data,
            cycles,
            synthetic_bars,
            seed,
        } => {
            let candles = match &data {
                Some(path) => load_candles_csv(path)
                    .with_context(|| format!("loading candles from {}", path.display()))?,
                None => synthetic_candles(synthetic_bars, seed),
            };
            if candles.is_empty() {
                bail!("no candles to learn from");
            }

            let engine = open_engine(&cli.memory_dir, config)?;
            println!(
                "learning over {} bars ({} arms seeded)",
                candles.len(),
                engine.registry().len()
            );

            for i in 1..=cycles {
                match engine.try_cycle(&candles) {
                    Ok(report) => println!(
                        "cycle {i:>3}/{cycles}: {:<10} {} reward={:+.4} sharpe={:+.3} dd={:.3} signal={}",
                        report.strategy_id,
                        report.params.canonical_json(),
                        report.reward,
                        report.metrics.sharpe,
                        report.metrics.max_drawdown,
                        i8::from(report.last_signal),
                    ),
                    Err(e) => println!("cycle {i:>3}/{cycles}: degraded ({e})"),
                }
            }

            println!();
            print_arm_ranking(&engine);
        }
        Commands::Arms => {
            let engine = open_engine(&cli.memory_dir, config)?;
            print_arm_ranking(&engine);
        }
        Commands::Trials { strategy, limit } => {
            let store = open_store(&cli.memory_dir, &config)?;
            let filter = TrialFilter {
                strategy_id: strategy,
                limit: Some(limit),
                ..Default::default()
            };
            let trials = store.query(&filter).context("querying trials")?;
            if trials.is_empty() {
                println!("no trials recorded");
                return Ok(());
            }
            println!(
                "{:>6}  {:<19}  {:<10}  {:>8}  {:>8}  {:>7}  params",
                "id", "timestamp", "strategy", "reward", "sharpe", "trades"
            );
            for t in trials {
                println!(
                    "{:>6}  {:<19}  {:<10}  {:>+8.4}  {:>+8.3}  {:>7}  {}",
                    t.id,
                    t.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    t.strategy_id,
                    t.reward,
                    t.metrics.sharpe,
                    t.metrics.trade_count,
                    t.params.canonical_json(),
                );
            }
        }
        Commands::Export { format } => {
            let store = open_store(&cli.memory_dir, &config)?;
            let path = store.export(format).context("exporting trials")?;
            println!("exported {} trials to {}", store.len(), path.display());
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("reset clears all learned state; pass --yes to confirm");
            }
            let store = open_store(&cli.memory_dir, &config)?;
            store.reset().context("resetting experience store")?;
            let arms_path = cli.memory_dir.join(ARMS_FILE);
            if arms_path.exists() {
                std::fs::remove_file(&arms_path)
                    .with_context(|| format!("removing {}", arms_path.display()))?;
            }
            println!("learning memory cleared (final trial backup kept in backups/)");
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_toml_file(p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn open_store(memory_dir: &std::path::Path, config: &EngineConfig) -> Result<ExperienceStore> {
    ExperienceStore::open(memory_dir, config.store_cfg())
        .with_context(|| format!("opening experience store in {}", memory_dir.display()))
}

fn open_engine(memory_dir: &std::path::Path, config: EngineConfig) -> Result<Engine> {
    let registry = BanditRegistry::open(memory_dir.join(ARMS_FILE))
        .with_context(|| format!("opening arm registry in {}", memory_dir.display()))?;
    registry
        .ensure_arms(&default_seeds())
        .context("seeding default arms")?;
    let store = open_store(memory_dir, &config)?;
    Ok(Engine::new(
        config,
        registry,
        store,
        StrategyRegistry::with_builtins(),
    ))
}

fn print_arm_ranking(engine: &Engine) {
    let stats = engine.registry().stats();
    if stats.is_empty() {
        println!("no arms registered");
        return;
    }
    println!(
        "{:>4}  {:<10}  {:>6}  {:>12}  {:>12}  params",
        "rank", "strategy", "pulls", "mean_reward", "total_reward"
    );
    for (i, arm) in stats.iter().enumerate() {
        println!(
            "{:>4}  {:<10}  {:>6}  {:>+12.4}  {:>+12.4}  {}",
            i + 1,
            arm.strategy_id,
            arm.pulls,
            arm.mean_reward,
            arm.total_reward,
            arm.params.canonical_json(),
        );
    }
}
