//! ReplayLab CLI: run, validate and batch commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `validate`: parse and check a config without loading any data
//! - `batch`: run several configs in parallel, one artifact directory each

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use replaylab_runner::{run_backtest, run_batch, save_artifacts, BacktestConfig, BacktestReport};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "replaylab",
    about = "ReplayLab CLI: event-driven backtest replay"
)]
struct Cli {
    /// Log level or filter directive. `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Parse and validate a config file without running it.
    Validate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Run several config files in parallel.
    Batch {
        /// Paths to TOML config files.
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, &output_dir),
        Commands::Validate { config } => validate_cmd(&config),
        Commands::Batch {
            configs,
            output_dir,
        } => batch_cmd(&configs, &output_dir),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level: {level}"))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn run_cmd(config_path: &Path, output_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let report = run_backtest(&config).context("backtest failed")?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn validate_cmd(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let run_id = config.run_id()?;

    println!("Config OK: {}", config_path.display());
    println!("Run id:      {}", run_id.short());
    println!("Instruments: {}", config.backtest.symbols.join(", "));
    println!(
        "Period:      {} to {}",
        config.backtest.start_date, config.backtest.end_date
    );
    println!("Data:        {}", config.data.kind());
    Ok(())
}

fn batch_cmd(config_paths: &[PathBuf], output_dir: &Path) -> Result<()> {
    let configs = config_paths
        .iter()
        .map(|p| load_config(p))
        .collect::<Result<Vec<_>>>()?;

    let results = run_batch(&configs);

    println!();
    println!("{:<30} {:<14} {:>16} {:>8}", "Config", "Run", "Final Equity", "Fills");
    println!("{}", "-".repeat(71));

    let mut failed = 0usize;
    for (path, result) in config_paths.iter().zip(results) {
        let name = path.display().to_string();
        match result {
            Ok(report) => {
                let run_dir = save_artifacts(&report, output_dir)?;
                println!(
                    "{:<30} {:<14} {:>16} {:>8}",
                    name,
                    report.run_id.short(),
                    report.summary.final_equity,
                    report.summary.fills
                );
                debug!(dir = %run_dir.display(), "batch artifacts saved");
            }
            Err(err) => {
                failed += 1;
                error!(config = %name, error = %err, "run failed");
                println!("{name:<30} FAILED: {err}");
            }
        }
    }
    println!();
    println!("Artifacts saved under: {}", output_dir.display());

    if failed > 0 {
        bail!("{failed} of {} run(s) failed", config_paths.len());
    }
    Ok(())
}

fn print_summary(report: &BacktestReport) {
    let s = &report.summary;
    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", report.run_id.short());
    println!("Strategy:       {}", s.strategy);
    println!("Instruments:    {}", s.symbols.join(", "));
    println!("Data:           {}", s.data_source);
    match (s.start, s.end) {
        (Some(start), Some(end)) => println!("Period:         {start} to {end}"),
        _ => println!("Period:         (empty)"),
    }
    println!("Ticks:          {}", s.timeline_len);
    println!();
    println!("--- Capital ---");
    println!("Initial:        {}", s.initial_capital);
    println!("Final Cash:     {}", s.final_cash);
    println!("Final Equity:   {}", s.final_equity);
    println!("Net P&L:        {}", s.net_pnl);
    println!("Realized P&L:   {}", s.realized_pnl);
    println!("Commission:     {}", s.total_commission);
    println!();
    println!("--- Activity ---");
    println!("Signals:        {} ({} rejected)", s.signals, s.signals_rejected);
    println!("Orders:         {} ({} rejected)", s.orders, s.orders_rejected);
    println!("Fills:          {}", s.fills);
    if !s.final_positions.is_empty() {
        println!();
        println!("--- Open Positions ---");
        for (symbol, volume) in &s.final_positions {
            println!("{symbol:<15} {volume}");
        }
    }
    if report.engine_stats.market_events == 0 {
        println!();
        println!("WARNING: no market events were replayed");
    }
    println!();
    println!("Dataset hash:   {}", report.dataset_hash.short());
    println!("Result hash:    {}", report.result_hash.short());
}
