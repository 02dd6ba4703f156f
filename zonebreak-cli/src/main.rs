//! Zonebreak CLI: replay and sweep commands.
//!
//! Commands:
//! - `run`: replay one configuration and write result.json, trades.csv, equity.csv
//! - `sweep`: replay a parameter grid in parallel and write a ranked sweep.csv

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zonebreak_core::indicators::IndicatorFeed;
use zonebreak_runner::{
    load_data, run_single_backtest, save_artifacts, save_sweep, BacktestConfig, BacktestResult,
    ParamSweep, SyntheticSpec,
};

#[derive(Parser)]
#[command(
    name = "zonebreak",
    about = "Zonebreak: support/resistance breakout backtester"
)]
struct Cli {
    /// Log per-bar decisions (debug level). RUST_LOG overrides.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file with OHLCV bars. Overrides [data] path.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Replay a seeded synthetic random walk instead of a file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for --synthetic.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one configuration.
    Run {
        #[command(flatten)]
        args: DataArgs,

        /// Print the summary as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay a parameter grid ([sweep] table, or a grid around [strategy]).
    Sweep {
        #[command(flatten)]
        args: DataArgs,

        /// Run grid points one after another.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of top rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { args, json } => run_cmd(&args, json),
        Commands::Sweep {
            args,
            sequential,
            top,
        } => sweep_cmd(&args, sequential, top),
    }
}

fn build_config(args: &DataArgs) -> Result<BacktestConfig> {
    let mut config = match &args.config {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    if args.synthetic {
        if args.data.is_some() {
            bail!("--data and --synthetic are mutually exclusive");
        }
        config.data.path = None;
        let spec = config.data.synthetic.take().unwrap_or_default();
        config.data.synthetic = Some(SyntheticSpec {
            seed: args.seed,
            ..spec
        });
    }
    Ok(config)
}

fn run_cmd(args: &DataArgs, json: bool) -> Result<()> {
    let config = build_config(args)?;
    let result =
        run_single_backtest(&config, args.data.as_deref()).context("backtest failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.summary)?);
    } else {
        print_summary(&result);
    }

    save_artifacts(&result, &args.output_dir)
        .with_context(|| format!("writing artifacts to {}", args.output_dir.display()))?;
    println!("Artifacts saved to: {}", args.output_dir.display());
    Ok(())
}

fn sweep_cmd(args: &DataArgs, sequential: bool, top: usize) -> Result<()> {
    let config = build_config(args)?;
    let data = load_data(&config, args.data.as_deref()).context("loading bars")?;
    let feed = IndicatorFeed::compute(&data.series, &config.indicators);
    let grid = config.sweep_grid();

    let results = ParamSweep::new(&data.series, &feed, config.backtest.initial_equity)
        .with_parallelism(!sequential)
        .sweep(&grid, &config.strategy);
    info!(
        completed = results.len(),
        failed = results.failures.len(),
        "sweep finished"
    );

    println!(
        "{:<5} {:>6} {:>10} {:>8} {:>8} {:>7} {:>14} {:>8}",
        "Rank", "Pivot", "Tolerance", "Stop", "Target", "Trades", "Total PnL", "Win %"
    );
    println!("{}", "-".repeat(74));
    for (rank, p) in results.ranked().into_iter().take(top).enumerate() {
        println!(
            "{:<5} {:>6} {:>10} {:>8} {:>8} {:>7} {:>14.2} {:>7.1}%",
            rank + 1,
            p.params.pivot_window,
            p.params.zone_tolerance,
            p.params.stop_multiple,
            p.params.target_multiple,
            p.summary.trade_count,
            p.summary.total_pnl,
            p.summary.win_rate * 100.0,
        );
    }
    for failure in &results.failures {
        eprintln!("grid point {} failed: {}", failure.index, failure.error);
    }

    let csv = save_sweep(&results, &args.output_dir)
        .with_context(|| format!("writing sweep to {}", args.output_dir.display()))?;
    println!("Sweep saved to: {}", csv.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    let m = &result.metrics;
    let d = &result.diagnostics;

    if result.is_synthetic() {
        println!("*** SYNTHETIC DATA ***");
    }
    if let Some(label) = &result.label {
        println!("Run:            {label}");
    }
    if let (Some(start), Some(end)) = (result.start, result.end) {
        println!("Period:         {start} .. {end} ({} bars)", result.bar_count);
    }
    println!("Initial equity: {:.2}", s.initial_equity);
    println!("Final equity:   {:.2}", s.final_equity);
    println!("Total PnL:      {:.2}", s.total_pnl);
    println!("Total return:   {:.2}%", m.total_return * 100.0);
    println!("Trades:         {} ({} long / {} short)", s.trade_count, m.long_trades, m.short_trades);
    println!("Win rate:       {:.1}%", s.win_rate * 100.0);
    println!("Profit factor:  {:.2}", m.profit_factor);
    match s.max_drawdown {
        Some(dd) => println!("Max drawdown:   {:.2}%", dd * 100.0),
        None => println!("Max drawdown:   n/a"),
    }
    println!("Avg bars held:  {:.1}", m.avg_bars_held);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    println!(
        "Signals:        {} raised, {} filtered, {} skipped",
        d.signals_raised, d.entries_filtered, d.entries_skipped
    );
    println!("Ledger hash:    {}", result.fingerprint.ledger_hash);
}
