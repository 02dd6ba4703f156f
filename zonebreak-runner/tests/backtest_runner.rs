//! End-to-end runner tests: TOML config on disk → CSV load → replay →
//! metrics → artifacts, plus parameter sweeps.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zonebreak_core::domain::PositionSide;
use zonebreak_core::indicators::{IndicatorFeed, IndicatorPeriods};
use zonebreak_core::params::StrategyParams;
use zonebreak_runner::config::BacktestConfig;
use zonebreak_runner::data_loader::{load_csv, load_synthetic, DataSource, LoadOptions};
use zonebreak_runner::export::{import_json, save_artifacts, save_sweep, ExportError};
use zonebreak_runner::runner::run_single_backtest;
use zonebreak_runner::sweep::{ParamGrid, ParamSweep};
use zonebreak_runner::synthetic::SyntheticSpec;

// ── Fixtures ─────────────────────────────────────────────────────────

/// Three floors near 6.0 at bars 6, 10 and 14, a close of 5.8 at bar 20,
/// then two quiet bars.
fn support_csv() -> String {
    let lows = [
        10.0, 10.0, 10.0, 9.0, 8.0, 7.0, 6.0, 7.0, 8.0, 7.0, 6.02, 7.0, 8.0, 7.0, 5.98, 7.0, 8.0,
        9.0, 10.0, 9.0,
    ];
    let mut rows: Vec<(f64, f64, f64, f64)> = lows
        .iter()
        .map(|&low| (low + 0.5, low + 1.0, low, low + 0.5))
        .collect();
    rows.push((5.8, 6.7, 5.7, 5.8));
    rows.push((5.8, 5.9, 5.6, 5.75));
    rows.push((5.75, 5.85, 5.55, 5.7));

    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for (i, (o, h, l, c)) in rows.into_iter().enumerate() {
        csv.push_str(&format!("2024-01-02 {i:02}:00:00,{o},{h},{l},{c},100\n"));
    }
    csv
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn config_toml(data: &Path, extra_strategy: &str) -> String {
    format!(
        r#"[data]
path = {data:?}

[backtest]
initial_equity = 10000.0
label = "support-breakdown"

[indicators]
fast_ma = 2
slow_ma = 3
rsi = 2
atr = 2

[strategy]
pivot_window = 3
zone_tolerance = 0.05
{extra_strategy}
"#
    )
}

fn setup(extra_strategy: &str) -> (TempDir, PathBuf, BacktestConfig) {
    let dir = tempfile::tempdir().unwrap();
    let data = write(dir.path(), "bars.csv", &support_csv());
    let config_path = write(dir.path(), "run.toml", &config_toml(&data, extra_strategy));
    let config = BacktestConfig::from_file(&config_path).unwrap();
    (dir, data, config)
}

// ── Single runs ──────────────────────────────────────────────────────

#[test]
fn toml_config_drives_csv_run() {
    let (_dir, data, config) = setup("");
    let result = run_single_backtest(&config, None).unwrap();

    assert_eq!(result.label.as_deref(), Some("support-breakdown"));
    assert_eq!(result.source, DataSource::Csv { path: data.clone() });
    assert_eq!(result.bar_count, 23);
    assert_eq!(result.equity_curve.len(), 23);
    assert_eq!(result.indicators.rsi, 2);

    let first = result.trades.first().expect("breakdown should open a short");
    assert_eq!(first.side, PositionSide::Short);
    assert_eq!(first.entry_index, 20);
    assert_eq!(first.entry_price, 5.8);
    assert!(result.trades.iter().all(|t| t.side == PositionSide::Short));

    let loaded = load_csv(&data, &LoadOptions::default()).unwrap();
    assert_eq!(result.fingerprint.dataset_hash, loaded.dataset_hash);
    assert_eq!(result.metrics.trade_count, result.trades.len());
    assert_eq!(result.summary.trade_count, result.trades.len());
}

#[test]
fn next_bar_open_from_config() {
    let (_dir, _data, config) = setup("fill_policy = \"next_bar_open\"");
    let result = run_single_backtest(&config, None).unwrap();
    let first = &result.trades[0];
    assert_eq!(first.entry_index, 21);
    assert_eq!(first.entry_price, 5.8);
}

#[test]
fn long_only_config_takes_no_trades() {
    let (_dir, _data, config) = setup("trading_mode = \"long_only\"");
    let result = run_single_backtest(&config, None).unwrap();
    assert!(result.trades.is_empty());
    assert!(result.diagnostics.entries_filtered >= 1);
    assert_eq!(result.summary.final_equity, 10_000.0);
}

#[test]
fn repeated_runs_are_identical() {
    let (_dir, _data, config) = setup("");
    let a = run_single_backtest(&config, None).unwrap();
    let b = run_single_backtest(&config, None).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.fingerprint, b.fingerprint);
}

#[test]
fn data_override_beats_config_path() {
    let (dir, _data, config) = setup("");
    let flat = write(
        dir.path(),
        "flat.csv",
        "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,10\n2024-01-03,1,1,1,1,10\n",
    );
    let result = run_single_backtest(&config, Some(&flat)).unwrap();
    assert_eq!(result.bar_count, 2);
    assert!(result.trades.is_empty());
}

// ── Artifacts ────────────────────────────────────────────────────────

#[test]
fn artifacts_round_trip() {
    let (dir, _data, config) = setup("");
    let result = run_single_backtest(&config, None).unwrap();
    let out = dir.path().join("out");
    let paths = save_artifacts(&result, &out).unwrap();

    let json = std::fs::read_to_string(&paths.result_json).unwrap();
    let imported = import_json(&json).unwrap();
    assert_eq!(imported.fingerprint, result.fingerprint);
    assert_eq!(imported.trades.len(), result.trades.len());
    assert_eq!(imported.params, result.params);

    let trades = std::fs::read_to_string(&paths.trades_csv).unwrap();
    assert_eq!(trades.lines().count(), result.trades.len() + 1);

    let equity = std::fs::read_to_string(&paths.equity_csv).unwrap();
    assert_eq!(equity.lines().count(), 24);
}

#[test]
fn future_schema_is_rejected() {
    let (_dir, _data, config) = setup("");
    let mut result = run_single_backtest(&config, None).unwrap();
    result.schema_version = 99;
    let json = serde_json::to_string(&result).unwrap();
    assert!(matches!(
        import_json(&json),
        Err(ExportError::UnsupportedSchema { found: 99, .. })
    ));
}

// ── Sweeps ───────────────────────────────────────────────────────────

fn sweep_inputs() -> (zonebreak_core::domain::BarSeries, IndicatorFeed) {
    let data = load_synthetic(&SyntheticSpec {
        bars: 800,
        seed: 11,
        ..Default::default()
    })
    .unwrap();
    let periods = IndicatorPeriods {
        fast_ma: 10,
        slow_ma: 30,
        ..Default::default()
    };
    let feed = IndicatorFeed::compute(&data.series, &periods);
    (data.series, feed)
}

#[test]
fn parallel_sweep_matches_sequential() {
    let (series, feed) = sweep_inputs();
    let base = StrategyParams {
        pivot_window: 4,
        zone_tolerance: 0.002,
        ..Default::default()
    };
    let grid = ParamGrid::around(&base);

    let parallel = ParamSweep::new(&series, &feed, 10_000.0).sweep(&grid, &base);
    let sequential = ParamSweep::new(&series, &feed, 10_000.0)
        .with_parallelism(false)
        .sweep(&grid, &base);

    assert_eq!(parallel, sequential);
    assert_eq!(parallel.len(), grid.size());
    assert!(parallel.failures.is_empty());
    let indices: Vec<usize> = parallel.points.iter().map(|p| p.index).collect();
    assert_eq!(indices, (0..grid.size()).collect::<Vec<_>>());
}

#[test]
fn invalid_grid_points_become_failures() {
    let (series, feed) = sweep_inputs();
    let base = StrategyParams::default();
    let grid = ParamGrid {
        pivot_windows: vec![],
        zone_tolerances: vec![0.0, 0.002],
        stop_multiples: vec![],
        target_multiples: vec![],
    };
    let results = ParamSweep::new(&series, &feed, 10_000.0).sweep(&grid, &base);
    assert_eq!(results.len(), 1);
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].index, 0);
    assert_eq!(results.points[0].index, 1);
}

#[test]
fn sweep_artifacts_are_ranked() {
    let (series, feed) = sweep_inputs();
    let base = StrategyParams {
        zone_tolerance: 0.002,
        ..Default::default()
    };
    let results = ParamSweep::new(&series, &feed, 10_000.0).sweep(&ParamGrid::around(&base), &base);
    let dir = tempfile::tempdir().unwrap();
    let csv_path = save_sweep(&results, dir.path()).unwrap();

    let csv = std::fs::read_to_string(csv_path).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("rank,index,pivot_window"));
    let pnls: Vec<f64> = lines
        .map(|l| l.split(',').nth(7).unwrap().parse().unwrap())
        .collect();
    assert_eq!(pnls.len(), results.len());
    assert!(pnls.windows(2).all(|w| w[0] >= w[1]));
    assert!(dir.path().join("sweep.json").exists());
}
