//! Backtest runner: wires data loading, indicator precompute, the replay
//! and metrics together.
//!
//! Entry points:
//! - `run_single_backtest()`: resolves the data source from a config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: pre-loaded bars, computes the indicator feed.
//! - `run_backtest_with_feed()`: pre-loaded bars and feed, no I/O. Used by sweeps.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use zonebreak_core::domain::{BarSeries, Trade};
use zonebreak_core::engine::{BacktestDriver, RunAbort, RunDiagnostics, Summary};
use zonebreak_core::fingerprint::RunFingerprint;
use zonebreak_core::indicators::{IndicatorFeed, IndicatorPeriods};
use zonebreak_core::params::{ParamsError, StrategyParams};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_csv, load_synthetic, DataSource, LoadError, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("replay aborted: {0}")]
    Aborted(#[from] RunAbort),
    #[error("failed to fingerprint parameters: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("no data source: set [data] path or [data.synthetic], or pass --data / --synthetic")]
    NoDataSource,
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub label: Option<String>,
    pub source: DataSource,
    pub params: StrategyParams,
    pub indicators: IndicatorPeriods,
    pub initial_equity: f64,
    pub bar_count: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub fingerprint: RunFingerprint,
    pub summary: Summary,
    pub metrics: PerformanceMetrics,
    pub diagnostics: RunDiagnostics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

impl BacktestResult {
    pub fn is_synthetic(&self) -> bool {
        self.source.is_synthetic()
    }
}

/// Resolve the data source for a config. `data_override` (e.g. a CLI flag)
/// takes precedence over `[data] path`.
pub fn load_data(
    config: &BacktestConfig,
    data_override: Option<&Path>,
) -> Result<LoadedData, RunError> {
    let opts = LoadOptions {
        drop_zero_volume: config.data.drop_zero_volume,
    };
    if let Some(path) = data_override.or(config.data.path.as_deref()) {
        return Ok(load_csv(path, &opts)?);
    }
    match &config.data.synthetic {
        Some(spec) => Ok(load_synthetic(spec)?),
        None => Err(RunError::NoDataSource),
    }
}

/// Load data per the config and run one backtest.
pub fn run_single_backtest(
    config: &BacktestConfig,
    data_override: Option<&Path>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let data = load_data(config, data_override)?;
    let mut result = run_backtest_from_data(
        &config.strategy,
        &config.indicators,
        &data,
        config.backtest.initial_equity,
    )?;
    result.label = config.backtest.label.clone();
    Ok(result)
}

/// Run a backtest on pre-loaded data, computing the indicator feed first.
pub fn run_backtest_from_data(
    params: &StrategyParams,
    periods: &IndicatorPeriods,
    data: &LoadedData,
    initial_equity: f64,
) -> Result<BacktestResult, RunError> {
    let feed = IndicatorFeed::compute(&data.series, periods);
    let mut result =
        run_backtest_with_feed(params, &data.series, &feed, initial_equity)?;
    result.source = data.source.clone();
    result.indicators = periods.clone();
    Ok(result)
}

/// Run a backtest with a precomputed feed: no I/O.
///
/// The result's `source` is `InMemory` and `indicators` the defaults; callers
/// that know better overwrite them.
pub fn run_backtest_with_feed(
    params: &StrategyParams,
    series: &BarSeries,
    feed: &IndicatorFeed,
    initial_equity: f64,
) -> Result<BacktestResult, RunError> {
    let driver = BacktestDriver::new(params.clone(), initial_equity)?;
    let run = driver.run(series, feed).map_err(|abort| {
        error!(
            last_processed = ?abort.last_processed,
            trades = abort.trades.len(),
            error = %abort.error,
            "replay aborted"
        );
        abort
    })?;

    let metrics = PerformanceMetrics::compute(&run.equity_curve, &run.trades, initial_equity);
    let fingerprint = RunFingerprint::new(params, series, &run.trades)?;

    info!(
        bars = series.len(),
        trades = run.summary.trade_count,
        total_pnl = run.summary.total_pnl,
        win_rate = run.summary.win_rate,
        ledger = %fingerprint.ledger_hash,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        label: None,
        source: DataSource::InMemory,
        params: params.clone(),
        indicators: IndicatorPeriods::default(),
        initial_equity,
        bar_count: series.len(),
        start: series.iter().next().map(|b| b.timestamp),
        end: series.last().map(|b| b.timestamp),
        fingerprint,
        summary: run.summary,
        metrics,
        diagnostics: run.diagnostics,
        trades: run.trades,
        equity_curve: run.equity_curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSpec;

    fn synthetic_config() -> BacktestConfig {
        let mut config = BacktestConfig::default();
        config.data.synthetic = Some(SyntheticSpec {
            bars: 600,
            ..Default::default()
        });
        config.indicators = IndicatorPeriods {
            fast_ma: 10,
            slow_ma: 30,
            ..Default::default()
        };
        config
    }

    #[test]
    fn no_data_source_is_an_error() {
        let err = run_single_backtest(&BacktestConfig::default(), None).unwrap_err();
        assert!(matches!(err, RunError::NoDataSource));
    }

    #[test]
    fn synthetic_run_is_tagged() {
        let result = run_single_backtest(&synthetic_config(), None).unwrap();
        assert!(result.is_synthetic());
        assert_eq!(result.bar_count, 600);
        assert_eq!(result.equity_curve.len(), 600);
        assert_eq!(result.indicators.fast_ma, 10);
        assert_eq!(result.summary.trade_count, result.trades.len());
    }

    #[test]
    fn invalid_params_surface_as_config_error() {
        let mut config = synthetic_config();
        config.strategy.zone_tolerance = -1.0;
        let err = run_single_backtest(&config, None).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::Params(_))));
    }

    #[test]
    fn missing_csv_is_data_error() {
        let err = run_single_backtest(
            &synthetic_config(),
            Some(Path::new("/nonexistent/zonebreak/bars.csv")),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Data(LoadError::Io { .. })));
    }
}
