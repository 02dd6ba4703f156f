//! Zonebreak runner: the adapters around the replay core.
//!
//! This crate builds on `zonebreak-core` to provide:
//! - CSV bar loading with column normalization and zero-volume filtering
//! - Seeded synthetic bars
//! - TOML configuration
//! - Single-run orchestration with fingerprinting and extended metrics
//! - Parallel parameter sweeps
//! - Trade ledger / equity / result export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, DataConfig};
pub use data_loader::{load_csv, load_synthetic, DataSource, LoadError, LoadOptions, LoadedData};
pub use export::{save_artifacts, save_sweep, ArtifactPaths, ExportError};
pub use metrics::PerformanceMetrics;
pub use runner::{
    load_data, run_backtest_from_data, run_backtest_with_feed, run_single_backtest,
    BacktestResult, RunError,
};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
pub use synthetic::SyntheticSpec;
