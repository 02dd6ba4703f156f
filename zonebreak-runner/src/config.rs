//! TOML backtest configuration.
//!
//! ```toml
//! [data]
//! path = "data/EURUSD_1h.csv"
//!
//! [backtest]
//! initial_equity = 10000.0
//!
//! [indicators]
//! fast_ma = 50
//!
//! [strategy]
//! pivot_window = 6
//! zone_tolerance = 0.01
//! ```
//!
//! Every table is optional and falls back to its defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zonebreak_core::indicators::IndicatorPeriods;
use zonebreak_core::params::{ParamsError, StrategyParams};

use crate::sweep::ParamGrid;
use crate::synthetic::SyntheticSpec;

/// Errors from reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("initial_equity must be positive and finite, got {0}")]
    InitialEquity(f64),

    #[error("indicator period '{0}' must be at least 1")]
    ZeroPeriod(&'static str),

    #[error("[data] sets both path and synthetic; choose one")]
    AmbiguousData,
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with OHLCV rows.
    pub path: Option<PathBuf>,
    /// Generate a seeded random walk instead of reading a file.
    pub synthetic: Option<SyntheticSpec>,
    /// Drop rows whose volume is exactly zero (closed-market filler bars).
    pub drop_zero_volume: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            synthetic: None,
            drop_zero_volume: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_equity: f64,
    /// Free-form run label carried into the exported result.
    pub label: Option<String>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_equity: 10_000.0,
            label: None,
        }
    }
}

/// Full configuration for a single run (and optionally a sweep).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub backtest: BacktestSection,
    pub indicators: IndicatorPeriods,
    pub strategy: StrategyParams,
    /// Grid used by the `sweep` command. Falls back to a grid around `strategy`.
    pub sweep: Option<ParamGrid>,
}

impl BacktestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let equity = self.backtest.initial_equity;
        if !(equity > 0.0 && equity.is_finite()) {
            return Err(ConfigError::InitialEquity(equity));
        }
        let periods = &self.indicators;
        for (name, value) in [
            ("fast_ma", periods.fast_ma),
            ("slow_ma", periods.slow_ma),
            ("rsi", periods.rsi),
            ("atr", periods.atr),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroPeriod(name));
            }
        }
        if self.data.path.is_some() && self.data.synthetic.is_some() {
            return Err(ConfigError::AmbiguousData);
        }
        self.strategy.validate()?;
        Ok(())
    }

    pub fn sweep_grid(&self) -> ParamGrid {
        self.sweep
            .clone()
            .unwrap_or_else(|| ParamGrid::around(&self.strategy))
    }
}
