//! Zonebreak Core: pivot/zone structure detection and single-position
//! bar-replay simulation.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, series, positions, trades)
//! - Indicator builders and the aligned indicator feed
//! - Causal pivot detection and support/resistance zone classification
//! - Entry filters and position sizers
//! - The position state machine and the bar-by-bar replay driver
//! - Run fingerprinting
//!
//! No file or network I/O happens here.

pub mod domain;
pub mod engine;
pub mod filter;
pub mod fingerprint;
pub mod indicators;
pub mod params;
pub mod sizers;
pub mod structure;

pub use domain::{Bar, BarDefect, BarSeries, ExitReason, Position, PositionSide, Trade};
pub use engine::{BacktestDriver, EngineError, RunAbort, RunResult, Summary};
pub use indicators::{IndicatorFeed, IndicatorPeriods};
pub use params::{FillPolicy, ParamsError, StrategyParams};
pub use structure::Signal;
