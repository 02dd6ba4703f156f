//! Replay engine: the position state machine and the bar-by-bar driver.
//!
//! The driver consumes a [`BarSeries`](crate::domain::BarSeries) and an
//! [`IndicatorFeed`](crate::indicators::IndicatorFeed), walks the bars strictly
//! in index order, and returns either a [`RunResult`] or a [`RunAbort`].

pub mod bracket;
pub mod driver;
pub mod error;
pub mod simulator;
pub mod state;
pub mod summary;
pub mod warmup;

pub use bracket::{BracketLevels, BracketMode, BracketPolicy};
pub use driver::BacktestDriver;
pub use error::EngineError;
pub use simulator::{PendingEntry, PositionSimulator};
pub use state::{RunAbort, RunDiagnostics, RunResult};
pub use summary::Summary;
pub use warmup::WarmupState;
