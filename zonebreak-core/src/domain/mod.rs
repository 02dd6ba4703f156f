//! Domain types for zonebreak

pub mod bar;
pub mod position;
pub mod series;
pub mod trade;

pub use bar::{Bar, BarDefect};
pub use position::{Position, PositionSide};
pub use series::BarSeries;
pub use trade::{ExitReason, Trade};
