//! Trade: a completed round trip, appended to the ledger on every close.

use super::position::PositionSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    #[serde(rename = "RSIExit")]
    RsiExit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "StopLoss",
            Self::TakeProfit => "TakeProfit",
            Self::RsiExit => "RSIExit",
            Self::EndOfData => "EndOfData",
        }
    }
}

/// A complete round-trip trade record: entry → exit. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_timestamp: Option<NaiveDateTime>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    pub side: PositionSide,
    pub size: f64,

    /// `(exit_price - entry_price) * size * direction_sign`
    pub pnl: f64,

    pub bars_held: usize,
    /// Maximum adverse excursion (worst unrealized pnl during the trade).
    pub mae: f64,
    /// Maximum favorable excursion (best unrealized pnl during the trade).
    pub mfe: f64,
}

impl Trade {
    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.size == 0.0 {
            return 0.0;
        }
        self.pnl / (self.entry_price * self.size)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
