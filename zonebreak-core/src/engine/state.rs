//! Run result types: the completed ledger or a fatal abort.

use super::error::EngineError;
use super::summary::Summary;
use crate::domain::Trade;
use crate::structure::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters collected during a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub bars_processed: usize,
    pub warmup_bars: usize,
    pub pivots_confirmed: usize,
    /// Bars on which a zone lacked enough eligible pivots.
    pub insufficient_history_bars: usize,
    pub signals_raised: usize,
    /// Signals rejected by the side, trend or RSI entry gate.
    pub entries_filtered: usize,
    /// Entries skipped because sizing failed or returned zero.
    pub entries_skipped: usize,
    /// Next-bar-open entries with no following bar.
    pub pending_dropped: usize,
    pub entries_taken: usize,
}

/// Output of a completed replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub summary: Summary,
    /// Mark-to-market equity after each bar.
    pub equity_curve: Vec<f64>,
    /// Structure signal per bar (`None` during warm-up).
    pub signals: Vec<Signal>,
    pub diagnostics: RunDiagnostics,
}

/// A run that failed on a precondition violation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAbort {
    pub error: EngineError,
    /// Last bar fully processed before the failure, if any.
    pub last_processed: Option<usize>,
    /// Trades closed before the failure.
    pub trades: Vec<Trade>,
}

impl fmt::Display for RunAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_processed {
            Some(index) => write!(f, "{} (last processed bar {index})", self.error),
            None => write!(f, "{} (no bar processed)", self.error),
        }
    }
}

impl std::error::Error for RunAbort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
