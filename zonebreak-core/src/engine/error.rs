//! Fatal replay errors.

use crate::domain::BarDefect;
use thiserror::Error;

/// Errors that abort a run. Recoverable conditions (insufficient structure
/// history, invalid sizing input) never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("malformed bar at index {index}: {defect}")]
    MalformedBar { index: usize, defect: BarDefect },

    #[error("invariant violated at bar {index}: {detail}")]
    InvariantViolation { index: usize, detail: String },

    #[error("indicator series {series} has {actual} values, expected {expected}")]
    FeedMisaligned {
        series: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl EngineError {
    /// Bar the error was raised on, when it relates to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::MalformedBar { index, .. } | Self::InvariantViolation { index, .. } => {
                Some(*index)
            }
            Self::FeedMisaligned { .. } => None,
        }
    }
}
