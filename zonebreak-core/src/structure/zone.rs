//! Zone: a transient cluster of same-kind pivot prices.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    Support,
    Resistance,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Support => write!(f, "support"),
            Self::Resistance => write!(f, "resistance"),
        }
    }
}

/// Zone built for the bar under evaluation. Never persisted across bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    /// Member prices, oldest first.
    pub member_prices: Vec<f64>,
    pub mean: f64,
    /// Every member lies within the tolerance of the mean (inclusive).
    pub is_tight: bool,
}

impl Zone {
    pub fn from_prices(kind: ZoneKind, member_prices: Vec<f64>, tolerance: f64) -> Self {
        let mean = if member_prices.is_empty() {
            f64::NAN
        } else {
            member_prices.iter().sum::<f64>() / member_prices.len() as f64
        };
        let is_tight = !member_prices.is_empty()
            && member_prices.iter().all(|p| (p - mean).abs() <= tolerance);
        Self {
            kind,
            member_prices,
            mean,
            is_tight,
        }
    }

    /// Signed distance by which `close` has cleared the zone in the breakout
    /// direction: below the mean for support, above it for resistance.
    pub fn clearance(&self, close: f64) -> f64 {
        match self.kind {
            ZoneKind::Support => self.mean - close,
            ZoneKind::Resistance => close - self.mean,
        }
    }
}
