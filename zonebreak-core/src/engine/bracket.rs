//! Bracket levels and the trailing-stop ratchet.

use crate::domain::PositionSide;
use serde::{Deserialize, Serialize};

/// Unit of `stop_multiple` / `target_multiple`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketMode {
    /// Multiples of ATR at the signal bar.
    Atr,
    /// Fractions of the entry price.
    #[default]
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketPolicy {
    pub mode: BracketMode,
    pub stop_multiple: f64,
    pub target_multiple: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketLevels {
    pub stop: f64,
    pub target: f64,
}

impl BracketLevels {
    /// Whether both levels sit strictly beyond `entry` on their own side.
    ///
    /// Fails when the distance is lost to float resolution at `entry`.
    pub fn brackets(&self, side: PositionSide, entry: f64) -> bool {
        if !(self.stop.is_finite() && self.target.is_finite()) {
            return false;
        }
        match side {
            PositionSide::Long => self.stop < entry && entry < self.target,
            PositionSide::Short => self.target < entry && entry < self.stop,
            PositionSide::Flat => false,
        }
    }
}

impl BracketPolicy {
    /// Stop and target for an entry at `entry` on `side`.
    ///
    /// Long: stop below, target above. Short: mirrored.
    pub fn levels(&self, side: PositionSide, entry: f64, atr: f64) -> BracketLevels {
        let (stop_dist, target_dist) = match self.mode {
            BracketMode::Atr => (self.stop_multiple * atr, self.target_multiple * atr),
            BracketMode::Percent => (entry * self.stop_multiple, entry * self.target_multiple),
        };
        let sign = side.sign();
        BracketLevels {
            stop: entry - sign * stop_dist,
            target: entry + sign * target_dist,
        }
    }
}

/// Candidate trailing stop `k` ATRs behind `close`.
pub fn trailing_stop(side: PositionSide, close: f64, atr: f64, k: f64) -> f64 {
    close - side.sign() * k * atr
}

/// Apply a proposed stop without ever loosening it or moving it past entry.
///
/// For longs: stops may only go UP, capped at entry.
/// For shorts: stops may only go DOWN, floored at entry.
/// A non-finite proposal leaves the stop unchanged.
pub fn ratchet_stop(side: PositionSide, current: f64, proposed: f64, entry: f64) -> f64 {
    if !proposed.is_finite() {
        return current;
    }
    match side {
        PositionSide::Long => proposed.min(entry).max(current),
        PositionSide::Short => proposed.max(entry).min(current),
        PositionSide::Flat => current,
    }
}
