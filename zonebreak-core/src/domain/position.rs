//! Position: the single live position owned by the simulator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
            Self::Flat => 0.0,
        }
    }
}

/// Position state. `side == Flat` means no position is open and the price
/// fields carry no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub size: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub opened_at_index: usize,
    pub opened_at: Option<NaiveDateTime>,
    /// Worst unrealized pnl seen while open (<= 0).
    pub mae: f64,
    /// Best unrealized pnl seen while open (>= 0).
    pub mfe: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            entry_price: 0.0,
            size: 0.0,
            stop_price: 0.0,
            target_price: 0.0,
            opened_at_index: 0,
            opened_at: None,
            mae: 0.0,
            mfe: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }

    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Realized pnl if the position were closed at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.side.sign()
    }

    /// Whether stop and target sit on the correct sides of the entry.
    ///
    /// The stop may reach the entry price (a trailed stop stops at breakeven),
    /// the target must lie strictly beyond it.
    pub fn bracket_is_valid(&self) -> bool {
        let prices_finite = self.entry_price.is_finite()
            && self.stop_price.is_finite()
            && self.target_price.is_finite();
        match self.side {
            PositionSide::Flat => true,
            PositionSide::Long => {
                prices_finite
                    && self.stop_price <= self.entry_price
                    && self.target_price > self.entry_price
            }
            PositionSide::Short => {
                prices_finite
                    && self.stop_price >= self.entry_price
                    && self.target_price < self.entry_price
            }
        }
    }

    /// Fold one bar's extremes into the excursion statistics.
    pub fn record_excursion(&mut self, high: f64, low: f64) {
        let (adverse, favorable) = match self.side {
            PositionSide::Long => (self.pnl_at(low), self.pnl_at(high)),
            PositionSide::Short => (self.pnl_at(high), self.pnl_at(low)),
            PositionSide::Flat => return,
        };
        self.mae = self.mae.min(adverse);
        self.mfe = self.mfe.max(favorable);
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}
