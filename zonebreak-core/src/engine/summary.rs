//! Summary statistics over a finished ledger.

use crate::domain::Trade;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_pnl: f64,
    pub trade_count: usize,
    /// Fraction of trades with pnl > 0. Zero for an empty ledger.
    pub win_rate: f64,
    /// Largest peak-to-trough decline of the equity curve, as a non-positive
    /// fraction of the peak. `None` when there is no curve.
    pub max_drawdown: Option<f64>,
    pub initial_equity: f64,
    pub final_equity: f64,
}

impl Summary {
    /// `final_equity` is the replay's running equity, so it matches the last
    /// point of `equity_curve` bit for bit.
    pub fn from_ledger(
        trades: &[Trade],
        equity_curve: &[f64],
        initial_equity: f64,
        final_equity: f64,
    ) -> Self {
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        Self {
            total_pnl,
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            max_drawdown: max_drawdown(equity_curve),
            initial_equity,
            final_equity,
        }
    }
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 for a 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> Option<f64> {
    if equity_curve.is_empty() {
        return None;
    }
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    Some(max_dd)
}
