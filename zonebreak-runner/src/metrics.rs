//! Performance metrics: pure functions over the equity curve and the ledger.
//!
//! These extend the core `Summary` with the statistics used to compare runs.
//! No dependencies on the loader or the replay.

use serde::{Deserialize, Serialize};
use zonebreak_core::domain::{PositionSide, Trade};

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    /// Non-positive fraction; 0.0 for a flat or rising curve.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_bars_held: f64,
    /// Fraction of bars with an open position.
    pub exposure: f64,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[Trade], initial_equity: f64) -> Self {
        Self {
            total_return: total_return(equity_curve, initial_equity),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            long_trades: count_side(trades, PositionSide::Long),
            short_trades: count_side(trades, PositionSide::Short),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            expectancy: expectancy(trades),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            avg_bars_held: avg_bars_held(trades),
            exposure: exposure(trades, equity_curve.len()),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction of the initial equity.
pub fn total_return(equity_curve: &[f64], initial_equity: f64) -> f64 {
    match equity_curve.last() {
        Some(&last) if initial_equity > 0.0 => (last - initial_equity) / initial_equity,
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    zonebreak_core::engine::summary::max_drawdown(equity_curve).unwrap_or(0.0)
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    zonebreak_core::engine::summary::win_rate(trades)
}

/// Gross profit over gross loss, capped at 100.0 when there are no losses.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Mean pnl of winning trades.
pub fn avg_win(trades: &[Trade]) -> f64 {
    mean(trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl))
}

/// Mean pnl of losing trades (non-positive).
pub fn avg_loss(trades: &[Trade]) -> f64 {
    mean(trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl))
}

/// Mean pnl per trade.
pub fn expectancy(trades: &[Trade]) -> f64 {
    mean(trades.iter().map(|t| t.pnl))
}

pub fn avg_bars_held(trades: &[Trade]) -> f64 {
    mean(trades.iter().map(|t| t.bars_held as f64))
}

/// Fraction of bars spent in the market. The entry bar counts.
pub fn exposure(trades: &[Trade], bar_count: usize) -> f64 {
    if bar_count == 0 {
        return 0.0;
    }
    let in_market: usize = trades.iter().map(|t| t.bars_held + 1).sum();
    (in_market as f64 / bar_count as f64).min(1.0)
}

fn count_side(trades: &[Trade], side: PositionSide) -> usize {
    trades.iter().filter(|t| t.side == side).count()
}

/// Longest run of winners (`winners = true`) or non-winners.
fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut best = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}
