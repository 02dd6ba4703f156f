//! PositionSimulator: the single-position state machine.
//!
//! ```text
//!   Flat ──BreakoutLong──▶ Long ──stop │ target │ RSI > overbought │ end──▶ Flat
//!   Flat ──BreakoutShort─▶ Short ─stop │ target │ RSI < oversold   │ end──▶ Flat
//! ```
//!
//! Exit checks on a bar run in a fixed order: stop, then target, then the
//! RSI override. A bar touching both bracket levels is a stop-out.

use super::bracket::{ratchet_stop, trailing_stop, BracketLevels};
use super::error::EngineError;
use crate::domain::{Bar, ExitReason, Position, PositionSide, Trade};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Entry decided on a signal bar, waiting for the next bar's open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub side: PositionSide,
    pub signal_index: usize,
    /// ATR at the signal bar; brackets and sizing use it at the fill.
    pub atr: f64,
}

#[derive(Debug, Clone)]
pub struct PositionSimulator {
    position: Position,
    pending: Option<PendingEntry>,
    entries_taken: usize,
    rsi_overbought: f64,
    rsi_oversold: f64,
}

impl PositionSimulator {
    pub fn new(rsi_overbought: f64, rsi_oversold: f64) -> Self {
        Self {
            position: Position::flat(),
            pending: None,
            entries_taken: 0,
            rsi_overbought,
            rsi_oversold,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_flat()
    }

    pub fn entries_taken(&self) -> usize {
        self.entries_taken
    }

    pub fn pending(&self) -> Option<&PendingEntry> {
        self.pending.as_ref()
    }

    pub fn set_pending(&mut self, entry: PendingEntry) {
        self.pending = Some(entry);
    }

    pub fn take_pending(&mut self) -> Option<PendingEntry> {
        self.pending.take()
    }

    /// Open a position at `entry_price` on `bar`.
    ///
    /// Opening while a position is live, or with a bracket on the wrong side
    /// of the entry, is a state-machine defect.
    pub fn open(
        &mut self,
        side: PositionSide,
        bar: &Bar,
        entry_price: f64,
        size: f64,
        levels: BracketLevels,
    ) -> Result<(), EngineError> {
        if !self.position.is_flat() {
            return Err(EngineError::InvariantViolation {
                index: bar.index,
                detail: format!(
                    "entry while a {:?} position opened at bar {} is live",
                    self.position.side, self.position.opened_at_index
                ),
            });
        }
        let position = Position {
            side,
            entry_price,
            size,
            stop_price: levels.stop,
            target_price: levels.target,
            opened_at_index: bar.index,
            opened_at: Some(bar.timestamp),
            mae: 0.0,
            mfe: 0.0,
        };
        if side == PositionSide::Flat || !position.bracket_is_valid() {
            return Err(EngineError::InvariantViolation {
                index: bar.index,
                detail: format!(
                    "bracket stop={} target={} does not bracket {side:?} entry {entry_price}",
                    levels.stop, levels.target
                ),
            });
        }
        info!(
            index = bar.index,
            side = ?side,
            entry = entry_price,
            size,
            stop = levels.stop,
            target = levels.target,
            "position opened"
        );
        self.position = position;
        self.entries_taken += 1;
        Ok(())
    }

    /// Evaluate exits on `bar`. Returns the closing trade, if any.
    ///
    /// A `NaN` RSI never triggers the discretionary exit.
    pub fn on_bar(&mut self, bar: &Bar, rsi: f64) -> Option<Trade> {
        let pos = &mut self.position;
        let exit = match pos.side {
            PositionSide::Flat => return None,
            PositionSide::Long => {
                pos.record_excursion(bar.high, bar.low);
                if bar.low <= pos.stop_price {
                    Some((pos.stop_price, ExitReason::StopLoss))
                } else if bar.high >= pos.target_price {
                    Some((pos.target_price, ExitReason::TakeProfit))
                } else if rsi > self.rsi_overbought {
                    Some((bar.close, ExitReason::RsiExit))
                } else {
                    None
                }
            }
            PositionSide::Short => {
                pos.record_excursion(bar.high, bar.low);
                if bar.high >= pos.stop_price {
                    Some((pos.stop_price, ExitReason::StopLoss))
                } else if bar.low <= pos.target_price {
                    Some((pos.target_price, ExitReason::TakeProfit))
                } else if rsi < self.rsi_oversold {
                    Some((bar.close, ExitReason::RsiExit))
                } else {
                    None
                }
            }
        };
        exit.map(|(price, reason)| self.close(bar, price, reason))
    }

    /// Ratchet the stop `k` ATRs behind `close`. Never loosens, never
    /// passes the entry price.
    pub fn trail_stop(&mut self, close: f64, atr: f64, k: f64) {
        let pos = &mut self.position;
        if pos.is_flat() {
            return;
        }
        let proposed = trailing_stop(pos.side, close, atr, k);
        pos.stop_price = ratchet_stop(pos.side, pos.stop_price, proposed, pos.entry_price);
    }

    /// Close any open position at `bar.close` with `EndOfData`.
    pub fn force_close(&mut self, bar: &Bar) -> Option<Trade> {
        if self.position.is_flat() {
            return None;
        }
        Some(self.close(bar, bar.close, ExitReason::EndOfData))
    }

    fn close(&mut self, bar: &Bar, exit_price: f64, reason: ExitReason) -> Trade {
        let pos = std::mem::take(&mut self.position);
        let trade = Trade {
            entry_index: pos.opened_at_index,
            entry_timestamp: pos.opened_at,
            entry_price: pos.entry_price,
            exit_index: bar.index,
            exit_timestamp: bar.timestamp,
            exit_price,
            exit_reason: reason,
            side: pos.side,
            size: pos.size,
            pnl: pos.pnl_at(exit_price),
            bars_held: bar.index.saturating_sub(pos.opened_at_index),
            mae: pos.mae,
            mfe: pos.mfe,
        };
        info!(
            index = bar.index,
            reason = reason.as_str(),
            exit = exit_price,
            pnl = trade.pnl,
            "position closed"
        );
        trade
    }
}
