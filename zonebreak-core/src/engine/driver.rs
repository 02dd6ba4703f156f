//! BacktestDriver: replays bars in order through structure detection,
//! entry gating, sizing and the position simulator.
//!
//! Per bar `t`:
//!
//! 0. Validate the bar (NaN prices, inverted range, stale timestamp → abort)
//! 1. Fill a pending next-bar-open entry at `open[t]`
//! 2. Confirm the pivot centered at `t - pivot_window`
//! 3. Classify structure with eligible pivots only (`None` during warm-up)
//! 4. Open position: evaluate exits. Flat: gate, size and enter.
//! 5. Check the entry-count invariant, mark equity to market
//!
//! After the last bar any open position is force-closed at its close.

use super::bracket::BracketPolicy;
use super::error::EngineError;
use super::simulator::{PendingEntry, PositionSimulator};
use super::state::{RunAbort, RunDiagnostics, RunResult};
use super::summary::Summary;
use super::warmup::WarmupState;
use crate::domain::{Bar, BarSeries, PositionSide, Trade};
use crate::filter::EntryFilter;
use crate::indicators::IndicatorFeed;
use crate::params::{FillPolicy, ParamsError, StrategyParams};
use crate::sizers::{Sizer, SizingError, SizingInput};
use crate::structure::{Signal, StructureError, StructureTracker};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct BacktestDriver {
    params: StrategyParams,
    initial_equity: f64,
}

/// Mutable state owned by one replay.
struct Replay<'a> {
    driver: &'a BacktestDriver,
    bracket: BracketPolicy,
    sizer: Box<dyn Sizer>,
    filter: EntryFilter,
    tracker: StructureTracker,
    sim: PositionSimulator,
    trades: Vec<Trade>,
    equity: f64,
    diagnostics: RunDiagnostics,
}

impl BacktestDriver {
    pub fn new(params: StrategyParams, initial_equity: f64) -> Result<Self, ParamsError> {
        params.validate()?;
        if !(initial_equity > 0.0 && initial_equity.is_finite()) {
            return Err(ParamsError::NonPositive {
                field: "initial_equity",
                value: initial_equity,
            });
        }
        Ok(Self {
            params,
            initial_equity,
        })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn initial_equity(&self) -> f64 {
        self.initial_equity
    }

    /// Replay `series` with `feed`. Either the full ledger or the point of
    /// failure.
    pub fn run(&self, series: &BarSeries, feed: &IndicatorFeed) -> Result<RunResult, RunAbort> {
        if let Err(error) = feed.check_aligned(series.len()) {
            error!(%error, "indicator feed rejected");
            return Err(RunAbort {
                error,
                last_processed: None,
                trades: Vec::new(),
            });
        }

        let mut warmup = WarmupState::for_replay(self.params.pivot_window, feed, series.len());
        let mut replay = Replay {
            driver: self,
            bracket: self.params.bracket(),
            sizer: self.params.sizing.sizer(),
            filter: self.params.entry_filter(),
            tracker: StructureTracker::new(self.params.detector(), self.params.classifier()),
            sim: PositionSimulator::new(self.params.rsi_overbought, self.params.rsi_oversold),
            trades: Vec::new(),
            equity: self.initial_equity,
            diagnostics: RunDiagnostics {
                warmup_bars: warmup.warmup_bars(),
                ..Default::default()
            },
        };
        debug!(
            warmup = warmup.warmup_bars(),
            bars = series.len(),
            sizer = replay.sizer.name(),
            "replay starting"
        );

        let bars = series.as_slice();
        let mut signals = Vec::with_capacity(bars.len());
        let mut equity_curve = Vec::with_capacity(bars.len());

        for t in 0..bars.len() {
            let is_warm = warmup.is_warm();
            let signal = replay
                .step(bars, t, is_warm, feed)
                .map_err(|error| replay.abort(error, t))?;
            signals.push(signal);
            equity_curve.push(replay.mark_to_market(&bars[t]));
            warmup.process_bar();
        }

        if let Some(last) = bars.last() {
            if let Some(trade) = replay.sim.force_close(last) {
                replay.record(trade);
            }
        }
        if let Some(last_equity) = equity_curve.last_mut() {
            *last_equity = replay.equity;
        }

        let Replay {
            trades,
            mut diagnostics,
            sim,
            equity: final_equity,
            ..
        } = replay;
        diagnostics.bars_processed = bars.len();
        diagnostics.entries_taken = sim.entries_taken();
        let summary = Summary::from_ledger(&trades, &equity_curve, self.initial_equity, final_equity);
        info!(
            trades = summary.trade_count,
            total_pnl = summary.total_pnl,
            win_rate = summary.win_rate,
            "replay complete"
        );

        Ok(RunResult {
            trades,
            summary,
            equity_curve,
            signals,
            diagnostics,
        })
    }
}

impl Replay<'_> {
    fn step(
        &mut self,
        bars: &[Bar],
        t: usize,
        is_warm: bool,
        feed: &IndicatorFeed,
    ) -> Result<Signal, EngineError> {
        let bar = &bars[t];
        let previous = t.checked_sub(1).map(|p| &bars[p]);
        if let Some(defect) = bar.defect(previous) {
            return Err(EngineError::MalformedBar { index: t, defect });
        }

        // (1) next-bar-open fill
        if let Some(pending) = self.sim.take_pending() {
            self.fill(pending.side, bar, bar.open, pending.atr)?;
        }

        // (2) + (3)
        if self.tracker.confirm(&bars[..=t]).is_some() {
            self.diagnostics.pivots_confirmed += 1;
        }
        let signal = if is_warm {
            let assessment = self.tracker.assess(t, bar.close);
            for zone in [&assessment.support, &assessment.resistance] {
                if let Err(StructureError::InsufficientHistory { .. }) = zone {
                    self.diagnostics.insufficient_history_bars += 1;
                    break;
                }
            }
            assessment.signal
        } else {
            Signal::None
        };
        if signal.is_entry() {
            self.diagnostics.signals_raised += 1;
            debug!(index = t, ?signal, close = bar.close, "structure signal");
        }

        // (4) a bar that closes a position never re-enters
        if !self.sim.is_flat() {
            if let Some(trade) = self.sim.on_bar(bar, feed.rsi_at(t)) {
                self.record(trade);
            } else if let Some(k) = self.driver.params.trailing_atr_multiple {
                self.sim.trail_stop(bar.close, feed.atr_at(t), k);
            }
        } else if signal.is_entry() {
            self.try_enter(signal, bars, t, feed)?;
        }

        self.check_invariants(t)?;
        Ok(signal)
    }

    fn try_enter(
        &mut self,
        signal: Signal,
        bars: &[Bar],
        t: usize,
        feed: &IndicatorFeed,
    ) -> Result<(), EngineError> {
        let verdict = self.filter.evaluate(signal, &bars[..=t], feed);
        if !verdict.is_passed() {
            self.diagnostics.entries_filtered += 1;
            debug!(index = t, ?verdict, "entry filtered");
            return Ok(());
        }
        let side = match signal {
            Signal::BreakoutLong => PositionSide::Long,
            Signal::BreakoutShort => PositionSide::Short,
            Signal::None => return Ok(()),
        };
        let atr = feed.atr_at(t);

        match self.driver.params.fill_policy {
            FillPolicy::SameBarClose => self.fill(side, &bars[t], bars[t].close, atr),
            FillPolicy::NextBarOpen if t + 1 < bars.len() => {
                self.sim.set_pending(PendingEntry {
                    side,
                    signal_index: t,
                    atr,
                });
                Ok(())
            }
            FillPolicy::NextBarOpen => {
                self.diagnostics.pending_dropped += 1;
                warn!(index = t, ?side, "next-bar-open entry dropped: no following bar");
                Ok(())
            }
        }
    }

    /// Size and open a position at `price` on `bar`. Sizing failures and
    /// unplaceable brackets skip the entry.
    fn fill(&mut self, side: PositionSide, bar: &Bar, price: f64, atr: f64) -> Result<(), EngineError> {
        let input = SizingInput {
            equity: self.equity,
            risk_fraction: self.driver.params.risk_fraction,
            atr,
            price,
        };
        let quantity = match self.sizer.size(&input) {
            Ok(q) if q > 0.0 => q,
            Ok(_) => {
                self.diagnostics.entries_skipped += 1;
                debug!(
                    index = bar.index,
                    equity = self.equity,
                    sizer = self.sizer.name(),
                    "entry skipped: zero size"
                );
                return Ok(());
            }
            Err(SizingError::InvalidSizingInput { atr, price }) => {
                self.diagnostics.entries_skipped += 1;
                warn!(
                    index = bar.index,
                    atr,
                    price,
                    sizer = self.sizer.name(),
                    "entry skipped: invalid sizing input"
                );
                return Ok(());
            }
        };
        let levels = self.bracket.levels(side, price, atr);
        if !levels.brackets(side, price) {
            self.diagnostics.entries_skipped += 1;
            warn!(
                index = bar.index,
                price,
                atr,
                stop = levels.stop,
                target = levels.target,
                "entry skipped: bracket collapses onto entry"
            );
            return Ok(());
        }
        self.sim.open(side, bar, price, quantity, levels)
    }

    fn record(&mut self, trade: Trade) {
        self.equity += trade.pnl;
        self.trades.push(trade);
    }

    fn check_invariants(&self, t: usize) -> Result<(), EngineError> {
        let open = usize::from(!self.sim.is_flat());
        if self.trades.len() + open != self.sim.entries_taken() {
            return Err(EngineError::InvariantViolation {
                index: t,
                detail: format!(
                    "{} trades + {open} open != {} entries",
                    self.trades.len(),
                    self.sim.entries_taken()
                ),
            });
        }
        if !self.sim.position().bracket_is_valid() {
            return Err(EngineError::InvariantViolation {
                index: t,
                detail: "stop/target no longer bracket the entry".to_string(),
            });
        }
        Ok(())
    }

    fn mark_to_market(&self, bar: &Bar) -> f64 {
        let pos = self.sim.position();
        if pos.is_flat() {
            self.equity
        } else {
            self.equity + pos.pnl_at(bar.close)
        }
    }

    fn abort(&mut self, error: EngineError, t: usize) -> RunAbort {
        let last_processed = t.checked_sub(1);
        error!(%error, ?last_processed, "replay aborted");
        RunAbort {
            error,
            last_processed,
            trades: std::mem::take(&mut self.trades),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarDefect;
    use crate::engine::bracket::BracketMode;
    use chrono::{Duration, NaiveDate};

    fn series_from_closes(closes: &[f64]) -> BarSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        BarSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar::new(base + Duration::days(i as i64), c, c + 0.5, c - 0.5, c, 1.0))
                .collect(),
        )
    }

    fn params() -> StrategyParams {
        StrategyParams {
            pivot_window: 2,
            zone_tolerance: 0.05,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_invalid_params_and_equity() {
        let bad = StrategyParams {
            zone_tolerance: -1.0,
            ..Default::default()
        };
        assert!(BacktestDriver::new(bad, 10_000.0).is_err());
        assert!(BacktestDriver::new(params(), 0.0).is_err());
    }

    #[test]
    fn misaligned_feed_aborts_before_any_bar() {
        let series = series_from_closes(&[10.0; 8]);
        let feed = IndicatorFeed::constant(7, 10.0, 50.0, 1.0);
        let abort = BacktestDriver::new(params(), 10_000.0)
            .unwrap()
            .run(&series, &feed)
            .unwrap_err();
        assert!(matches!(abort.error, EngineError::FeedMisaligned { .. }));
        assert_eq!(abort.last_processed, None);
    }

    #[test]
    fn nan_bar_aborts_with_index() {
        let mut bars: Vec<Bar> = series_from_closes(&[10.0; 8]).iter().cloned().collect();
        bars[5].close = f64::NAN;
        let series = BarSeries::new(bars);
        let feed = IndicatorFeed::constant(8, 10.0, 50.0, 1.0);
        let abort = BacktestDriver::new(params(), 10_000.0)
            .unwrap()
            .run(&series, &feed)
            .unwrap_err();
        assert_eq!(
            abort.error,
            EngineError::MalformedBar {
                index: 5,
                defect: BarDefect::NanPrice
            }
        );
        assert_eq!(abort.last_processed, Some(4));
    }

    #[test]
    fn flat_market_trades_nothing() {
        let series = series_from_closes(&[10.0; 30]);
        let feed = IndicatorFeed::constant(30, 10.0, 50.0, 1.0);
        let result = BacktestDriver::new(params(), 10_000.0)
            .unwrap()
            .run(&series, &feed)
            .unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.signals.len(), 30);
        assert_eq!(result.equity_curve.len(), 30);
        assert_eq!(result.summary.final_equity, 10_000.0);
        assert_eq!(result.summary.max_drawdown, Some(0.0));
    }

    #[test]
    fn collapsed_bracket_skips_entry() {
        // floors at 2, 7 and 12, then a breakdown at 19, all around 6e7
        let mut closes = Vec::new();
        for _ in 0..3 {
            closes.extend_from_slice(&[8.0, 7.0, 6.0, 7.0, 8.0]);
        }
        closes.extend_from_slice(&[8.0, 7.5, 7.0, 6.5, 5.6, 5.6]);
        let closes: Vec<f64> = closes.iter().map(|c| c * 1e7).collect();
        let series = series_from_closes(&closes);
        let feed = IndicatorFeed::constant(series.len(), 7e7, 50.0, 1e-12);
        let params = StrategyParams {
            pivot_window: 2,
            zone_tolerance: 5e5,
            bracket_mode: BracketMode::Atr,
            stop_multiple: 1.5,
            target_multiple: 3.0,
            ..Default::default()
        };
        let result = BacktestDriver::new(params, 10_000.0)
            .unwrap()
            .run(&series, &feed)
            .unwrap();
        assert_eq!(result.signals[19], Signal::BreakoutShort);
        assert!(result.trades.is_empty());
        assert!(result.diagnostics.entries_skipped >= 1);
        assert_eq!(result.diagnostics.entries_taken, 0);
    }

    #[test]
    fn empty_series_is_an_empty_result() {
        let result = BacktestDriver::new(params(), 1_000.0)
            .unwrap()
            .run(&BarSeries::default(), &IndicatorFeed::default())
            .unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.summary.max_drawdown, None);
    }
}
