//! Entry filters: gate structure signals before an entry is attempted.
//!
//! Filters only look at market data and the indicator feed up to the
//! current bar, never at position state.

use crate::domain::Bar;
use crate::indicators::IndicatorFeed;
use crate::structure::Signal;
use serde::{Deserialize, Serialize};

/// Which sides may be traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    #[default]
    LongShort,
    LongOnly,
    ShortOnly,
}

impl TradingMode {
    pub fn allows(self, signal: Signal) -> bool {
        match (self, signal) {
            (_, Signal::None) => false,
            (Self::LongShort, _) => true,
            (Self::LongOnly, Signal::BreakoutLong) => true,
            (Self::ShortOnly, Signal::BreakoutShort) => true,
            _ => false,
        }
    }
}

/// Trend regime required for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendFilter {
    #[default]
    None,
    /// Longs only when fast MA > slow MA, shorts only when fast MA < slow MA.
    MaRegime,
    /// Longs only when each of the last `backcandles + 1` candle bodies sits
    /// strictly above the fast MA; shorts only when strictly below.
    EmaBand { backcandles: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterVerdict {
    Passed,
    FilteredBySide,
    FilteredByRegime,
    FilteredByRsiGuard,
}

impl FilterVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Combined side, trend and RSI entry gate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntryFilter {
    pub trading_mode: TradingMode,
    pub trend_filter: TrendFilter,
    /// Longs only when RSI is below this value.
    pub entry_rsi_ceiling: Option<f64>,
    /// Shorts only when RSI is above this value.
    pub entry_rsi_floor: Option<f64>,
}

impl EntryFilter {
    /// Evaluate `signal` raised on the last bar of `bars`.
    pub fn evaluate(&self, signal: Signal, bars: &[Bar], feed: &IndicatorFeed) -> FilterVerdict {
        if !self.trading_mode.allows(signal) {
            return FilterVerdict::FilteredBySide;
        }
        let Some(index) = bars.len().checked_sub(1) else {
            return FilterVerdict::FilteredByRegime;
        };
        let long = signal == Signal::BreakoutLong;

        if !self.trend_allows(long, bars, feed) {
            return FilterVerdict::FilteredByRegime;
        }

        let rsi = feed.rsi_at(index);
        let guard_ok = match (long, self.entry_rsi_ceiling, self.entry_rsi_floor) {
            (true, Some(ceiling), _) => rsi < ceiling,
            (false, _, Some(floor)) => rsi > floor,
            _ => true,
        };
        if !guard_ok {
            return FilterVerdict::FilteredByRsiGuard;
        }
        FilterVerdict::Passed
    }

    fn trend_allows(&self, long: bool, bars: &[Bar], feed: &IndicatorFeed) -> bool {
        let index = bars.len() - 1;
        match self.trend_filter {
            TrendFilter::None => true,
            TrendFilter::MaRegime => {
                let fast = feed.fast_ma_at(index);
                let slow = feed.slow_ma_at(index);
                if long {
                    fast > slow
                } else {
                    fast < slow
                }
            }
            TrendFilter::EmaBand { backcandles } => {
                let Some(start) = index.checked_sub(backcandles) else {
                    return false;
                };
                (start..=index).all(|i| {
                    let bar = &bars[i];
                    let ma = feed.fast_ma_at(i);
                    if long {
                        bar.body_low() > ma
                    } else {
                        bar.body_high() < ma
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn feed_with(len: usize, fast: f64, slow: f64, rsi: f64) -> IndicatorFeed {
        IndicatorFeed {
            fast_ma: vec![fast; len],
            slow_ma: vec![slow; len],
            rsi: vec![rsi; len],
            atr: vec![1.0; len],
        }
    }

    #[test]
    fn trading_mode_gates_sides() {
        assert!(TradingMode::LongShort.allows(Signal::BreakoutShort));
        assert!(TradingMode::LongOnly.allows(Signal::BreakoutLong));
        assert!(!TradingMode::LongOnly.allows(Signal::BreakoutShort));
        assert!(!TradingMode::ShortOnly.allows(Signal::BreakoutLong));
        assert!(!TradingMode::LongShort.allows(Signal::None));
    }

    #[test]
    fn default_filter_passes_everything() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let feed = feed_with(3, 1.0, 2.0, 90.0);
        let verdict = EntryFilter::default().evaluate(Signal::BreakoutLong, &bars, &feed);
        assert!(verdict.is_passed());
    }

    #[test]
    fn ma_regime() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let filter = EntryFilter {
            trend_filter: TrendFilter::MaRegime,
            ..Default::default()
        };
        let uptrend = feed_with(3, 12.0, 10.0, 50.0);
        assert!(filter.evaluate(Signal::BreakoutLong, &bars, &uptrend).is_passed());
        assert_eq!(
            filter.evaluate(Signal::BreakoutShort, &bars, &uptrend),
            FilterVerdict::FilteredByRegime
        );
        let not_ready = feed_with(3, f64::NAN, 10.0, 50.0);
        assert!(!filter.evaluate(Signal::BreakoutLong, &bars, &not_ready).is_passed());
    }

    #[test]
    fn ema_band_requires_every_body_on_one_side() {
        // bodies span [open, close] = [prev close, close]; lowest body low is 10
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        let filter = EntryFilter {
            trend_filter: TrendFilter::EmaBand { backcandles: 2 },
            ..Default::default()
        };
        // bars 1..=3 have body lows 10, 11, 12
        assert!(filter
            .evaluate(Signal::BreakoutLong, &bars, &feed_with(4, 9.5, 0.0, 50.0))
            .is_passed());
        assert!(!filter
            .evaluate(Signal::BreakoutLong, &bars, &feed_with(4, 10.0, 0.0, 50.0))
            .is_passed());
        // not enough bars for the band
        assert!(!filter
            .evaluate(Signal::BreakoutLong, &bars[..2], &feed_with(4, 0.0, 0.0, 50.0))
            .is_passed());
        assert!(filter
            .evaluate(Signal::BreakoutShort, &bars, &feed_with(4, 20.0, 0.0, 50.0))
            .is_passed());
    }

    #[test]
    fn rsi_guard() {
        let bars = make_bars(&[10.0, 11.0]);
        let filter = EntryFilter {
            entry_rsi_ceiling: Some(70.0),
            entry_rsi_floor: Some(30.0),
            ..Default::default()
        };
        let hot = feed_with(2, 0.0, 0.0, 75.0);
        let cold = feed_with(2, 0.0, 0.0, 25.0);
        assert_eq!(
            filter.evaluate(Signal::BreakoutLong, &bars, &hot),
            FilterVerdict::FilteredByRsiGuard
        );
        assert!(filter.evaluate(Signal::BreakoutShort, &bars, &hot).is_passed());
        assert!(filter.evaluate(Signal::BreakoutLong, &bars, &cold).is_passed());
        assert_eq!(
            filter.evaluate(Signal::BreakoutShort, &bars, &cold),
            FilterVerdict::FilteredByRsiGuard
        );
    }
}
