//! IndicatorFeed: per-bar indicator values aligned to a bar series.

use super::{Atr, Ema, Indicator, Rsi, Sma};
use crate::domain::BarSeries;
use crate::engine::EngineError;
use serde::{Deserialize, Serialize};

/// Moving-average flavour used for the fast/slow pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaKind {
    Sma,
    #[default]
    Ema,
}

/// Periods for the indicators the replay consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPeriods {
    pub ma_kind: MaKind,
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub rsi: usize,
    pub atr: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            ma_kind: MaKind::Ema,
            fast_ma: 50,
            slow_ma: 200,
            rsi: 14,
            atr: 14,
        }
    }
}

/// Precomputed indicator series, index-aligned with the [`BarSeries`].
///
/// `NaN` marks a value that is not ready yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFeed {
    pub fast_ma: Vec<f64>,
    pub slow_ma: Vec<f64>,
    pub rsi: Vec<f64>,
    pub atr: Vec<f64>,
}

impl IndicatorFeed {
    /// Build every series from the bar history.
    pub fn compute(series: &BarSeries, periods: &IndicatorPeriods) -> Self {
        let bars = series.as_slice();
        let ma = |period: usize| -> Vec<f64> {
            match periods.ma_kind {
                MaKind::Sma => Sma::new(period).compute(bars),
                MaKind::Ema => Ema::new(period).compute(bars),
            }
        };
        Self {
            fast_ma: ma(periods.fast_ma),
            slow_ma: ma(periods.slow_ma),
            rsi: Rsi::new(periods.rsi).compute(bars),
            atr: Atr::new(periods.atr).compute(bars),
        }
    }

    /// A feed holding the same values on every bar. Handy for scripted replays.
    pub fn constant(len: usize, ma: f64, rsi: f64, atr: f64) -> Self {
        Self {
            fast_ma: vec![ma; len],
            slow_ma: vec![ma; len],
            rsi: vec![rsi; len],
            atr: vec![atr; len],
        }
    }

    /// Every series must have exactly `expected` values.
    pub fn check_aligned(&self, expected: usize) -> Result<(), EngineError> {
        for (name, values) in self.named_series() {
            if values.len() != expected {
                return Err(EngineError::FeedMisaligned {
                    series: name,
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }

    /// First index at which every series holds a value, or `None` if the feed
    /// never becomes ready.
    pub fn warmup(&self) -> Option<usize> {
        let len = self.named_series().map(|(_, v)| v.len()).min()?;
        (0..len).find(|&i| self.is_ready(i))
    }

    pub fn is_ready(&self, index: usize) -> bool {
        self.named_series()
            .all(|(_, v)| v.get(index).is_some_and(|x| !x.is_nan()))
    }

    pub fn fast_ma_at(&self, index: usize) -> f64 {
        value_at(&self.fast_ma, index)
    }

    pub fn slow_ma_at(&self, index: usize) -> f64 {
        value_at(&self.slow_ma, index)
    }

    pub fn rsi_at(&self, index: usize) -> f64 {
        value_at(&self.rsi, index)
    }

    pub fn atr_at(&self, index: usize) -> f64 {
        value_at(&self.atr, index)
    }

    fn named_series(&self) -> impl Iterator<Item = (&'static str, &Vec<f64>)> {
        [
            ("fast_ma", &self.fast_ma),
            ("slow_ma", &self.slow_ma),
            ("rsi", &self.rsi),
            ("atr", &self.atr),
        ]
        .into_iter()
    }
}

fn value_at(values: &[f64], index: usize) -> f64 {
    values.get(index).copied().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn series(n: usize) -> BarSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i % 7) as f64).collect();
        BarSeries::new(make_bars(&closes))
    }

    #[test]
    fn compute_is_aligned() {
        let s = series(40);
        let periods = IndicatorPeriods {
            fast_ma: 5,
            slow_ma: 10,
            ..Default::default()
        };
        let feed = IndicatorFeed::compute(&s, &periods);
        assert!(feed.check_aligned(40).is_ok());
        // slowest series: ATR/RSI 14 → ready at 14
        assert_eq!(feed.warmup(), Some(14));
    }

    #[test]
    fn warmup_none_when_never_ready() {
        let feed = IndicatorFeed::compute(&series(30), &IndicatorPeriods::default());
        assert_eq!(feed.warmup(), None);
    }

    #[test]
    fn misaligned_feed_is_reported() {
        let mut feed = IndicatorFeed::constant(10, 100.0, 50.0, 1.0);
        feed.rsi.pop();
        match feed.check_aligned(10) {
            Err(EngineError::FeedMisaligned {
                series,
                expected,
                actual,
            }) => {
                assert_eq!(series, "rsi");
                assert_eq!(expected, 10);
                assert_eq!(actual, 9);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_reads_are_nan() {
        let feed = IndicatorFeed::constant(3, 100.0, 50.0, 1.0);
        assert_eq!(feed.atr_at(2), 1.0);
        assert!(feed.atr_at(3).is_nan());
        assert!(!feed.is_ready(3));
    }
}
