//! Average True Range with Wilder smoothing.
//!
//! TR[t] = max(high - low, |high - prev_close|, |low - prev_close|).
//! The first bar has no previous close, so its TR is not used and the
//! smoothing seed is the mean of TR[1..=period]. Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    /// `period` is clamped to at least 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range per bar; index 0 is `NaN`.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for (i, pair) in bars.windows(2).enumerate() {
        let (prev, bar) = (&pair[0], &pair[1]);
        let pc = prev.close;
        if bar.high.is_nan() || bar.low.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i + 1] = (bar.high - bar.low)
            .max((bar.high - pc).abs())
            .max((bar.low - pc).abs());
    }
    tr
}

/// Wilder smoothing (alpha = 1/period) seeded with the mean of the first
/// `period` values starting at `start`. A `NaN` after the seed ends the output.
pub fn wilder_smooth(values: &[f64], period: usize, start: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < start + period {
        return result;
    }

    let seed_window = &values[start..start + period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[start + period - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in (start + period)..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::{Duration, NaiveDate};

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| Bar::new(base + Duration::days(i as i64), o, h, l, c, 1000.0))
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // max(9, 1, 8) = 9
        ]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        assert_approx(true_range(&bars)[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_2() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR 8
            (106.0, 107.0, 98.0, 99.0),   // TR 9
            (99.0, 103.0, 97.0, 100.0),   // TR 6
        ]);
        let atr = Atr::new(2).compute(&bars);
        assert!(atr[0].is_nan());
        assert!(atr[1].is_nan());
        assert_approx(atr[2], 8.5, DEFAULT_EPSILON);
        assert_approx(atr[3], 0.5 * 6.0 + 0.5 * 8.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_lookback_matches_first_value() {
        let data: Vec<_> = (0..30)
            .map(|i| {
                let c = 100.0 + i as f64;
                (c, c + 2.0, c - 2.0, c + 0.5)
            })
            .collect();
        let atr = Atr::new(14);
        let values = atr.compute(&make_ohlc_bars(&data));
        let first = values.iter().position(|v| !v.is_nan());
        assert_eq!(first, Some(atr.lookback()));
    }
}
