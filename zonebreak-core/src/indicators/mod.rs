//! Indicator builders.
//!
//! The replay core never computes indicators itself: it consumes an
//! [`IndicatorFeed`] of precomputed series aligned to the bar series. This
//! module provides the builders that produce such a feed.
//!
//! Every indicator is a pure function of bar history. Values inside the
//! warm-up span are `f64::NAN` and mean "not ready".

pub mod atr;
pub mod ema;
pub mod feed;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use ema::Ema;
pub use feed::{IndicatorFeed, IndicatorPeriods, MaKind};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Bar;

/// A single-series indicator.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bar t+1 or later. Every indicator must
/// pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading `NaN` values in the output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the whole series. The output has the same
    /// length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Synthetic bars from close prices, for tests.
///
/// open = previous close, high/low = body ± 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let mut bar = Bar::new(
                base + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            );
            bar.index = i;
            bar
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
