//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar at a single position of a [`BarSeries`](super::BarSeries).
///
/// `index` is assigned by the series on append and always equals the bar's
/// position in it. Bars are immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a bar cannot be replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BarDefect {
    #[error("NaN in OHLC prices")]
    NanPrice,
    #[error("high is below low")]
    InvertedRange,
    #[error("timestamp does not increase strictly")]
    NonMonotonicTimestamp,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            index: 0,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Upper edge of the candle body.
    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Lower edge of the candle body.
    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Integrity check used during replay.
    ///
    /// Only defects the engine cannot paper over are reported: NaN prices, an
    /// inverted high/low range, and a timestamp that fails to advance past the
    /// previous bar's.
    pub fn defect(&self, previous: Option<&Bar>) -> Option<BarDefect> {
        if self.is_void() {
            return Some(BarDefect::NanPrice);
        }
        if self.high < self.low {
            return Some(BarDefect::InvertedRange);
        }
        match previous {
            Some(prev) if self.timestamp <= prev.timestamp => {
                Some(BarDefect::NonMonotonicTimestamp)
            }
            _ => None,
        }
    }
}
