//! PivotDetector: local-extremum classification over a centered window.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// What kind of local extremum a bar is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
    /// Both the high and the low are window extrema.
    Both,
    None,
}

impl PivotKind {
    /// A pure swing high. `Both` bars are ambiguous and join no zone.
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    pub fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }
}

/// Classification of one bar. Derived purely from a bounded window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: usize,
    pub kind: PivotKind,
    pub high: f64,
    pub low: f64,
}

impl Pivot {
    pub fn none(index: usize) -> Self {
        Self {
            index,
            kind: PivotKind::None,
            high: f64::NAN,
            low: f64::NAN,
        }
    }

    /// Price this pivot contributes to a resistance zone.
    pub fn resistance_price(&self) -> Option<f64> {
        self.kind.is_high().then_some(self.high)
    }

    /// Price this pivot contributes to a support zone.
    pub fn support_price(&self) -> Option<f64> {
        self.kind.is_low().then_some(self.low)
    }
}

/// Classifies bars as pivots over `[center - window, center + window]`.
///
/// The detector itself is not causal: it reads `window` bars after the
/// center. Callers replaying bars must only query
/// `center <= current_index - window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotDetector {
    window: usize,
}

impl PivotDetector {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Classify the bar at `center`. Returns a `None`-kind pivot when the
    /// window does not fit inside `bars`.
    pub fn classify(&self, bars: &[Bar], center: usize) -> Pivot {
        let w = self.window;
        if center < w || center + w >= bars.len() {
            return Pivot::none(center);
        }

        let pivot_bar = &bars[center];
        let window = &bars[center - w..=center + w];
        let is_high = window.iter().all(|b| pivot_bar.high >= b.high);
        let is_low = window.iter().all(|b| pivot_bar.low <= b.low);

        let kind = match (is_high, is_low) {
            (true, true) => PivotKind::Both,
            (true, false) => PivotKind::High,
            (false, true) => PivotKind::Low,
            (false, false) => PivotKind::None,
        };
        Pivot {
            index: center,
            kind,
            high: pivot_bar.high,
            low: pivot_bar.low,
        }
    }
}
