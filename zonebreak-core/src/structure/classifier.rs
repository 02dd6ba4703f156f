//! StructureClassifier: zone aggregation and breakout detection.

use super::pivot::Pivot;
use super::ring::PivotRing;
use super::zone::{Zone, ZoneKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structure signal for one bar. At most one per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signal {
    #[default]
    None,
    /// Close cleared a tight resistance zone.
    BreakoutLong,
    /// Close fell through a tight support zone.
    BreakoutShort,
}

impl Signal {
    pub fn is_entry(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Recoverable structure errors. The bar evaluates to [`Signal::None`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("insufficient {kind} history: {have} eligible pivots, need {need}")]
    InsufficientHistory {
        kind: ZoneKind,
        have: usize,
        need: usize,
    },
}

/// Confirmed pivot history, one bounded ring per zone kind.
///
/// `Both` pivots are dropped: only pure highs and pure lows form zones.
#[derive(Debug, Clone)]
pub struct PivotHistory {
    pub highs: PivotRing,
    pub lows: PivotRing,
}

impl PivotHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            highs: PivotRing::with_capacity(capacity),
            lows: PivotRing::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, pivot: Pivot) {
        if pivot.kind.is_high() {
            self.highs.push(pivot);
        }
        if pivot.kind.is_low() {
            self.lows.push(pivot);
        }
    }

    fn ring(&self, kind: ZoneKind) -> &PivotRing {
        match kind {
            ZoneKind::Support => &self.lows,
            ZoneKind::Resistance => &self.highs,
        }
    }
}

/// Both zones as seen from one bar, plus the resulting signal.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureAssessment {
    pub support: Result<Zone, StructureError>,
    pub resistance: Result<Zone, StructureError>,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureClassifier {
    /// Pivots per zone.
    pub zone_lookback: usize,
    /// Absolute tightness tolerance ε.
    pub tolerance: f64,
    /// Breakout threshold in units of ε.
    pub breakout_multiplier: f64,
    /// Bars a pivot must age before it is eligible (the pivot window).
    pub lag: usize,
    /// Oldest eligible pivot, in bars before `current_index - lag`.
    pub structure_lookback: usize,
}

impl StructureClassifier {
    /// Whether a pivot may feed a zone evaluated at `current_index`.
    ///
    /// It must be strictly older than `current_index - lag` and no older than
    /// `current_index - lag - structure_lookback`.
    pub fn is_eligible(&self, pivot: &Pivot, current_index: usize) -> bool {
        let newest_allowed = pivot.index + self.lag < current_index;
        let within_horizon = pivot.index + self.lag + self.structure_lookback >= current_index;
        newest_allowed && within_horizon
    }

    /// Zone of `kind` built from the most recent eligible pivots.
    pub fn zone(
        &self,
        history: &PivotHistory,
        kind: ZoneKind,
        current_index: usize,
    ) -> Result<Zone, StructureError> {
        let mut prices: Vec<f64> = history
            .ring(kind)
            .iter()
            .rev()
            .filter(|p| self.is_eligible(p, current_index))
            .filter_map(|p| match kind {
                ZoneKind::Support => p.support_price(),
                ZoneKind::Resistance => p.resistance_price(),
            })
            .take(self.zone_lookback)
            .collect();

        if prices.len() < self.zone_lookback {
            return Err(StructureError::InsufficientHistory {
                kind,
                have: prices.len(),
                need: self.zone_lookback,
            });
        }
        prices.reverse();
        Ok(Zone::from_prices(kind, prices, self.tolerance))
    }

    pub fn assess(
        &self,
        history: &PivotHistory,
        current_index: usize,
        current_close: f64,
    ) -> StructureAssessment {
        let support = self.zone(history, ZoneKind::Support, current_index);
        let resistance = self.zone(history, ZoneKind::Resistance, current_index);
        let threshold = self.breakout_multiplier * self.tolerance;
        let broken = |zone: &Result<Zone, StructureError>| {
            zone.as_ref()
                .is_ok_and(|z| z.is_tight && z.clearance(current_close) > threshold)
        };

        // support breakdown first
        let signal = if broken(&support) {
            Signal::BreakoutShort
        } else if broken(&resistance) {
            Signal::BreakoutLong
        } else {
            Signal::None
        };

        StructureAssessment {
            support,
            resistance,
            signal,
        }
    }

    pub fn evaluate(
        &self,
        history: &PivotHistory,
        current_index: usize,
        current_close: f64,
    ) -> Signal {
        self.assess(history, current_index, current_close).signal
    }
}
