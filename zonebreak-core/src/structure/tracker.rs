//! StructureTracker: online, causal pivot confirmation and classification.

use super::classifier::{PivotHistory, Signal, StructureAssessment, StructureClassifier};
use super::pivot::{Pivot, PivotDetector, PivotKind};
use crate::domain::Bar;
use tracing::debug;

/// Streams bars through the [`PivotDetector`] and [`StructureClassifier`].
///
/// On each bar `t` the tracker confirms the pivot centered at `t - window`
/// (the newest bar whose full window is known), records it, and classifies
/// the structure using only pivots the classifier deems eligible.
#[derive(Debug, Clone)]
pub struct StructureTracker {
    detector: PivotDetector,
    classifier: StructureClassifier,
    history: PivotHistory,
}

impl StructureTracker {
    pub fn new(detector: PivotDetector, classifier: StructureClassifier) -> Self {
        // one spare slot for the pivot confirmed on the current bar
        let history = PivotHistory::new(classifier.zone_lookback + 1);
        Self {
            detector,
            classifier,
            history,
        }
    }

    pub fn history(&self) -> &PivotHistory {
        &self.history
    }

    /// Confirm the pivot that became knowable with the last bar of `bars`.
    ///
    /// `bars` must be the causal prefix of the series ending at the current
    /// replay index.
    pub fn confirm(&mut self, bars: &[Bar]) -> Option<Pivot> {
        let window = self.detector.window();
        let current = bars.len().checked_sub(1)?;
        let center = current.checked_sub(window)?;
        let pivot = self.detector.classify(bars, center);
        if pivot.kind == PivotKind::None {
            return None;
        }
        debug!(index = pivot.index, kind = ?pivot.kind, confirmed_at = current, "pivot confirmed");
        self.history.record(pivot);
        Some(pivot)
    }

    pub fn assess(&self, current_index: usize, current_close: f64) -> StructureAssessment {
        self.classifier
            .assess(&self.history, current_index, current_close)
    }

    /// Confirm, then classify the last bar of `bars`.
    pub fn on_bar(&mut self, bars: &[Bar]) -> Signal {
        self.confirm(bars);
        match bars.last() {
            Some(bar) => self.assess(bars.len() - 1, bar.close).signal,
            None => Signal::None,
        }
    }
}
