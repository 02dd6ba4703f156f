//! BarSeries: ordered, append-only sequence of bars.

use super::bar::{Bar, BarDefect};
use serde::{Deserialize, Serialize};

/// Ordered bar sequence with windowed read access.
///
/// The series assigns `Bar::index` on append. It does not reject defective
/// bars: the replay driver checks each bar as it reaches it so that a fatal
/// abort can report the exact offending index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Self {
        let mut series = Self {
            bars: Vec::with_capacity(bars.len()),
        };
        for bar in bars {
            series.push(bar);
        }
        series
    }

    /// Append a bar, stamping its index.
    pub fn push(&mut self, mut bar: Bar) {
        bar.index = self.bars.len();
        self.bars.push(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    /// Causal view: every bar up to and including `index`.
    ///
    /// Saturates at the end of the series.
    pub fn up_to(&self, index: usize) -> &[Bar] {
        let end = (index + 1).min(self.bars.len());
        &self.bars[..end]
    }

    /// First defective bar, if any. Used by loaders for early diagnostics.
    pub fn first_defect(&self) -> Option<(usize, BarDefect)> {
        let mut previous: Option<&Bar> = None;
        for bar in &self.bars {
            if let Some(defect) = bar.defect(previous) {
                return Some((bar.index, defect));
            }
            previous = Some(bar);
        }
        None
    }
}
