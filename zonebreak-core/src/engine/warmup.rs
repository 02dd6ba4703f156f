//! Warm-up span: bars on which no trading decision is made.

use crate::indicators::IndicatorFeed;

/// Warm-up state tracker.
#[derive(Debug, Clone)]
pub struct WarmupState {
    warmup_bars: usize,
    bars_processed: usize,
}

impl WarmupState {
    pub fn new(warmup_bars: usize) -> Self {
        Self {
            warmup_bars,
            bars_processed: 0,
        }
    }

    /// `max(pivot_window, indicator warm-up)`. A feed that never becomes
    /// ready keeps the whole series in warm-up.
    pub fn for_replay(pivot_window: usize, feed: &IndicatorFeed, series_len: usize) -> Self {
        let indicator_warmup = feed.warmup().unwrap_or(series_len);
        Self::new(pivot_window.max(indicator_warmup))
    }

    pub fn warmup_bars(&self) -> usize {
        self.warmup_bars
    }

    pub fn process_bar(&mut self) {
        self.bars_processed += 1;
    }

    /// Whether the bar about to be processed is past the warm-up.
    pub fn is_warm(&self) -> bool {
        self.bars_processed >= self.warmup_bars
    }
}
