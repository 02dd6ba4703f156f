//! Parameter sweeps over the structure and bracket settings.
//!
//! Each grid point is an independent replay over the same bars and feed.
//! Runs execute in parallel with rayon; a single replay is always sequential.
//! Results come back in grid order whatever the scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zonebreak_core::domain::BarSeries;
use zonebreak_core::engine::Summary;
use zonebreak_core::fingerprint::Digest;
use zonebreak_core::indicators::IndicatorFeed;
use zonebreak_core::params::StrategyParams;

use crate::metrics::PerformanceMetrics;
use crate::runner::run_backtest_with_feed;

/// Values to sweep for each parameter. An empty list keeps the base value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub pivot_windows: Vec<usize>,
    pub zone_tolerances: Vec<f64>,
    pub stop_multiples: Vec<f64>,
    pub target_multiples: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::around(&StrategyParams::default())
    }
}

impl ParamGrid {
    /// A small grid centred on `base`: pivot window ±2, tolerance ×0.5/×1/×2,
    /// stop ×1 and target at 1.5/2/3 times the stop.
    pub fn around(base: &StrategyParams) -> Self {
        let w = base.pivot_window;
        let eps = base.zone_tolerance;
        let stop = base.stop_multiple;
        Self {
            pivot_windows: vec![w.saturating_sub(2).max(1), w, w + 2],
            zone_tolerances: vec![eps * 0.5, eps, eps * 2.0],
            stop_multiples: vec![stop],
            target_multiples: vec![stop * 1.5, stop * 2.0, stop * 3.0],
        }
    }

    /// Number of grid points (empty axes count as one).
    pub fn size(&self) -> usize {
        [
            self.pivot_windows.len(),
            self.zone_tolerances.len(),
            self.stop_multiples.len(),
            self.target_multiples.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }

    /// Every parameter combination, in a fixed nesting order.
    pub fn generate(&self, base: &StrategyParams) -> Vec<StrategyParams> {
        fn axis<T: Copy>(values: &[T], base: T) -> Vec<T> {
            if values.is_empty() {
                vec![base]
            } else {
                values.to_vec()
            }
        }

        let mut out = Vec::with_capacity(self.size());
        for &pivot_window in &axis(&self.pivot_windows, base.pivot_window) {
            for &zone_tolerance in &axis(&self.zone_tolerances, base.zone_tolerance) {
                for &stop_multiple in &axis(&self.stop_multiples, base.stop_multiple) {
                    for &target_multiple in &axis(&self.target_multiples, base.target_multiple) {
                        out.push(StrategyParams {
                            pivot_window,
                            zone_tolerance,
                            stop_multiple,
                            target_multiple,
                            ..base.clone()
                        });
                    }
                }
            }
        }
        out
    }
}

/// One completed grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Position in grid order.
    pub index: usize,
    pub params: StrategyParams,
    pub summary: Summary,
    pub metrics: PerformanceMetrics,
    pub ledger_hash: Digest,
}

/// A grid point that could not run (invalid parameters or an abort).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub index: usize,
    pub params: StrategyParams,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    pub points: Vec<SweepPoint>,
    pub failures: Vec<SweepFailure>,
}

impl SweepResults {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points ranked by total pnl, best first. Ties keep grid order.
    pub fn ranked(&self) -> Vec<&SweepPoint> {
        let mut ranked: Vec<&SweepPoint> = self.points.iter().collect();
        ranked.sort_by(|a, b| {
            b.summary
                .total_pnl
                .total_cmp(&a.summary.total_pnl)
                .then(a.index.cmp(&b.index))
        });
        ranked
    }

    pub fn best(&self) -> Option<&SweepPoint> {
        self.ranked().into_iter().next()
    }
}

/// Sweep executor over one series and its precomputed feed.
pub struct ParamSweep<'a> {
    series: &'a BarSeries,
    feed: &'a IndicatorFeed,
    initial_equity: f64,
    parallel: bool,
}

impl<'a> ParamSweep<'a> {
    pub fn new(series: &'a BarSeries, feed: &'a IndicatorFeed, initial_equity: f64) -> Self {
        Self {
            series,
            feed,
            initial_equity,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn run_point(&self, index: usize, params: StrategyParams) -> Result<SweepPoint, SweepFailure> {
        match run_backtest_with_feed(&params, self.series, self.feed, self.initial_equity) {
            Ok(result) => {
                debug!(index, pnl = result.summary.total_pnl, "sweep point done");
                Ok(SweepPoint {
                    index,
                    params,
                    summary: result.summary,
                    metrics: result.metrics,
                    ledger_hash: result.fingerprint.ledger_hash,
                })
            }
            Err(e) => {
                warn!(index, error = %e, "sweep point failed");
                Err(SweepFailure {
                    index,
                    params,
                    error: e.to_string(),
                })
            }
        }
    }

    pub fn sweep(&self, grid: &ParamGrid, base: &StrategyParams) -> SweepResults {
        let configs: Vec<(usize, StrategyParams)> =
            grid.generate(base).into_iter().enumerate().collect();
        info!(points = configs.len(), parallel = self.parallel, "starting sweep");

        let outcomes: Vec<Result<SweepPoint, SweepFailure>> = if self.parallel {
            configs
                .into_par_iter()
                .map(|(i, params)| self.run_point(i, params))
                .collect()
        } else {
            configs
                .into_iter()
                .map(|(i, params)| self.run_point(i, params))
                .collect()
        };

        let mut results = SweepResults::default();
        for outcome in outcomes {
            match outcome {
                Ok(point) => results.points.push(point),
                Err(failure) => results.failures.push(failure),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_and_order() {
        let grid = ParamGrid {
            pivot_windows: vec![3, 5],
            zone_tolerances: vec![0.01, 0.02],
            stop_multiples: vec![],
            target_multiples: vec![0.04, 0.06, 0.08],
        };
        let base = StrategyParams::default();
        let points = grid.generate(&base);
        assert_eq!(grid.size(), 12);
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].pivot_window, 3);
        assert_eq!(points[0].target_multiple, 0.04);
        assert_eq!(points[1].target_multiple, 0.06);
        assert_eq!(points[11].pivot_window, 5);
        assert_eq!(points[11].zone_tolerance, 0.02);
        assert!(points.iter().all(|p| p.stop_multiple == base.stop_multiple));
    }

    #[test]
    fn around_keeps_window_positive() {
        let base = StrategyParams {
            pivot_window: 1,
            ..Default::default()
        };
        let grid = ParamGrid::around(&base);
        assert_eq!(grid.pivot_windows, vec![1, 1, 3]);
        assert_eq!(grid.size(), 27);
    }

    #[test]
    fn ranked_breaks_ties_by_index() {
        let base = StrategyParams::default();
        let point = |index, pnl: f64| {
            let mut summary = Summary::from_ledger(&[], &[], 10_000.0, 10_000.0);
            summary.total_pnl = pnl;
            SweepPoint {
                index,
                params: base.clone(),
                summary,
                metrics: PerformanceMetrics::compute(&[], &[], 10_000.0),
                ledger_hash: Digest(String::new()),
            }
        };
        let results = SweepResults {
            points: vec![point(0, 5.0), point(1, 10.0), point(2, 10.0)],
            failures: vec![],
        };
        let order: Vec<usize> = results.ranked().iter().map(|p| p.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(results.best().map(|p| p.index), Some(1));
    }
}
