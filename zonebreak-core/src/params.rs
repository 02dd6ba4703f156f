//! StrategyParams: every knob of a replay, with defaults and validation.

use crate::engine::bracket::{BracketMode, BracketPolicy};
use crate::filter::{EntryFilter, TradingMode, TrendFilter};
use crate::sizers::SizingMode;
use crate::structure::{PivotDetector, StructureClassifier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// When a signal's entry is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// At the signal bar's close; exits are evaluated from the next bar.
    #[default]
    SameBarClose,
    /// At the next bar's open; exits are evaluated on that fill bar.
    NextBarOpen,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("{field} must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("risk_fraction must be in (0, 1] (got {0})")]
    RiskFractionOutOfRange(f64),

    #[error("rsi thresholds must satisfy 0 <= oversold < overbought <= 100 (got {oversold} / {overbought})")]
    RsiThresholds { oversold: f64, overbought: f64 },

    #[error("{field} must lie in [0, 100] (got {value})")]
    RsiGuardOutOfRange { field: &'static str, value: f64 },
}

/// Strategy parameters.
///
/// Defaults follow the classic setup: a 6-bar pivot window, three-pivot
/// zones within 0.01 of their mean, breakouts at twice the tolerance, a 3%
/// percent stop with a 2:1 target, RSI exits at 80/20.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    // ── Structure ──
    pub pivot_window: usize,
    pub zone_lookback: usize,
    /// Absolute tightness tolerance ε.
    pub zone_tolerance: f64,
    pub breakout_multiplier: f64,
    /// How far back (beyond the confirmation lag) pivots stay relevant.
    pub structure_lookback: usize,

    // ── Sizing ──
    pub risk_fraction: f64,
    pub sizing: SizingMode,

    // ── Bracket ──
    pub bracket_mode: BracketMode,
    pub stop_multiple: f64,
    pub target_multiple: f64,
    pub trailing_atr_multiple: Option<f64>,

    // ── Exits ──
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,

    // ── Entry gating ──
    pub entry_rsi_ceiling: Option<f64>,
    pub entry_rsi_floor: Option<f64>,
    pub trend_filter: TrendFilter,
    pub trading_mode: TradingMode,

    pub fill_policy: FillPolicy,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            pivot_window: 6,
            zone_lookback: 3,
            zone_tolerance: 0.01,
            breakout_multiplier: 2.0,
            structure_lookback: 40,
            risk_fraction: 0.01,
            sizing: SizingMode::RiskBased,
            bracket_mode: BracketMode::Percent,
            stop_multiple: 0.03,
            target_multiple: 0.06,
            trailing_atr_multiple: None,
            rsi_overbought: 80.0,
            rsi_oversold: 20.0,
            entry_rsi_ceiling: None,
            entry_rsi_floor: None,
            trend_filter: TrendFilter::None,
            trading_mode: TradingMode::LongShort,
            fill_policy: FillPolicy::SameBarClose,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ParamsError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParamsError::NonPositive { field, value })
    }
}

fn count(field: &'static str, value: usize) -> Result<(), ParamsError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ParamsError::ZeroCount { field })
    }
}

fn rsi_level(field: &'static str, value: Option<f64>) -> Result<(), ParamsError> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(ParamsError::RsiGuardOutOfRange { field, value: v }),
        _ => Ok(()),
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        count("pivot_window", self.pivot_window)?;
        count("zone_lookback", self.zone_lookback)?;
        positive("zone_tolerance", self.zone_tolerance)?;
        positive("breakout_multiplier", self.breakout_multiplier)?;

        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(ParamsError::RiskFractionOutOfRange(self.risk_fraction));
        }
        match self.sizing {
            SizingMode::RiskBased => {}
            SizingMode::FixedFraction { fraction } => positive("sizing.fraction", fraction)?,
            SizingMode::FixedUnits { units } => positive("sizing.units", units)?,
        }

        positive("stop_multiple", self.stop_multiple)?;
        positive("target_multiple", self.target_multiple)?;
        if let Some(k) = self.trailing_atr_multiple {
            positive("trailing_atr_multiple", k)?;
        }

        let (lo, hi) = (self.rsi_oversold, self.rsi_overbought);
        if !(0.0 <= lo && lo < hi && hi <= 100.0) {
            return Err(ParamsError::RsiThresholds {
                oversold: lo,
                overbought: hi,
            });
        }
        rsi_level("entry_rsi_ceiling", self.entry_rsi_ceiling)?;
        rsi_level("entry_rsi_floor", self.entry_rsi_floor)?;
        Ok(())
    }

    pub fn detector(&self) -> PivotDetector {
        PivotDetector::new(self.pivot_window)
    }

    pub fn classifier(&self) -> StructureClassifier {
        StructureClassifier {
            zone_lookback: self.zone_lookback,
            tolerance: self.zone_tolerance,
            breakout_multiplier: self.breakout_multiplier,
            lag: self.pivot_window,
            structure_lookback: self.structure_lookback,
        }
    }

    pub fn bracket(&self) -> BracketPolicy {
        BracketPolicy {
            mode: self.bracket_mode,
            stop_multiple: self.stop_multiple,
            target_multiple: self.target_multiple,
        }
    }

    pub fn entry_filter(&self) -> EntryFilter {
        EntryFilter {
            trading_mode: self.trading_mode,
            trend_filter: self.trend_filter,
            entry_rsi_ceiling: self.entry_rsi_ceiling,
            entry_rsi_floor: self.entry_rsi_floor,
        }
    }
}
