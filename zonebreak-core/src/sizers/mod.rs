//! Position sizers: convert equity, risk budget and volatility into a
//! trade quantity.
//!
//! Every sizer is bounded by available equity: `quantity * price <= equity`
//! holds exactly in floating point for whatever a sizer returns.

pub mod atr_risk;
pub mod fixed;

pub use atr_risk::AtrRiskSizer;
pub use fixed::FixedSizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recoverable sizing failures. The driver skips the entry for that bar.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SizingError {
    #[error("invalid sizing input: atr={atr}, price={price} (both must be > 0)")]
    InvalidSizingInput { atr: f64, price: f64 },
}

/// Market context handed to a sizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInput {
    pub equity: f64,
    pub risk_fraction: f64,
    pub atr: f64,
    pub price: f64,
}

impl SizingInput {
    fn validate(&self) -> Result<(), SizingError> {
        if self.atr > 0.0 && self.price > 0.0 {
            Ok(())
        } else {
            Err(SizingError::InvalidSizingInput {
                atr: self.atr,
                price: self.price,
            })
        }
    }
}

/// Position sizing logic.
///
/// # Responsibilities
/// - Convert equity + risk budget + volatility → quantity
/// - Never size beyond total equity
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the structure signal's job)
pub trait Sizer: Send + Sync {
    /// Uncapped quantity for `input`. Inputs are already validated.
    fn raw_quantity(&self, input: &SizingInput) -> f64;

    /// Sizer name for logging.
    fn name(&self) -> &str;

    /// Validated, equity-capped quantity.
    fn size(&self, input: &SizingInput) -> Result<f64, SizingError> {
        input.validate()?;
        let quantity = self.raw_quantity(input);
        Ok(cap_to_equity(quantity, input.equity, input.price))
    }
}

/// Sizing policy selected in the strategy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SizingMode {
    /// `(equity * risk_fraction) / atr`.
    #[default]
    RiskBased,
    /// A fixed fraction of equity notional at the entry price.
    FixedFraction { fraction: f64 },
    /// A constant quantity per trade.
    FixedUnits { units: f64 },
}

impl SizingMode {
    pub fn sizer(&self) -> Box<dyn Sizer> {
        match *self {
            Self::RiskBased => Box::new(AtrRiskSizer),
            Self::FixedFraction { fraction } => Box::new(FixedSizer::fraction(fraction)),
            Self::FixedUnits { units } => Box::new(FixedSizer::units(units)),
        }
    }
}

/// Size a trade under `mode`.
pub fn size(
    equity: f64,
    risk_fraction: f64,
    atr: f64,
    price: f64,
    mode: SizingMode,
) -> Result<f64, SizingError> {
    let input = SizingInput {
        equity,
        risk_fraction,
        atr,
        price,
    };
    mode.sizer().size(&input)
}

/// Clamp `quantity` to `[0, equity / price]` such that the product with
/// `price` never rounds above `equity`.
pub fn cap_to_equity(quantity: f64, equity: f64, price: f64) -> f64 {
    if !(equity > 0.0) || !(price > 0.0) || !(quantity > 0.0) {
        return 0.0;
    }
    let mut cap = equity / price;
    while cap > 0.0 && cap * price > equity {
        cap = next_down(cap);
    }
    quantity.min(cap)
}

/// Largest float below a positive finite `x`.
fn next_down(x: f64) -> f64 {
    f64::from_bits(x.to_bits() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_based_formula() {
        // 100_000 * 0.01 / 2.0 = 500 units, notional 500 * 50 = 25_000
        let q = size(100_000.0, 0.01, 2.0, 50.0, SizingMode::RiskBased).unwrap();
        assert!((q - 500.0).abs() < 1e-9);
    }

    #[test]
    fn risk_based_is_capped_by_equity() {
        // uncapped 10_000 * 0.5 / 0.01 = 500_000 units at 100 → far above equity
        let q = size(10_000.0, 0.5, 0.01, 100.0, SizingMode::RiskBased).unwrap();
        assert!(q * 100.0 <= 10_000.0);
        assert!((q - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_fraction_allocates_notional() {
        let mode = SizingMode::FixedFraction { fraction: 0.5 };
        let q = size(10_000.0, 0.01, 1.0, 20.0, mode).unwrap();
        assert!((q - 250.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_units_still_capped() {
        let mode = SizingMode::FixedUnits { units: 1_000.0 };
        assert_eq!(size(10_000.0, 0.01, 1.0, 5.0, mode).unwrap(), 1_000.0);
        let q = size(10_000.0, 0.01, 1.0, 50.0, mode).unwrap();
        assert!(q * 50.0 <= 10_000.0);
    }

    #[test]
    fn non_positive_atr_or_price_is_rejected() {
        for (atr, price) in [(0.0, 10.0), (-1.0, 10.0), (1.0, 0.0), (f64::NAN, 10.0)] {
            let err = size(10_000.0, 0.01, atr, price, SizingMode::RiskBased).unwrap_err();
            assert!(matches!(err, SizingError::InvalidSizingInput { .. }));
        }
    }

    #[test]
    fn no_equity_sizes_zero() {
        assert_eq!(size(0.0, 0.01, 1.0, 10.0, SizingMode::RiskBased).unwrap(), 0.0);
        assert_eq!(size(-5.0, 0.01, 1.0, 10.0, SizingMode::RiskBased).unwrap(), 0.0);
    }

    #[test]
    fn cap_is_exact_for_awkward_prices() {
        for (equity, price) in [(1.0, 3.0), (100.0, 0.7), (12_345.678, 9.99), (1e9, 1e-3)] {
            let q = cap_to_equity(f64::MAX, equity, price);
            assert!(q * price <= equity, "{q} * {price} > {equity}");
            assert!(q > 0.0);
        }
    }

    #[test]
    fn sizing_mode_serde_tags() {
        let json = serde_json::to_string(&SizingMode::FixedUnits { units: 3.0 }).unwrap();
        assert_eq!(json, r#"{"mode":"fixed_units","units":3.0}"#);
        let mode: SizingMode = serde_json::from_str(r#"{"mode":"risk_based"}"#).unwrap();
        assert_eq!(mode, SizingMode::RiskBased);
    }
}
