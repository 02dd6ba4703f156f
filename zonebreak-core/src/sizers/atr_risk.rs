//! ATR risk sizer: risk a fixed fraction of equity per unit of volatility.

use crate::sizers::{Sizer, SizingInput};

/// # Formula
/// ```text
/// quantity = (equity * risk_fraction) / ATR
/// ```
///
/// # Example
/// - Equity: $100,000
/// - Risk fraction: 1% ($1,000)
/// - ATR: $2.00
/// - Quantity: $1,000 / $2.00 = 500 units (then capped by equity / price)
#[derive(Debug, Clone, Copy, Default)]
pub struct AtrRiskSizer;

impl Sizer for AtrRiskSizer {
    fn raw_quantity(&self, input: &SizingInput) -> f64 {
        input.equity * input.risk_fraction / input.atr
    }

    fn name(&self) -> &str {
        "AtrRisk"
    }
}
