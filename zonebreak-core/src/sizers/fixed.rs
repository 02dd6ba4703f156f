//! Fixed sizer: constant units or a constant fraction of equity.

use crate::sizers::{Sizer, SizingInput};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedSizer {
    /// Always trade N units.
    Units { quantity: f64 },
    /// Allocate `fraction` of equity notional at the entry price.
    Fraction { fraction: f64 },
}

impl FixedSizer {
    pub fn units(quantity: f64) -> Self {
        Self::Units { quantity }
    }

    pub fn fraction(fraction: f64) -> Self {
        Self::Fraction { fraction }
    }
}

impl Sizer for FixedSizer {
    fn raw_quantity(&self, input: &SizingInput) -> f64 {
        match *self {
            Self::Units { quantity } => quantity,
            Self::Fraction { fraction } => input.equity * fraction / input.price,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Units { .. } => "FixedUnits",
            Self::Fraction { .. } => "FixedFraction",
        }
    }
}
