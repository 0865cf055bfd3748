//! Decimal to fixed-point conversion
//!
//! Feed prices and quantities arrive as decimal strings. The book keys levels
//! on exact integers, so every value is scaled by one system-wide factor
//! (10^8 by default) and rounded half away from zero before it enters a tree.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{BookError, Result};
use crate::orderbook::PriceLevel;

/// Decimal places used when no scale is configured
pub const DEFAULT_DECIMALS: u32 = 8;

/// Largest supported scale; 10^18 still fits in a u64
pub const MAX_DECIMALS: u32 = 18;

/// Scale factor shared by every price and quantity in a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceScale {
    decimals: u32,
}

impl PriceScale {
    /// Create a scale of `10^decimals`
    pub fn new(decimals: u32) -> Result<Self> {
        if decimals > MAX_DECIMALS {
            return Err(BookError::InvalidScale(decimals));
        }
        Ok(Self { decimals })
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Multiplier applied to decimal values
    pub fn factor(&self) -> u64 {
        10u64.pow(self.decimals)
    }

    /// Convert a decimal to its fixed-point representation
    pub fn to_fixed(&self, value: Decimal) -> Result<u64> {
        if value < Decimal::ZERO {
            return Err(BookError::NegativeValue(value));
        }

        let overflow = || BookError::FixedPointOverflow {
            value,
            decimals: self.decimals,
        };

        value
            .checked_mul(Decimal::from(self.factor()))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
            .ok_or_else(overflow)
    }

    /// Convert a fixed-point value back to a decimal for display
    pub fn to_decimal(&self, fixed: u64) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(fixed), self.decimals)
    }

    /// Convert a decimal price/quantity pair into a book level
    pub fn level(&self, price: Decimal, quantity: Decimal) -> Result<PriceLevel> {
        Ok(PriceLevel::new(self.to_fixed(price)?, self.to_fixed(quantity)?))
    }
}

impl Default for PriceScale {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_scale_is_1e8() {
        let scale = PriceScale::default();
        assert_eq!(scale.decimals(), 8);
        assert_eq!(scale.factor(), 100_000_000);
    }

    #[test]
    fn test_to_fixed_exact() {
        let scale = PriceScale::default();
        assert_eq!(scale.to_fixed(dec!(0.0024)).unwrap(), 240_000);
        assert_eq!(scale.to_fixed(dec!(14.70000000)).unwrap(), 1_470_000_000);
        assert_eq!(scale.to_fixed(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn test_to_fixed_rounds_half_away_from_zero() {
        let scale = PriceScale::new(2).unwrap();
        assert_eq!(scale.to_fixed(dec!(1.005)).unwrap(), 101);
        assert_eq!(scale.to_fixed(dec!(1.015)).unwrap(), 102);
        assert_eq!(scale.to_fixed(dec!(1.004)).unwrap(), 100);
    }

    #[test]
    fn test_negative_rejected() {
        let scale = PriceScale::default();
        assert!(matches!(
            scale.to_fixed(dec!(-0.5)),
            Err(BookError::NegativeValue(_))
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        let scale = PriceScale::default();
        // 1e12 * 1e8 = 1e20 > u64::MAX
        assert!(matches!(
            scale.to_fixed(dec!(1000000000000)),
            Err(BookError::FixedPointOverflow { decimals: 8, .. })
        ));
    }

    #[test]
    fn test_invalid_scale() {
        assert!(matches!(PriceScale::new(19), Err(BookError::InvalidScale(19))));
        assert!(PriceScale::new(MAX_DECIMALS).is_ok());
    }

    #[test]
    fn test_to_decimal() {
        let scale = PriceScale::default();
        assert_eq!(scale.to_decimal(220_000), dec!(0.0022));
        assert_eq!(scale.to_decimal(u64::MAX), dec!(184467440737.09551615));
    }

    #[test]
    fn test_level() {
        let scale = PriceScale::default();
        let level = scale.level(dec!(0.0025), dec!(2.0)).unwrap();
        assert_eq!(level, PriceLevel::new(250_000, 200_000_000));
    }
}
