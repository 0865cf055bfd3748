//! Order book metrics calculation

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Computed metrics for an order book, prices and sizes in fixed-point units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMetrics {
    pub best_bid: Option<u64>,

    pub best_ask: Option<u64>,

    /// Best ask minus best bid; non-positive when the book is crossed
    pub spread: Option<i128>,

    /// Mid price, rounded down
    pub mid_price: Option<u64>,

    /// Simple imbalance over the top levels: (bid_vol - ask_vol) / (bid_vol + ask_vol)
    pub imbalance: Option<Decimal>,

    /// Total bid depth (volume)
    pub bid_depth: u128,

    /// Total ask depth (volume)
    pub ask_depth: u128,

    /// Number of bid levels
    pub bid_levels: usize,

    /// Number of ask levels
    pub ask_levels: usize,
}

impl OrderBookMetrics {
    /// Two-sided and not crossed
    pub fn is_healthy(&self) -> bool {
        self.spread.is_some_and(|spread| spread > 0) && self.bid_levels > 0 && self.ask_levels > 0
    }

    /// Get volume ratio (bid_depth / ask_depth)
    pub fn volume_ratio(&self) -> Option<Decimal> {
        if self.ask_depth == 0 {
            return None;
        }
        let bid = Decimal::from_u128(self.bid_depth)?;
        let ask = Decimal::from_u128(self.ask_depth)?;
        bid.checked_div(ask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_metrics_unhealthy() {
        let metrics = OrderBookMetrics::default();
        assert!(!metrics.is_healthy());
        assert_eq!(metrics.volume_ratio(), None);
    }

    #[test]
    fn test_crossed_metrics_unhealthy() {
        let metrics = OrderBookMetrics {
            best_bid: Some(105),
            best_ask: Some(100),
            spread: Some(-5),
            bid_levels: 1,
            ask_levels: 1,
            ..Default::default()
        };
        assert!(!metrics.is_healthy());
    }

    #[test]
    fn test_volume_ratio() {
        let metrics = OrderBookMetrics {
            bid_depth: 3,
            ask_depth: 4,
            ..Default::default()
        };
        assert_eq!(metrics.volume_ratio(), Some(dec!(0.75)));
    }
}
