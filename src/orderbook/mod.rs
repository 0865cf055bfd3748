//! Order book module
//!
//! Maintains aggregate resting quantity per price level, one AVL tree per side.

mod book;
mod metrics;
mod tree;

pub use book::{OrderBook, UpdateStats};
pub use metrics::OrderBookMetrics;
pub use tree::{Iter, LevelChange, NodeView, PriceLevelTree};

use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// Aggregate quantity resting at one price, both in fixed-point units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: u64,
    pub quantity: u64,
}

impl PriceLevel {
    pub fn new(price: u64, quantity: u64) -> Self {
        Self { price, quantity }
    }
}

impl From<(u64, u64)> for PriceLevel {
    fn from((price, quantity): (u64, u64)) -> Self {
        Self { price, quantity }
    }
}

/// Order book state to be reported
#[derive(Debug, Clone, Serialize)]
pub struct OrderBookState {
    pub symbol: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub metrics: OrderBookMetrics,
}
