//! AVL Order Book Library
//!
//! This crate maintains aggregate resting quantity per price level for both
//! sides of an order book, each side an AVL-balanced tree keyed by fixed-point
//! price, together with the feed adapters that turn snapshot and depth update
//! payloads into fixed-point levels.

pub mod config;
pub mod error;
pub mod fixed;
pub mod orderbook;
pub mod parser;
pub mod replay;

pub use config::{Config, LogFormat};
pub use error::{BookError, Result};
pub use fixed::PriceScale;
pub use orderbook::{
    LevelChange, NodeView, OrderBook, OrderBookMetrics, OrderBookState, PriceLevel,
    PriceLevelTree, Side, UpdateStats,
};
pub use parser::{DecimalLevel, DepthUpdate, FixedLevels, OrderBookSnapshot, ParsedMessage};
pub use replay::Replayer;
