//! Two-sided order book
//!
//! Each side is a [`PriceLevelTree`]; best bid is the bid tree maximum and
//! best ask the ask tree minimum.

use std::fmt;
use std::ops::AddAssign;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use super::{LevelChange, OrderBookMetrics, PriceLevel, PriceLevelTree, Side};

/// Levels used for the reported imbalance
const IMBALANCE_LEVELS: usize = 5;

/// Per-entry outcome counts for a bulk snapshot or update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Zero quantities for prices that were not resting
    pub ignored: usize,
}

impl UpdateStats {
    fn record(&mut self, change: LevelChange) {
        match change {
            LevelChange::Inserted => self.inserted += 1,
            LevelChange::Updated { .. } => self.updated += 1,
            LevelChange::Removed { .. } => self.removed += 1,
            LevelChange::Unchanged => self.ignored += 1,
        }
    }

    /// Number of entries processed
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.removed + self.ignored
    }
}

impl AddAssign for UpdateStats {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.removed += other.removed;
        self.ignored += other.ignored;
    }
}

/// Order book for a single instrument
///
/// Not internally synchronized. Share it behind a lock with a single writer;
/// concurrent readers are only safe while no update is in flight.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    bids: PriceLevelTree,
    asks: PriceLevelTree,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from an initial snapshot
    pub fn from_snapshot(bids: &[PriceLevel], asks: &[PriceLevel]) -> Self {
        let mut book = Self::new();
        book.apply_snapshot(bids, asks);
        book
    }

    /// Replace both sides with a snapshot
    ///
    /// Zero quantities are no-ops since the trees start out empty.
    pub fn apply_snapshot(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) -> UpdateStats {
        self.bids.clear();
        self.asks.clear();

        let stats = self.upsert_all(bids, asks);

        debug!(
            bid_levels = self.bids.len(),
            ask_levels = self.asks.len(),
            "Snapshot applied"
        );
        stats
    }

    /// Apply a depth update
    ///
    /// Each list is applied in order, so a later entry for a price overrides
    /// an earlier one. A crossed result is left as is.
    pub fn apply_update(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) -> UpdateStats {
        let stats = self.upsert_all(bids, asks);

        if self.is_crossed() {
            debug!(
                best_bid = self.best_bid(),
                best_ask = self.best_ask(),
                "Book crossed after update"
            );
        }
        stats
    }

    /// Upsert a single level on one side
    pub fn upsert(&mut self, side: Side, level: PriceLevel) -> LevelChange {
        match side {
            Side::Bid => self.bids.upsert(level),
            Side::Ask => self.asks.upsert(level),
        }
    }

    fn upsert_all(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) -> UpdateStats {
        let mut stats = UpdateStats::default();
        for level in bids {
            stats.record(self.bids.upsert(*level));
        }
        for level in asks {
            stats.record(self.asks.upsert(*level));
        }
        stats
    }

    pub fn bids(&self) -> &PriceLevelTree {
        &self.bids
    }

    pub fn asks(&self) -> &PriceLevelTree {
        &self.asks
    }

    pub fn side(&self, side: Side) -> &PriceLevelTree {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Get best bid price, `None` when there are no bids
    pub fn best_bid(&self) -> Option<u64> {
        self.bids.max_price()
    }

    /// Get best ask price, `None` when there are no asks
    pub fn best_ask(&self) -> Option<u64> {
        self.asks.min_price()
    }

    pub fn best_bid_level(&self) -> Option<PriceLevel> {
        self.bids.max_level()
    }

    pub fn best_ask_level(&self) -> Option<PriceLevel> {
        self.asks.min_level()
    }

    /// Best ask minus best bid, undefined unless both sides have levels
    ///
    /// Widened to `i128` so a crossed book yields a negative value instead of
    /// wrapping.
    pub fn spread(&self) -> Option<i128> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(i128::from(ask) - i128::from(bid)),
            _ => None,
        }
    }

    /// Get mid price, rounded down
    pub fn mid_price(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => {
                let mid = (u128::from(bid) + u128::from(ask)) / 2;
                u64::try_from(mid).ok()
            }
            _ => None,
        }
    }

    /// Best bid at or above best ask
    pub fn is_crossed(&self) -> bool {
        self.spread().is_some_and(|spread| spread <= 0)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Top `levels` per side: bids best first (descending), asks best first (ascending)
    pub fn depth(&self, levels: usize) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        (
            self.bids.iter_desc().take(levels).collect(),
            self.asks.iter().take(levels).collect(),
        )
    }

    /// Calculate order book imbalance at top N levels
    pub fn imbalance(&self, levels: usize) -> Option<Decimal> {
        let bid_volume: u128 = self
            .bids
            .iter_desc()
            .take(levels)
            .map(|level| u128::from(level.quantity))
            .sum();
        let ask_volume: u128 = self
            .asks
            .iter()
            .take(levels)
            .map(|level| u128::from(level.quantity))
            .sum();

        let total = bid_volume + ask_volume;
        if total == 0 {
            return None;
        }

        let bid = Decimal::from_u128(bid_volume)?;
        let ask = Decimal::from_u128(ask_volume)?;
        (bid - ask).checked_div(bid + ask)
    }

    /// Calculate order book metrics
    pub fn metrics(&self) -> OrderBookMetrics {
        OrderBookMetrics {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            spread: self.spread(),
            mid_price: self.mid_price(),
            imbalance: self.imbalance(IMBALANCE_LEVELS),
            bid_depth: self.bids.iter().map(|l| u128::from(l.quantity)).sum(),
            ask_depth: self.asks.iter().map(|l| u128::from(l.quantity)).sum(),
            bid_levels: self.bids.len(),
            ask_levels: self.asks.len(),
        }
    }

    /// Both sides' tree structure, for debugging
    pub fn render(&self) -> String {
        format!(
            "Bids:\n{}Asks:\n{}",
            self.bids.render_structure(),
            self.asks.render_structure()
        )
    }
}

impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
