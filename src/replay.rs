//! Feed replay
//!
//! Drives an [`OrderBook`] from a recorded snapshot file followed by NDJSON
//! delta files, one feed message per line.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{BookError, Result};
use crate::fixed::PriceScale;
use crate::orderbook::{OrderBook, OrderBookState, UpdateStats};
use crate::parser::{OrderBookSnapshot, ParsedMessage};

/// Applies recorded feed messages to a single book
#[derive(Debug)]
pub struct Replayer {
    symbol: String,
    scale: PriceScale,
    book: OrderBook,
    initialized: bool,
}

impl Replayer {
    pub fn new(symbol: impl Into<String>, scale: PriceScale) -> Self {
        Self {
            symbol: symbol.into(),
            scale,
            book: OrderBook::new(),
            initialized: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.symbol.clone(), config.scale)
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Whether a snapshot has been applied
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Load and apply a snapshot JSON file
    pub fn load_snapshot_file(&mut self, path: &Path) -> Result<UpdateStats> {
        let raw = fs::read_to_string(path)?;
        let snapshot: OrderBookSnapshot = serde_json::from_str(&raw)?;
        self.apply_snapshot(&snapshot)
    }

    /// Reset the book to a snapshot
    pub fn apply_snapshot(&mut self, snapshot: &OrderBookSnapshot) -> Result<UpdateStats> {
        let levels = snapshot.to_fixed(self.scale)?;
        let stats = self.book.apply_snapshot(&levels.bids, &levels.asks);
        self.initialized = true;

        info!(
            symbol = %self.symbol,
            last_update_id = ?snapshot.last_update_id,
            bid_levels = self.book.bids().len(),
            ask_levels = self.book.asks().len(),
            "Order book initialized from snapshot"
        );
        Ok(stats)
    }

    /// Apply one raw feed message
    ///
    /// Returns `None` for messages that do not touch this book.
    pub fn apply_message(&mut self, raw: &str) -> Result<Option<UpdateStats>> {
        let message = ParsedMessage::parse(raw)?;

        if let Some(symbol) = message.symbol() {
            if !symbol.eq_ignore_ascii_case(&self.symbol) {
                debug!(symbol, expected = %self.symbol, "Skipping message for another symbol");
                return Ok(None);
            }
        }

        match message {
            ParsedMessage::Snapshot(snapshot) => self.apply_snapshot(&snapshot).map(Some),
            ParsedMessage::DepthUpdate(update) => {
                if !self.initialized {
                    return Err(BookError::NotInitialized);
                }

                let levels = update.to_fixed(self.scale)?;
                Ok(Some(self.book.apply_update(&levels.bids, &levels.asks)))
            }
            ParsedMessage::Unknown(_) => {
                warn!("Ignoring unrecognized message");
                Ok(None)
            }
        }
    }

    /// Replay an NDJSON file, stopping at the first failing line
    pub fn replay_file(&mut self, path: &Path) -> Result<UpdateStats> {
        let reader = BufReader::new(File::open(path)?);
        let mut totals = UpdateStats::default();
        let mut applied = 0usize;
        let mut skipped = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.apply_message(&line) {
                Ok(Some(stats)) => {
                    totals += stats;
                    applied += 1;
                }
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Replay stopped"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            path = %path.display(),
            applied,
            skipped,
            inserted = totals.inserted,
            updated = totals.updated,
            removed = totals.removed,
            "Replayed delta file"
        );
        Ok(totals)
    }

    /// Get current state for reporting
    pub fn state(&self, depth: usize) -> OrderBookState {
        let (bids, asks) = self.book.depth(depth);
        OrderBookState {
            symbol: self.symbol.clone(),
            timestamp: Utc::now(),
            bids,
            asks,
            metrics: self.book.metrics(),
        }
    }
}
