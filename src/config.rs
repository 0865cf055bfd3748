//! Configuration module for the replay tool

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{BookError, Result};
use crate::fixed::{PriceScale, DEFAULT_DECIMALS};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(BookError::ConfigError(format!(
                "unknown LOG_FORMAT '{other}' (expected json or pretty)"
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Instrument label used in reported state
    pub symbol: String,

    /// Fixed-point scale applied to every price and quantity
    pub scale: PriceScale,

    /// Snapshot JSON file loaded before any delta
    pub snapshot_path: Option<PathBuf>,

    /// NDJSON delta files, replayed in order
    pub delta_paths: Vec<PathBuf>,

    /// Order book depth levels to report
    pub depth_levels: usize,

    pub log_format: LogFormat,

    /// Print both trees' structure after the replay
    pub print_structure: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let decimals = parse_or(&lookup, "PRICE_DECIMALS", DEFAULT_DECIMALS)?;
        let scale = PriceScale::new(decimals)
            .map_err(|e| BookError::ConfigError(format!("PRICE_DECIMALS: {e}")))?;

        let delta_paths = lookup("DELTA_PATHS")
            .map(|paths| {
                paths
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            symbol: lookup("SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or(defaults.symbol),
            scale,
            snapshot_path: lookup("SNAPSHOT_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            delta_paths,
            depth_levels: parse_or(&lookup, "DEPTH_LEVELS", defaults.depth_levels)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
            print_structure: parse_or(&lookup, "PRINT_STRUCTURE", defaults.print_structure)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| BookError::ConfigError(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            scale: PriceScale::default(),
            snapshot_path: None,
            delta_paths: Vec::new(),
            depth_levels: 20,
            log_format: LogFormat::Json,
            print_structure: false,
        }
    }
}
