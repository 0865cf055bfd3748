//! Parser module for order book feed messages
//!
//! Decodes REST-style snapshots and Binance-style depth updates, then converts
//! their decimal price levels into fixed-point [`PriceLevel`]s for the book.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::error::Result;
use crate::fixed::PriceScale;
use crate::orderbook::PriceLevel;

/// Depth update message
///
/// Every field is optional: the event header is present on exchange streams
/// but absent from bare delta payloads, and a side with no changes may be
/// left out entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdate {
    /// Event type
    #[serde(rename = "e", default)]
    pub event_type: Option<String>,

    /// Event time (milliseconds)
    #[serde(rename = "E", default)]
    pub event_time: Option<u64>,

    /// Symbol
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,

    /// First update ID in event
    #[serde(rename = "U", default)]
    pub first_update_id: Option<u64>,

    /// Final update ID in event
    #[serde(rename = "u", default)]
    pub final_update_id: Option<u64>,

    /// Bids to update
    #[serde(rename = "b", default, deserialize_with = "deserialize_price_levels")]
    pub bids: Vec<DecimalLevel>,

    /// Asks to update
    #[serde(rename = "a", default, deserialize_with = "deserialize_price_levels")]
    pub asks: Vec<DecimalLevel>,
}

/// Price level as decoded from the feed, before scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Order book snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookSnapshot {
    /// Symbol, taken from the stream name when the snapshot arrives on a
    /// combined stream; REST payloads do not carry one
    #[serde(skip)]
    pub symbol: Option<String>,

    /// Last update ID
    #[serde(rename = "lastUpdateId", default)]
    pub last_update_id: Option<u64>,

    /// Bids
    #[serde(default, deserialize_with = "deserialize_price_levels")]
    pub bids: Vec<DecimalLevel>,

    /// Asks
    #[serde(default, deserialize_with = "deserialize_price_levels")]
    pub asks: Vec<DecimalLevel>,
}

/// Both sides of a message after fixed-point conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedLevels {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    pub fn to_fixed(&self, scale: PriceScale) -> Result<FixedLevels> {
        Ok(FixedLevels {
            bids: to_fixed_levels(&self.bids, scale)?,
            asks: to_fixed_levels(&self.asks, scale)?,
        })
    }
}

impl DepthUpdate {
    pub fn to_fixed(&self, scale: PriceScale) -> Result<FixedLevels> {
        Ok(FixedLevels {
            bids: to_fixed_levels(&self.bids, scale)?,
            asks: to_fixed_levels(&self.asks, scale)?,
        })
    }
}

/// Convert decoded levels with a single scale, failing on the first bad value
pub fn to_fixed_levels(levels: &[DecimalLevel], scale: PriceScale) -> Result<Vec<PriceLevel>> {
    levels
        .iter()
        .map(|level| scale.level(level.price, level.quantity))
        .collect()
}

/// Combined stream message wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
    /// Stream name
    pub stream: String,

    /// Data payload
    pub data: serde_json::Value,
}

/// Parsed feed message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Snapshot(OrderBookSnapshot),
    DepthUpdate(DepthUpdate),
    Unknown(String),
}

impl ParsedMessage {
    /// Parse a raw feed message
    ///
    /// The payload shape decides the kind: either of `bids`/`asks` makes a
    /// snapshot, either of `b`/`a` a depth update, and a missing side is empty.
    /// A recognised shape with malformed levels is an error; anything else is
    /// returned as [`ParsedMessage::Unknown`].
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        // Try to parse as stream message first (combined streams)
        if value.get("stream").is_some() && value.get("data").is_some() {
            let stream_msg: StreamMessage = serde_json::from_value(value)?;
            return Self::parse_stream_data(&stream_msg.stream, stream_msg.data);
        }

        Self::parse_payload(value, raw)
    }

    /// Symbol this message targets, if it names one
    pub fn symbol(&self) -> Option<&str> {
        match self {
            ParsedMessage::Snapshot(snapshot) => snapshot.symbol.as_deref(),
            ParsedMessage::DepthUpdate(update) => update.symbol.as_deref(),
            ParsedMessage::Unknown(_) => None,
        }
    }

    fn parse_stream_data(stream: &str, data: serde_json::Value) -> Result<Self> {
        if !stream.contains("depth") {
            return Ok(ParsedMessage::Unknown(data.to_string()));
        }

        let raw = data.to_string();
        let mut message = Self::parse_payload(data, &raw)?;

        // Stream names look like "btcusdt@depth5"; the prefix is the symbol
        let stream_symbol = stream
            .split('@')
            .next()
            .filter(|symbol| !symbol.is_empty())
            .map(str::to_uppercase);
        match &mut message {
            ParsedMessage::Snapshot(snapshot) => snapshot.symbol = stream_symbol,
            ParsedMessage::DepthUpdate(update) if update.symbol.is_none() => {
                update.symbol = stream_symbol
            }
            _ => {}
        }
        Ok(message)
    }

    fn parse_payload(value: serde_json::Value, raw: &str) -> Result<Self> {
        // Trade and other events reuse the "b"/"a" keys for order ids
        if let Some(event) = value.get("e").and_then(|e| e.as_str()) {
            if event != "depthUpdate" {
                return Ok(ParsedMessage::Unknown(raw.to_string()));
            }
        }

        let is_update = value.get("b").is_some() || value.get("a").is_some();
        let is_snapshot = value.get("bids").is_some() || value.get("asks").is_some();

        if is_update {
            return Ok(ParsedMessage::DepthUpdate(serde_json::from_value(value)?));
        }

        if is_snapshot {
            return Ok(ParsedMessage::Snapshot(serde_json::from_value(value)?));
        }

        Ok(ParsedMessage::Unknown(raw.to_string()))
    }
}

/// Custom deserializer for price levels from array of string pairs
fn deserialize_price_levels<'de, D>(deserializer: D) -> std::result::Result<Vec<DecimalLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<String>> = Deserialize::deserialize(deserializer)?;
    raw.into_iter()
        .map(|pair| {
            if pair.len() != 2 {
                return Err(serde::de::Error::custom("Invalid price level format"));
            }
            Ok(DecimalLevel {
                price: Decimal::from_str(pair[0].trim()).map_err(serde::de::Error::custom)?,
                quantity: Decimal::from_str(pair[1].trim()).map_err(serde::de::Error::custom)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BookError;
    use rust_decimal_macros::dec;

    const SNAPSHOT: &str = r#"{
      "bids" : [ ["0.0024","14.70000000"], ["0.0022","6.40000000"], ["0.0020","9.70000000"] ],
      "asks" : [ ["0.0026","3.60000000"], ["0.0028","1.00000000"] ]
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let msg = ParsedMessage::parse(SNAPSHOT).unwrap();
        if let ParsedMessage::Snapshot(snapshot) = msg {
            assert_eq!(snapshot.last_update_id, None);
            assert_eq!(snapshot.bids.len(), 3);
            assert_eq!(snapshot.asks.len(), 2);
            assert_eq!(snapshot.bids[0].price, dec!(0.0024));
            assert_eq!(snapshot.bids[0].quantity, dec!(14.7));
        } else {
            panic!("Expected Snapshot");
        }
    }

    #[test]
    fn test_snapshot_to_fixed() {
        let snapshot: OrderBookSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        let levels = snapshot.to_fixed(PriceScale::default()).unwrap();

        assert_eq!(levels.bids.len(), 3);
        assert_eq!(levels.asks.len(), 2);
        assert_eq!(levels.bids[0], PriceLevel::new(240_000, 1_470_000_000));
        assert_eq!(levels.asks[1], PriceLevel::new(280_000, 100_000_000));
    }

    #[test]
    fn test_parse_bare_delta() {
        let raw = r#"{
          "b": [ ["0.0024","0"], ["0.0020","9.7"] ],
          "a": [ ["0.0025","2.0"] ]
        }"#;

        let msg = ParsedMessage::parse(raw).unwrap();
        if let ParsedMessage::DepthUpdate(depth) = msg {
            assert_eq!(depth.event_type, None);
            let levels = depth.to_fixed(PriceScale::default()).unwrap();
            assert_eq!(
                levels.bids,
                vec![PriceLevel::new(240_000, 0), PriceLevel::new(200_000, 970_000_000)]
            );
            assert_eq!(levels.asks, vec![PriceLevel::new(250_000, 200_000_000)]);
        } else {
            panic!("Expected DepthUpdate");
        }
    }

    #[test]
    fn test_parse_depth_update() {
        let raw = r#"{
            "e": "depthUpdate",
            "E": 1672531200000,
            "s": "BTCUSDT",
            "U": 100,
            "u": 105,
            "b": [["50000.00", "1.5"], ["49999.00", "2.0"]],
            "a": [["50001.00", "1.0"], ["50002.00", "0.5"]]
        }"#;

        let msg = ParsedMessage::parse(raw).unwrap();
        if let ParsedMessage::DepthUpdate(depth) = msg {
            assert_eq!(depth.symbol.as_deref(), Some("BTCUSDT"));
            assert_eq!(depth.final_update_id, Some(105));
            assert_eq!(depth.bids.len(), 2);
            assert_eq!(depth.asks.len(), 2);
            assert_eq!(depth.bids[0].price, dec!(50000.00));
        } else {
            panic!("Expected DepthUpdate");
        }
    }

    #[test]
    fn test_parse_combined_stream() {
        let raw = r#"{
            "stream": "btcusdt@depth",
            "data": {"e": "depthUpdate", "s": "BTCUSDT", "b": [["1.0", "2.0"]], "a": []}
        }"#;

        let msg = ParsedMessage::parse(raw).unwrap();
        assert!(matches!(msg, ParsedMessage::DepthUpdate(ref d) if d.bids.len() == 1));

        let raw = r#"{"stream": "btcusdt@trade", "data": {"e": "trade"}}"#;
        assert!(matches!(
            ParsedMessage::parse(raw).unwrap(),
            ParsedMessage::Unknown(_)
        ));
    }

    #[test]
    fn test_one_sided_delta_has_empty_other_side() {
        let raw = r#"{"e":"depthUpdate","s":"BTCUSDT","b":[["0.0024","0"]]}"#;
        let ParsedMessage::DepthUpdate(depth) = ParsedMessage::parse(raw).unwrap() else {
            panic!("Expected DepthUpdate");
        };
        assert_eq!(depth.bids.len(), 1);
        assert!(depth.asks.is_empty());

        let ParsedMessage::DepthUpdate(depth) =
            ParsedMessage::parse(r#"{"a":[["0.0025","1"]]}"#).unwrap()
        else {
            panic!("Expected DepthUpdate");
        };
        assert!(depth.bids.is_empty());
        assert_eq!(depth.asks.len(), 1);
    }

    #[test]
    fn test_one_sided_snapshot() {
        let ParsedMessage::Snapshot(snapshot) =
            ParsedMessage::parse(r#"{"lastUpdateId":3,"asks":[["1.0","2.0"]]}"#).unwrap()
        else {
            panic!("Expected Snapshot");
        };
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.asks.len(), 1);
        assert_eq!(snapshot.symbol, None);
    }

    #[test]
    fn test_stream_name_sets_symbol() {
        let raw = r#"{"stream":"ethusdt@depth5","data":{"lastUpdateId":9,"bids":[["3000","1"]],"asks":[["3001","1"]]}}"#;
        let msg = ParsedMessage::parse(raw).unwrap();
        assert!(matches!(msg, ParsedMessage::Snapshot(_)));
        assert_eq!(msg.symbol(), Some("ETHUSDT"));

        let raw = r#"{"stream":"ethusdt@depth","data":{"b":[["3000","1"]]}}"#;
        assert_eq!(ParsedMessage::parse(raw).unwrap().symbol(), Some("ETHUSDT"));

        // An explicit symbol in the payload wins
        let raw = r#"{"stream":"ethusdt@depth","data":{"s":"BTCUSDT","b":[]}}"#;
        assert_eq!(ParsedMessage::parse(raw).unwrap().symbol(), Some("BTCUSDT"));
    }

    #[test]
    fn test_trade_event_is_unknown() {
        let raw = r#"{"e":"trade","s":"BTCUSDT","p":"1.0","q":"1.0","b":111,"a":222}"#;
        assert!(matches!(
            ParsedMessage::parse(raw).unwrap(),
            ParsedMessage::Unknown(_)
        ));
    }

    #[test]
    fn test_unknown_message() {
        let msg = ParsedMessage::parse(r#"{"result": null, "id": 1}"#).unwrap();
        assert!(matches!(msg, ParsedMessage::Unknown(_)));
    }

    #[test]
    fn test_malformed_level_fails_payload() {
        let raw = r#"{"b": [["0.0024"]], "a": []}"#;
        assert!(matches!(
            ParsedMessage::parse(raw),
            Err(BookError::ParseError(_))
        ));

        let raw = r#"{"b": [["abc", "1"]], "a": []}"#;
        assert!(ParsedMessage::parse(raw).is_err());

        assert!(ParsedMessage::parse(r#"{"b": [["1", "2"]"#).is_err());
    }

    #[test]
    fn test_negative_quantity_rejected_on_conversion() {
        let raw = r#"{"b": [["1.0", "-2"]], "a": []}"#;
        let ParsedMessage::DepthUpdate(depth) = ParsedMessage::parse(raw).unwrap() else {
            panic!("Expected DepthUpdate");
        };
        assert!(matches!(
            depth.to_fixed(PriceScale::default()),
            Err(BookError::NegativeValue(_))
        ));
    }
}
