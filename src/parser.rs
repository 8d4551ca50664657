//! Parser module for L2 order book frames
//!
//! Decodes the JSON snapshot frames pushed by the feed. Price and size values
//! are kept as text here; numeric conversion belongs to the book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Instant;

use crate::error::{Result, SimulatorError};

/// Fields every frame must carry to be forwarded to the pipeline
pub const REQUIRED_FIELDS: [&str; 5] = ["timestamp", "exchange", "symbol", "asks", "bids"];

/// Price level as it appears on the wire: `[priceText, sizeText, ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLevel {
    pub price: String,
    pub size: String,
}

impl RawLevel {
    pub fn new(price: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            size: size.into(),
        }
    }
}

impl<'de> Deserialize<'de> for RawLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<serde_json::Value> = Deserialize::deserialize(deserializer)?;
        if raw.len() < 2 {
            return Err(serde::de::Error::custom("Invalid price level format"));
        }
        Ok(RawLevel {
            price: value_text(&raw[0]).map_err(serde::de::Error::custom)?,
            size: value_text(&raw[1]).map_err(serde::de::Error::custom)?,
        })
    }
}

/// Venues disagree on quoting numbers; both forms end up as text.
fn value_text(value: &serde_json::Value) -> std::result::Result<String, String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("Invalid price level entry: {}", other)),
    }
}

/// Frame timestamp: epoch milliseconds or an RFC 3339 string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FrameTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
}

impl FrameTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FrameTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            FrameTimestamp::FractionalMillis(ms) => {
                DateTime::from_timestamp_micros((ms * 1000.0).round() as i64)
            }
            FrameTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Wire shape of a frame; every field optional so absences can be named
#[derive(Debug, Deserialize)]
struct RawFrame {
    timestamp: Option<FrameTimestamp>,
    exchange: Option<String>,
    symbol: Option<String>,
    asks: Option<Vec<RawLevel>>,
    bids: Option<Vec<RawLevel>>,
}

/// A validated L2 snapshot ready for ingestion
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub timestamp: DateTime<Utc>,
    pub exchange: String,
    pub symbol: String,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
    /// When the frame came off the transport
    pub received_at: Instant,
}

impl RawSnapshot {
    /// Decode a raw text frame
    ///
    /// Returns `IncompleteFrame` naming every absent required field, or
    /// `ParseError` if the payload is not valid JSON of the expected shape.
    pub fn parse(raw: &str, received_at: Instant) -> Result<Self> {
        let frame: RawFrame = serde_json::from_str(raw)?;

        let mut missing = Vec::new();
        if frame.timestamp.is_none() {
            missing.push(REQUIRED_FIELDS[0]);
        }
        if frame.exchange.is_none() {
            missing.push(REQUIRED_FIELDS[1]);
        }
        if frame.symbol.is_none() {
            missing.push(REQUIRED_FIELDS[2]);
        }
        if frame.asks.is_none() {
            missing.push(REQUIRED_FIELDS[3]);
        }
        if frame.bids.is_none() {
            missing.push(REQUIRED_FIELDS[4]);
        }

        match (frame.timestamp, frame.exchange, frame.symbol, frame.asks, frame.bids) {
            (Some(timestamp), Some(exchange), Some(symbol), Some(asks), Some(bids)) => {
                let timestamp = timestamp.to_datetime().ok_or_else(|| {
                    SimulatorError::ParseError(format!("Invalid timestamp: {:?}", timestamp))
                })?;
                Ok(RawSnapshot {
                    timestamp,
                    exchange,
                    symbol,
                    bids,
                    asks,
                    received_at,
                })
            }
            _ => Err(SimulatorError::IncompleteFrame { missing }),
        }
    }
}
