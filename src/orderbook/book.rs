//! Immutable order book snapshot
//!
//! Uses BTreeMap while building so that duplicate prices collapse and both
//! sides come out sorted; the finished ladder is stored as plain vectors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::{OrderBookMetrics, PriceLevel, Side};
use crate::error::{Result, SimulatorError};
use crate::parser::RawLevel;

/// Point-in-time L2 ladder for a single instrument
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    instrument: String,
    /// Bids sorted by price descending (highest first)
    bids: Vec<PriceLevel>,
    /// Asks sorted by price ascending (lowest first)
    asks: Vec<PriceLevel>,
    /// Exchange timestamp of the frame this book was built from
    as_of: Option<DateTime<Utc>>,
    /// Number of snapshots applied before and including this one
    sequence: u64,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn empty(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            ..Default::default()
        }
    }

    /// Build a book from wire levels
    ///
    /// Zero-size levels are dropped. A repeated price keeps the value of its
    /// last occurrence, including a trailing zero that removes it.
    pub fn from_raw(
        instrument: &str,
        raw_bids: &[RawLevel],
        raw_asks: &[RawLevel],
        as_of: DateTime<Utc>,
        sequence: u64,
    ) -> Result<Self> {
        let mut bids: BTreeMap<Reverse<Decimal>, Decimal> = BTreeMap::new();
        let mut asks: BTreeMap<Decimal, Decimal> = BTreeMap::new();

        for raw in raw_bids {
            let level = parse_level(raw)?;
            if level.size == Decimal::ZERO {
                bids.remove(&Reverse(level.price));
            } else {
                bids.insert(Reverse(level.price), level.size);
            }
        }

        for raw in raw_asks {
            let level = parse_level(raw)?;
            if level.size == Decimal::ZERO {
                asks.remove(&level.price);
            } else {
                asks.insert(level.price, level.size);
            }
        }

        let bids: Vec<PriceLevel> = bids
            .into_iter()
            .map(|(Reverse(price), size)| PriceLevel { price, size })
            .collect();
        let asks: Vec<PriceLevel> = asks
            .into_iter()
            .map(|(price, size)| PriceLevel { price, size })
            .collect();

        // Every depth aggregate is a prefix of these totals, so none can overflow
        for (side, levels) in [(Side::Bid, &bids), (Side::Ask, &asks)] {
            if side_totals(levels).is_none() {
                return Err(SimulatorError::ParseError(format!(
                    "{} side totals exceed the representable range",
                    side.as_str()
                )));
            }
        }

        Ok(Self {
            instrument: instrument.to_string(),
            bids,
            asks,
            as_of: Some(as_of),
            sequence,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn as_of(&self) -> Option<DateTime<Utc>> {
        self.as_of
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// All levels of one side, best price first
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// First `depth` levels of one side (fewer if the side is shallower)
    pub fn top_levels(&self, side: Side, depth: usize) -> &[PriceLevel] {
        let levels = self.levels(side);
        &levels[..depth.min(levels.len())]
    }

    /// Get best bid level
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    /// Get best ask level
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    /// Best level of the given side
    pub fn best(&self, side: Side) -> Option<PriceLevel> {
        self.levels(side).first().copied()
    }

    /// Get mid price
    ///
    /// `None` when a side is empty or the sum of the touch prices overflows.
    pub fn mid_price(&self) -> Option<Decimal> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        bid.price
            .checked_add(ask.price)
            .map(|sum| sum / Decimal::from(2))
    }

    /// Get spread in basis points
    pub fn spread_bps(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask(), self.mid_price()) {
            (Some(bid), Some(ask), Some(mid)) if mid > Decimal::ZERO => {
                Some((ask.price - bid.price) / mid * Decimal::from(10000))
            }
            _ => None,
        }
    }

    /// Summed size over the first `depth` levels of a side
    pub fn volume(&self, side: Side, depth: usize) -> Decimal {
        side_totals(self.top_levels(side, depth))
            .map_or(Decimal::MAX, |(volume, _)| volume)
    }

    /// Summed quote value over the first `depth` levels of a side
    pub fn notional(&self, side: Side, depth: usize) -> Decimal {
        side_totals(self.top_levels(side, depth))
            .map_or(Decimal::MAX, |(_, notional)| notional)
    }

    /// Calculate order book imbalance at top N levels
    pub fn imbalance(&self, levels: usize) -> Option<Decimal> {
        let bid_volume = self.volume(Side::Bid, levels);
        let ask_volume = self.volume(Side::Ask, levels);

        let total = bid_volume.checked_add(ask_volume)?;
        if total > Decimal::ZERO {
            Some((bid_volume - ask_volume) / total)
        } else {
            None
        }
    }

    /// Best bid at or above best ask
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    pub fn metrics(&self) -> OrderBookMetrics {
        OrderBookMetrics::from_book(self)
    }
}

/// Summed size and notional of `levels`, `None` on overflow
fn side_totals(levels: &[PriceLevel]) -> Option<(Decimal, Decimal)> {
    levels
        .iter()
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(volume, notional), level| {
            Some((
                volume.checked_add(level.size)?,
                notional.checked_add(level.notional()?)?,
            ))
        })
}

fn parse_level(raw: &RawLevel) -> Result<PriceLevel> {
    let price = Decimal::from_str(raw.price.trim()).map_err(|e| {
        SimulatorError::ParseError(format!("Invalid price '{}': {}", raw.price, e))
    })?;
    let size = Decimal::from_str(raw.size.trim()).map_err(|e| {
        SimulatorError::ParseError(format!("Invalid size '{}': {}", raw.size, e))
    })?;

    if price <= Decimal::ZERO {
        return Err(SimulatorError::ParseError(format!(
            "Price must be positive, got {}",
            price
        )));
    }
    if size < Decimal::ZERO {
        return Err(SimulatorError::ParseError(format!(
            "Size must not be negative, got {}",
            size
        )));
    }

    Ok(PriceLevel { price, size })
}
