//! Top-of-book summary carried alongside each cost estimate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderBook, Side};

/// Levels per side included in the imbalance and near-touch notional
pub const SUMMARY_DEPTH: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMetrics {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub mid_price: Option<Decimal>,
    pub spread_bps: Option<Decimal>,
    /// (bid - ask) / (bid + ask) size over the top levels
    pub imbalance: Option<Decimal>,
    /// Quote notional resting within the top levels
    pub bid_notional: Decimal,
    pub ask_notional: Decimal,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub crossed: bool,
}

impl OrderBookMetrics {
    pub fn from_book(book: &OrderBook) -> Self {
        Self {
            best_bid: book.best_bid().map(|level| level.price),
            best_ask: book.best_ask().map(|level| level.price),
            mid_price: book.mid_price(),
            spread_bps: book.spread_bps(),
            imbalance: book.imbalance(SUMMARY_DEPTH),
            bid_notional: book.notional(Side::Bid, SUMMARY_DEPTH),
            ask_notional: book.notional(Side::Ask, SUMMARY_DEPTH),
            bid_levels: book.levels(Side::Bid).len(),
            ask_levels: book.levels(Side::Ask).len(),
            crossed: book.is_crossed(),
        }
    }

    /// Both sides quoted and not crossed
    pub fn is_two_sided(&self) -> bool {
        self.bid_levels > 0 && self.ask_levels > 0 && !self.crossed
    }
}
