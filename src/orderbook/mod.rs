//! Order book module
//!
//! Holds the latest L2 snapshot for the configured instrument. Every inbound
//! frame replaces the ladder wholesale; readers always see one snapshot.

#[cfg(test)]
pub(crate) mod arbitrary;
mod book;
mod metrics;
mod state;

pub use book::OrderBook;
pub use metrics::OrderBookMetrics;
pub use state::{BookState, TopLevels};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

/// A single level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    /// Quote-currency value resting at this level, `None` if unrepresentable
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.size)
    }
}
