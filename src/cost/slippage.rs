//! Expected slippage from walking the visible book
//!
//! For a buy the asks are consumed from the best price outward until the
//! order's notional is spent; slippage is the distance of the resulting
//! volume-weighted price from the best ask, applied to the notional.
//! Sells walk the bids and mirror the sign.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::order::{OrderRequest, OrderSide};
use super::to_f64;
use crate::error::{Result, SimulatorError};
use crate::orderbook::OrderBook;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageEstimate {
    pub slippage_usd: f64,
    /// Volume-weighted execution price over the consumed levels
    pub average_price: f64,
    /// Notional actually matched against the book
    pub filled_usd: f64,
    /// Notional left over once the book side ran out
    pub unfilled_usd: f64,
}

impl SlippageEstimate {
    /// True when the book side was depleted before the order was filled
    pub fn is_partial(&self) -> bool {
        self.unfilled_usd > 0.0
    }
}

/// Walk the side of `book` that `order` executes against
///
/// Fails with `InsufficientLiquidity` when nothing at all can be matched.
/// When the side runs out part way, the estimate covers the matched notional
/// only and reports the remainder in `unfilled_usd`.
pub fn expected_slippage(book: &OrderBook, order: &OrderRequest) -> Result<SlippageEstimate> {
    let side = order.side.book_side();
    let levels = book.levels(side);

    let best_price = match book.best(side) {
        Some(level) => to_f64(level.price),
        None => {
            return Err(SimulatorError::InsufficientLiquidity {
                side: side.as_str(),
            })
        }
    };

    if order.size_usd <= 0.0 {
        return Ok(SlippageEstimate {
            slippage_usd: 0.0,
            average_price: best_price,
            filled_usd: 0.0,
            unfilled_usd: 0.0,
        });
    }

    let mut remaining = order.size_usd;
    let mut weighted_sum = 0.0;
    let mut total_quantity = 0.0;

    for level in levels {
        let price = to_f64(level.price);
        let quantity = to_f64(level.size);
        let level_value = price * quantity;

        if remaining <= level_value {
            // Only part of this level is needed
            let needed = remaining / price;
            weighted_sum += needed * price;
            total_quantity += needed;
            remaining = 0.0;
            break;
        }

        weighted_sum += level_value;
        total_quantity += quantity;
        remaining -= level_value;
    }

    if total_quantity <= 0.0 {
        return Err(SimulatorError::InsufficientLiquidity {
            side: side.as_str(),
        });
    }

    let average_price = weighted_sum / total_quantity;
    let filled_usd = order.size_usd - remaining;
    if remaining > 0.0 {
        warn!(
            side = side.as_str(),
            filled_usd,
            unfilled_usd = remaining,
            "Not enough liquidity in the order book, slippage covers the filled part only"
        );
    }

    let relative = match order.side {
        OrderSide::Buy => (average_price - best_price) / best_price,
        OrderSide::Sell => (best_price - average_price) / best_price,
    };

    Ok(SlippageEstimate {
        slippage_usd: (relative * filled_usd).max(0.0),
        average_price,
        filled_usd,
        unfilled_usd: remaining,
    })
}
