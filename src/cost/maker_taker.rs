//! Maker/taker fill proportion
//!
//! Market orders always take. Limit orders get a logistic score from how far
//! the limit price reaches across the spread and how much of the visible
//! liquidity the order would need.

use serde::{Deserialize, Serialize};

use super::order::{OrderRequest, OrderType};
use super::to_f64;
use crate::orderbook::{OrderBook, Side};

const INTERCEPT: f64 = -3.0;
const PRICE_AGGRESSION_WEIGHT: f64 = -5.0;
const SIZE_RATIO_WEIGHT: f64 = -2.0;
const VISIBLE_DEPTH: usize = 5;
const EPSILON: f64 = 1e-8;

/// Expected split of the fill between resting and aggressing liquidity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillSplit {
    pub maker: f64,
    pub taker: f64,
}

impl FillSplit {
    pub const ALL_TAKER: FillSplit = FillSplit {
        maker: 0.0,
        taker: 1.0,
    };

    pub const EVEN: FillSplit = FillSplit {
        maker: 0.5,
        taker: 0.5,
    };
}

pub fn maker_taker_split(book: &OrderBook, order: &OrderRequest) -> FillSplit {
    if order.order_type == OrderType::Market {
        return FillSplit::ALL_TAKER;
    }

    let (Some(bid), Some(ask), Some(limit_price)) =
        (book.best_bid(), book.best_ask(), order.limit_price)
    else {
        return FillSplit::EVEN;
    };

    let best_bid = to_f64(bid.price);
    let best_ask = to_f64(ask.price);
    let spread = (best_ask - best_bid).max(EPSILON);

    let facing = order.side.book_side();
    let reference_price = match facing {
        Side::Ask => best_ask,
        Side::Bid => best_bid,
    };

    // Positive when the limit crosses toward immediate execution
    let price_aggression = order.side.direction() * (limit_price - reference_price) / spread;

    let visible_usd = to_f64(book.notional(facing, VISIBLE_DEPTH));
    let size_ratio = (order.size_usd / visible_usd.max(EPSILON)).min(1.0);

    let z = INTERCEPT + PRICE_AGGRESSION_WEIGHT * price_aggression + SIZE_RATIO_WEIGHT * size_ratio;
    let maker = round4(sigmoid(z));

    FillSplit {
        maker,
        taker: round4(1.0 - maker),
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
