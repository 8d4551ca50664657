//! Cost model stage
//!
//! Pure functions over an order book snapshot and an order request. Each
//! estimate is computed independently; `CostModel` only holds the resolved fee
//! rates and the impact coefficients.

#[cfg(test)]
pub(crate) mod arbitrary;
mod fees;
mod impact;
mod maker_taker;
mod order;
mod slippage;

pub use fees::{expected_fees, FeeRates, FeeSchedule};
pub use impact::{market_impact, ImpactEstimate, ImpactParams};
pub use maker_taker::{maker_taker_split, FillSplit};
pub use order::{OrderRequest, OrderSide, OrderType};
pub use slippage::{expected_slippage, SlippageEstimate};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::orderbook::{OrderBook, OrderBookMetrics};

/// Slippage result as reported downstream
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlippageOutcome {
    Estimated(SlippageEstimate),
    InsufficientLiquidity,
}

impl SlippageOutcome {
    pub fn slippage_usd(&self) -> Option<f64> {
        match self {
            SlippageOutcome::Estimated(estimate) => Some(estimate.slippage_usd),
            SlippageOutcome::InsufficientLiquidity => None,
        }
    }
}

/// Every cost figure for one order against one book snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub instrument: String,
    pub exchange: String,
    pub fee_tier: String,
    pub as_of: Option<DateTime<Utc>>,
    pub book_sequence: u64,
    pub order: OrderRequest,
    pub volatility: f64,
    pub impact_usd: f64,
    pub slippage: SlippageOutcome,
    pub fees_usd: f64,
    pub maker_proportion: f64,
    pub taker_proportion: f64,
    /// `None` when slippage could not be computed
    pub net_cost_usd: Option<f64>,
    pub book: OrderBookMetrics,
}

/// Pre-trade cost model bound to one exchange fee tier
#[derive(Debug, Clone)]
pub struct CostModel {
    exchange: String,
    fee_tier: String,
    rates: FeeRates,
    impact: ImpactParams,
}

impl CostModel {
    /// Resolve the fee tier up front so a bad tier fails at startup
    pub fn new(
        schedule: &FeeSchedule,
        exchange: &str,
        fee_tier: &str,
        impact: ImpactParams,
    ) -> Result<Self> {
        let rates = schedule.rates(exchange, fee_tier)?;
        info!(
            exchange,
            fee_tier,
            maker_rate = rates.maker,
            taker_rate = rates.taker,
            "Cost model ready"
        );

        Ok(Self {
            exchange: exchange.to_string(),
            fee_tier: fee_tier.to_string(),
            rates,
            impact,
        })
    }

    /// Compute every estimate for `order` against `book`
    ///
    /// Deterministic: the same snapshot and order always give the same result.
    pub fn evaluate(&self, book: &OrderBook, order: &OrderRequest) -> CostEstimate {
        let impact = market_impact(book, order, &self.impact);

        let slippage = expected_slippage(book, order)
            .map_or(SlippageOutcome::InsufficientLiquidity, SlippageOutcome::Estimated);

        let split = maker_taker_split(book, order);
        let fees_usd = expected_fees(split, order.size_usd, self.rates);
        let net_cost_usd = slippage
            .slippage_usd()
            .map(|slippage_usd| slippage_usd + impact.impact_usd + fees_usd);

        CostEstimate {
            instrument: book.instrument().to_string(),
            exchange: self.exchange.clone(),
            fee_tier: self.fee_tier.clone(),
            as_of: book.as_of(),
            book_sequence: book.sequence(),
            order: order.clone(),
            volatility: impact.volatility,
            impact_usd: impact.impact_usd,
            slippage,
            fees_usd,
            maker_proportion: split.maker,
            taker_proportion: split.taker,
            net_cost_usd,
            book: book.metrics(),
        }
    }
}

/// Book quantities are exact decimals; the models run in floating point.
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
