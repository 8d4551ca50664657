//! Expected market impact
//!
//! Power-law impact scaled by spread, volatility and top-of-book imbalance:
//!
//! `impact = k * volatility * (size / daily_volume)^beta * spread * imbalance_factor * size_usd`
//!
//! The daily volume is a liquidity proxy (visible depth times a multiplier),
//! not a traded-volume figure.

use serde::{Deserialize, Serialize};

use super::order::{OrderRequest, OrderSide};
use super::to_f64;
use crate::orderbook::{OrderBook, Side};

/// Tunable impact model coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactParams {
    /// Scale constant `k`
    pub scale: f64,
    /// Power-law exponent `beta`
    pub exponent: f64,
    /// Visible depth to daily volume multiplier
    pub daily_volume_multiplier: f64,
    /// Levels per side used for volume and imbalance
    pub depth: usize,
    /// Lower bound for the spread-derived volatility
    pub volatility_floor: f64,
    /// Relative spread to volatility multiplier
    pub spread_volatility_multiplier: f64,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            scale: 0.1,
            exponent: 0.6,
            daily_volume_multiplier: 100.0,
            depth: 5,
            volatility_floor: 0.01,
            spread_volatility_multiplier: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEstimate {
    pub impact_usd: f64,
    /// Volatility the estimate was computed with
    pub volatility: f64,
}

/// Estimate the impact of `order` against `book`
///
/// Returns zero impact when either side is empty or the book carries no
/// usable volume; the result is never negative.
pub fn market_impact(book: &OrderBook, order: &OrderRequest, params: &ImpactParams) -> ImpactEstimate {
    let fallback_volatility = order.volatility.unwrap_or(params.volatility_floor);
    let none = |volatility: f64| ImpactEstimate {
        impact_usd: 0.0,
        volatility,
    };

    let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) else {
        return none(fallback_volatility);
    };

    let best_bid = to_f64(bid.price);
    let best_ask = to_f64(ask.price);
    let mid_price = (best_bid + best_ask) / 2.0;
    if mid_price <= 0.0 {
        return none(fallback_volatility);
    }

    let spread = (best_ask - best_bid) / mid_price;
    let volatility = order.volatility.unwrap_or_else(|| {
        params
            .volatility_floor
            .max(spread * params.spread_volatility_multiplier)
    });

    let bid_volume = to_f64(book.volume(Side::Bid, params.depth));
    let ask_volume = to_f64(book.volume(Side::Ask, params.depth));
    let total_volume = bid_volume + ask_volume;
    if total_volume <= 0.0 {
        return none(volatility);
    }

    // More resting volume on the side the order consumes means less impact
    let opposite_volume = match order.side {
        OrderSide::Buy => ask_volume,
        OrderSide::Sell => bid_volume,
    };
    let imbalance_ratio = opposite_volume / total_volume;
    let imbalance_factor = (0.5 + 0.5 * (1.0 - imbalance_ratio)).clamp(0.5, 1.0);

    let order_size_base = order.size_usd / mid_price;
    let estimated_daily_volume_base = total_volume * params.daily_volume_multiplier;
    if estimated_daily_volume_base <= 0.0 {
        return none(volatility);
    }

    let relative_size = order_size_base / estimated_daily_volume_base;
    let impact_usd = params.scale
        * volatility
        * relative_size.powf(params.exponent)
        * spread
        * imbalance_factor
        * order.size_usd;

    ImpactEstimate {
        impact_usd: if impact_usd.is_finite() {
            impact_usd.max(0.0)
        } else {
            0.0
        },
        volatility,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawLevel;
    use chrono::Utc;

    fn book(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> OrderBook {
        let raw = |pairs: &[(&str, &str)]| -> Vec<RawLevel> {
            pairs.iter().map(|(p, s)| RawLevel::new(*p, *s)).collect()
        };
        OrderBook::from_raw("X", &raw(bids), &raw(asks), Utc::now(), 1).unwrap()
    }

    #[test]
    fn test_zero_when_side_empty() {
        let params = ImpactParams::default();
        let only_bids = book(&[("100", "2")], &[]);
        let only_asks = book(&[], &[("101", "2")]);
        let order = OrderRequest::market(OrderSide::Buy, 1_000.0);

        assert_eq!(market_impact(&only_bids, &order, &params).impact_usd, 0.0);
        assert_eq!(market_impact(&only_asks, &order, &params).impact_usd, 0.0);
    }

    #[test]
    fn test_matches_formula() {
        let params = ImpactParams::default();
        let book = book(&[("100", "2")], &[("101", "2")]);
        let order = OrderRequest::market(OrderSide::Buy, 50.0);

        let estimate = market_impact(&book, &order, &params);

        let mid = 100.5;
        let spread = 1.0 / mid;
        let volatility = (spread * 10.0_f64).max(0.01);
        let relative = (50.0 / mid) / 400.0;
        let expected = 0.1 * volatility * relative.powf(0.6) * spread * 0.75 * 50.0;

        assert!((estimate.volatility - volatility).abs() < 1e-12);
        assert!((estimate.impact_usd - expected).abs() < 1e-12);
        assert!(estimate.impact_usd > 0.0);
    }

    #[test]
    fn test_supplied_volatility_used() {
        let params = ImpactParams::default();
        let book = book(&[("100", "2")], &[("101", "2")]);
        let order = OrderRequest::market(OrderSide::Buy, 50.0).with_volatility(0.015);
        assert_eq!(market_impact(&book, &order, &params).volatility, 0.015);
    }

    #[test]
    fn test_volatility_floor() {
        let params = ImpactParams::default();
        // Spread of 0.01 on a 10_000 mid is far below the floor
        let book = book(&[("9999.995", "1")], &[("10000.005", "1")]);
        let order = OrderRequest::market(OrderSide::Sell, 100.0);
        assert_eq!(market_impact(&book, &order, &params).volatility, 0.01);
    }

    #[test]
    fn test_deeper_opposite_side_lowers_impact() {
        let params = ImpactParams::default();
        let ask_heavy = book(&[("100", "1")], &[("101", "3")]);
        let bid_heavy = book(&[("100", "3")], &[("101", "1")]);
        let order = OrderRequest::market(OrderSide::Buy, 500.0);

        let into_depth = market_impact(&ask_heavy, &order, &params).impact_usd;
        let into_thin = market_impact(&bid_heavy, &order, &params).impact_usd;
        assert!(into_depth < into_thin);
    }

    #[test]
    fn test_never_negative_on_crossed_book() {
        let params = ImpactParams::default();
        let crossed = book(&[("102", "1")], &[("101", "1")]);
        let order = OrderRequest::market(OrderSide::Buy, 500.0);
        assert_eq!(market_impact(&crossed, &order, &params).impact_usd, 0.0);
    }

    mod properties {
        use super::*;
        use crate::cost::arbitrary::arb_order;
        use crate::orderbook::arbitrary::arb_book;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_impact_never_negative(book in arb_book(), order in arb_order()) {
                let estimate = market_impact(&book, &order, &ImpactParams::default());

                prop_assert!(estimate.impact_usd.is_finite());
                prop_assert!(estimate.impact_usd >= 0.0);
            }
        }
    }
}
