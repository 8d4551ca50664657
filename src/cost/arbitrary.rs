//! Proptest strategies for order requests

use proptest::prelude::*;

use super::order::{OrderRequest, OrderSide};

pub fn arb_side() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
}

/// Market or limit order, with or without a caller volatility
pub fn arb_order() -> impl Strategy<Value = OrderRequest> {
    (
        arb_side(),
        0.0f64..50_000.0,
        prop::option::of(0.0f64..50.0),
        prop::option::of(0.0f64..0.2),
    )
        .prop_map(|(side, size_usd, limit_price, volatility)| {
            let order = match limit_price {
                Some(limit_price) => OrderRequest::limit(side, size_usd, limit_price),
                None => OrderRequest::market(side, size_usd),
            };
            match volatility {
                Some(volatility) => order.with_volatility(volatility),
                None => order,
            }
        })
}
