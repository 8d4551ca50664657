//! Proptest strategies for wire ladders and the books built from them

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::OrderBook;
use crate::parser::RawLevel;

/// (price in tenths, size in hundredths) pairs
///
/// The price range is narrow so repeated prices are common, and about one
/// level in five has zero size.
pub fn arb_ladder() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec(
        (1i64..400, prop_oneof![1 => Just(0i64), 4 => 1i64..100_000]),
        0..24,
    )
}

pub fn to_raw(ladder: &[(i64, i64)]) -> Vec<RawLevel> {
    ladder
        .iter()
        .map(|&(tenths, hundredths)| {
            RawLevel::new(
                Decimal::new(tenths, 1).to_string(),
                Decimal::new(hundredths, 2).to_string(),
            )
        })
        .collect()
}

/// Empty, one-sided, two-sided and crossed books alike
pub fn arb_book() -> impl Strategy<Value = OrderBook> {
    (arb_ladder(), arb_ladder()).prop_map(|(bids, asks)| {
        OrderBook::from_raw("BTC-USDT-SWAP", &to_raw(&bids), &to_raw(&asks), Utc::now(), 1)
            .expect("generated ladders are always valid")
    })
}
