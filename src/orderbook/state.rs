//! Shared order book state
//!
//! One writer (the ingestion path) swaps in whole snapshots; readers load the
//! current `Arc<OrderBook>` without locking and keep it for as long as they need.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::{OrderBook, PriceLevel, Side};
use crate::error::Result;
use crate::parser::RawLevel;

/// Current best-known ladder for the configured instrument
#[derive(Debug)]
pub struct BookState {
    instrument: String,
    current: ArcSwap<OrderBook>,
}

impl BookState {
    /// Create an empty book state
    pub fn new(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            current: ArcSwap::from_pointee(OrderBook::empty(instrument)),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Parse and atomically install a new ladder
    ///
    /// On error the previous snapshot stays in place. Returns the snapshot
    /// that was installed so the caller can compute on exactly that state.
    pub fn replace(
        &self,
        raw_bids: &[RawLevel],
        raw_asks: &[RawLevel],
        as_of: DateTime<Utc>,
    ) -> Result<Arc<OrderBook>> {
        let sequence = self.current.load().sequence() + 1;
        let book = Arc::new(OrderBook::from_raw(
            &self.instrument,
            raw_bids,
            raw_asks,
            as_of,
            sequence,
        )?);
        self.current.store(Arc::clone(&book));

        debug!(
            instrument = %self.instrument,
            sequence,
            bid_levels = book.levels(Side::Bid).len(),
            ask_levels = book.levels(Side::Ask).len(),
            "Order book replaced"
        );

        Ok(book)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<OrderBook> {
        self.current.load_full()
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.current.load().best_bid()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.current.load().best_ask()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        self.current.load().mid_price()
    }

    /// View over the first `depth` levels of a side of the current snapshot
    pub fn top_levels(&self, side: Side, depth: usize) -> TopLevels {
        TopLevels {
            book: self.snapshot(),
            side,
            depth,
        }
    }
}

/// Restartable view over the top of one side of a pinned snapshot
///
/// Later replacements do not affect a view that has already been taken.
#[derive(Debug, Clone)]
pub struct TopLevels {
    book: Arc<OrderBook>,
    side: Side,
    depth: usize,
}

impl TopLevels {
    pub fn iter(&self) -> std::slice::Iter<'_, PriceLevel> {
        self.as_slice().iter()
    }

    pub fn as_slice(&self) -> &[PriceLevel] {
        self.book.top_levels(self.side, self.depth)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<'a> IntoIterator for &'a TopLevels {
    type Item = &'a PriceLevel;
    type IntoIter = std::slice::Iter<'a, PriceLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulatorError;
    use rust_decimal_macros::dec;
    use std::thread;

    fn level(price: &str, size: &str) -> RawLevel {
        RawLevel::new(price, size)
    }

    #[test]
    fn test_starts_empty() {
        let state = BookState::new("BTC-USDT-SWAP");
        assert!(state.best_bid().is_none());
        assert!(state.best_ask().is_none());
        assert!(state.mid_price().is_none());
        assert_eq!(state.snapshot().sequence(), 0);
        assert!(state.top_levels(Side::Bid, 5).is_empty());
    }

    #[test]
    fn test_replace_installs_snapshot() {
        let state = BookState::new("X");
        let book = state
            .replace(&[level("100", "2")], &[level("101", "2")], Utc::now())
            .unwrap();
        assert_eq!(book.sequence(), 1);
        assert_eq!(state.mid_price(), Some(dec!(100.5)));
        assert_eq!(state.snapshot().as_ref(), book.as_ref());
    }

    #[test]
    fn test_failed_replace_retains_previous() {
        let state = BookState::new("X");
        state
            .replace(&[level("100", "2")], &[level("101", "2")], Utc::now())
            .unwrap();

        let result = state.replace(&[level("99", "oops")], &[level("102", "1")], Utc::now());
        assert!(matches!(result, Err(SimulatorError::ParseError(_))));
        assert_eq!(state.best_ask().map(|l| l.price), Some(dec!(101)));
        assert_eq!(state.snapshot().sequence(), 1);
    }

    #[test]
    fn test_top_levels_view_is_restartable_and_pinned() {
        let state = BookState::new("X");
        state
            .replace(
                &[level("100", "1"), level("99", "1"), level("98", "1")],
                &[level("101", "1")],
                Utc::now(),
            )
            .unwrap();

        let view = state.top_levels(Side::Bid, 2);
        let first: Vec<_> = view.iter().map(|l| l.price).collect();

        state
            .replace(&[level("50", "1")], &[level("51", "1")], Utc::now())
            .unwrap();

        let second: Vec<_> = (&view).into_iter().map(|l| l.price).collect();
        assert_eq!(first, vec![dec!(100), dec!(99)]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_readers_never_see_mixed_snapshots() {
        let state = Arc::new(BookState::new("X"));

        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 1..=2000u32 {
                    let size = i.to_string();
                    state
                        .replace(&[level("100", &size)], &[level("101", &size)], Utc::now())
                        .unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        let book = state.snapshot();
                        let bid = book.best_bid().map(|l| l.size);
                        let ask = book.best_ask().map(|l| l.size);
                        assert_eq!(bid, ask);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(state.snapshot().sequence(), 2000);
    }
}
