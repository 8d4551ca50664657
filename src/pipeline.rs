//! Ingestion pipeline
//!
//! Takes each decoded snapshot through book replacement and the cost model,
//! then hands the finished record to the sink. Runs on the feed task, so one
//! snapshot is fully processed before the next is looked at.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cost::{CostEstimate, CostModel, OrderRequest, SlippageOutcome};
use crate::error::{Result, SimulatorError};
use crate::metrics::Metrics;
use crate::orderbook::BookState;
use crate::parser::RawSnapshot;
use crate::sink::ResultSink;

/// One output tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    #[serde(flatten)]
    pub estimate: CostEstimate,
    /// From frame receipt to the finished estimate
    #[serde(rename = "latency_us", serialize_with = "serialize_micros")]
    pub latency: Duration,
}

fn serialize_micros<S>(latency: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(latency.as_micros() as u64)
}

pub struct IngestionPipeline<S: ResultSink> {
    book: Arc<BookState>,
    model: CostModel,
    order: OrderRequest,
    sink: S,
    metrics: Arc<Metrics>,
}

impl<S: ResultSink> IngestionPipeline<S> {
    pub fn new(
        book: Arc<BookState>,
        model: CostModel,
        order: OrderRequest,
        sink: S,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            book,
            model,
            order,
            sink,
            metrics,
        }
    }

    pub fn book(&self) -> &Arc<BookState> {
        &self.book
    }

    /// Snapshot handler for `FeedConnection::run`
    ///
    /// Failures are logged and counted; the feed keeps going.
    pub fn on_snapshot(&mut self, snapshot: RawSnapshot) {
        match self.ingest(snapshot) {
            Ok(record) => debug!(
                sequence = record.estimate.book_sequence,
                latency_us = record.latency.as_micros() as u64,
                "Tick processed"
            ),
            Err(e @ SimulatorError::SymbolMismatch { .. }) => {
                warn!(error = %e, "Frame for another instrument, dropped")
            }
            Err(e @ SimulatorError::ParseError(_)) => {
                warn!(error = %e, "Malformed book, keeping previous state")
            }
            Err(e) => warn!(error = %e, "Failed to publish result"),
        }
    }

    /// Replace the book, run the cost model on that exact book and publish
    pub fn ingest(&mut self, snapshot: RawSnapshot) -> Result<ResultRecord> {
        if snapshot.symbol != self.book.instrument() {
            self.metrics.frames_dropped.inc();
            return Err(SimulatorError::SymbolMismatch {
                expected: self.book.instrument().to_string(),
                got: snapshot.symbol,
            });
        }

        let book = self
            .book
            .replace(&snapshot.bids, &snapshot.asks, snapshot.timestamp)
            .inspect_err(|_| self.metrics.book_parse_errors.inc())?;

        let estimate = self.model.evaluate(&book, &self.order);
        if estimate.slippage == SlippageOutcome::InsufficientLiquidity {
            self.metrics.insufficient_liquidity.inc();
        }

        let latency = snapshot.received_at.elapsed();
        self.metrics
            .pipeline_latency_seconds
            .observe(latency.as_secs_f64());

        let record = ResultRecord { estimate, latency };
        self.sink.publish(&record)?;
        self.metrics.ticks_emitted.inc();

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{FeeSchedule, ImpactParams, OrderSide};
    use crate::parser::RawLevel;
    use crate::sink::MockResultSink;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::time::Instant;

    const INSTRUMENT: &str = "BTC-USDT-SWAP";

    fn snapshot(symbol: &str, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> RawSnapshot {
        let raw = |pairs: &[(&str, &str)]| -> Vec<RawLevel> {
            pairs.iter().map(|(p, s)| RawLevel::new(*p, *s)).collect()
        };
        RawSnapshot {
            timestamp: Utc::now(),
            exchange: "OKX".to_string(),
            symbol: symbol.to_string(),
            bids: raw(bids),
            asks: raw(asks),
            received_at: Instant::now(),
        }
    }

    fn pipeline(sink: MockResultSink) -> (IngestionPipeline<MockResultSink>, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let model =
            CostModel::new(&FeeSchedule::builtin(), "OKX", "VIP0", ImpactParams::default()).unwrap();
        let pipeline = IngestionPipeline::new(
            Arc::new(BookState::new(INSTRUMENT)),
            model,
            OrderRequest::market(OrderSide::Buy, 50.0),
            sink,
            Arc::clone(&metrics),
        );
        (pipeline, metrics)
    }

    #[test]
    fn test_publishes_estimate_for_installed_book() {
        let mut sink = MockResultSink::new();
        sink.expect_publish()
            .withf(|record| {
                record.estimate.book_sequence == 1 && record.estimate.net_cost_usd.is_some()
            })
            .times(1)
            .returning(|_| Ok(()));
        let (mut pipeline, metrics) = pipeline(sink);

        let record = pipeline
            .ingest(snapshot(INSTRUMENT, &[("100", "2")], &[("101", "2")]))
            .unwrap();

        assert_eq!(record.estimate.book.best_ask, Some(dec!(101)));
        assert_eq!(pipeline.book().snapshot().sequence(), 1);
        assert_eq!(metrics.ticks_emitted.get(), 1);
        assert_eq!(metrics.pipeline_latency_seconds.get_sample_count(), 1);
    }

    #[test]
    fn test_malformed_book_keeps_previous_state() {
        let mut sink = MockResultSink::new();
        sink.expect_publish().times(1).returning(|_| Ok(()));
        let (mut pipeline, metrics) = pipeline(sink);

        pipeline
            .ingest(snapshot(INSTRUMENT, &[("100", "2")], &[("101", "2")]))
            .unwrap();
        let result = pipeline.ingest(snapshot(INSTRUMENT, &[("abc", "2")], &[("101", "2")]));

        assert!(matches!(result, Err(SimulatorError::ParseError(_))));
        assert_eq!(pipeline.book().snapshot().sequence(), 1);
        assert_eq!(pipeline.book().best_bid().map(|l| l.price), Some(dec!(100)));
        assert_eq!(metrics.book_parse_errors.get(), 1);
        assert_eq!(metrics.ticks_emitted.get(), 1);
    }

    #[test]
    fn test_oversized_level_rejected_without_panic() {
        let mut sink = MockResultSink::new();
        sink.expect_publish().times(1).returning(|_| Ok(()));
        let (mut pipeline, metrics) = pipeline(sink);

        pipeline
            .ingest(snapshot(INSTRUMENT, &[("100", "2")], &[("101", "2")]))
            .unwrap();
        let result = pipeline.ingest(snapshot(
            INSTRUMENT,
            &[("100", "2")],
            &[("1000000000000000000000", "1000000000")],
        ));

        assert!(matches!(result, Err(SimulatorError::ParseError(_))));
        assert_eq!(pipeline.book().best_ask().map(|l| l.price), Some(dec!(101)));
        assert_eq!(metrics.book_parse_errors.get(), 1);
    }

    #[test]
    fn test_other_symbol_is_dropped() {
        let mut sink = MockResultSink::new();
        sink.expect_publish().never();
        let (mut pipeline, metrics) = pipeline(sink);

        let result = pipeline.ingest(snapshot("ETH-USDT-SWAP", &[("100", "2")], &[("101", "2")]));

        assert!(matches!(result, Err(SimulatorError::SymbolMismatch { .. })));
        assert_eq!(pipeline.book().snapshot().sequence(), 0);
        assert_eq!(metrics.frames_dropped.get(), 1);
    }

    #[test]
    fn test_empty_side_still_published() {
        let mut sink = MockResultSink::new();
        sink.expect_publish()
            .withf(|record| {
                record.estimate.slippage == SlippageOutcome::InsufficientLiquidity
                    && record.estimate.net_cost_usd.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));
        let (mut pipeline, metrics) = pipeline(sink);

        pipeline
            .ingest(snapshot(INSTRUMENT, &[("100", "2")], &[]))
            .unwrap();

        assert_eq!(metrics.insufficient_liquidity.get(), 1);
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let mut sink = MockResultSink::new();
        sink.expect_publish()
            .returning(|_| Err(SimulatorError::SinkError("closed".to_string())));
        let (mut pipeline, metrics) = pipeline(sink);

        let result = pipeline.ingest(snapshot(INSTRUMENT, &[("100", "2")], &[("101", "2")]));

        assert!(matches!(result, Err(SimulatorError::SinkError(_))));
        // The book was still replaced
        assert_eq!(pipeline.book().snapshot().sequence(), 1);
        assert_eq!(metrics.ticks_emitted.get(), 0);
    }

    #[test]
    fn test_record_serializes_latency_in_micros() {
        let mut sink = MockResultSink::new();
        sink.expect_publish().returning(|_| Ok(()));
        let (mut pipeline, _) = pipeline(sink);

        let mut record = pipeline
            .ingest(snapshot(INSTRUMENT, &[("100", "2")], &[("101", "2")]))
            .unwrap();
        record.latency = Duration::from_micros(1250);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["latency_us"], 1250);
        assert_eq!(json["instrument"], INSTRUMENT);
        assert_eq!(json["slippage"]["status"], "estimated");
    }
}
