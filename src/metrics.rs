//! Prometheus counters for the feed and the pipeline

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

use crate::error::{Result, SimulatorError};

/// Operational counters, registered on a private registry
pub struct Metrics {
    registry: Registry,
    pub frames_received: IntCounter,
    pub frames_dropped: IntCounter,
    pub book_parse_errors: IntCounter,
    pub connect_attempts: IntCounter,
    pub heartbeat_failures: IntCounter,
    pub ticks_emitted: IntCounter,
    pub insufficient_liquidity: IntCounter,
    pub pipeline_latency_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let frames_received = counter("feed_frames_received_total", "Text frames received from the feed")?;
        let frames_dropped = counter(
            "feed_frames_dropped_total",
            "Frames dropped as malformed, incomplete or for another symbol",
        )?;
        let book_parse_errors = counter(
            "book_parse_errors_total",
            "Snapshots rejected because of invalid price or size values",
        )?;
        let connect_attempts = counter("feed_connect_attempts_total", "Connection attempts made")?;
        let heartbeat_failures = counter("feed_heartbeat_failures_total", "Heartbeat frames that failed to send")?;
        let ticks_emitted = counter("cost_ticks_emitted_total", "Result records handed to the sink")?;
        let insufficient_liquidity = counter(
            "cost_insufficient_liquidity_total",
            "Ticks where slippage could not be computed",
        )?;

        let pipeline_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pipeline_latency_seconds",
                "Frame receipt to result record latency",
            )
            .buckets(vec![
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05,
            ]),
        )?;
        registry.register(Box::new(pipeline_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            frames_received,
            frames_dropped,
            book_parse_errors,
            connect_attempts,
            heartbeat_failures,
            ticks_emitted,
            insufficient_liquidity,
            pipeline_latency_seconds,
        })
    }

    /// Prometheus text exposition of every metric
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| SimulatorError::MetricsError(e.to_string()))
    }
}
