//! Result sinks
//!
//! A sink receives each finished `ResultRecord`. Display and storage live
//! behind this trait; the pipeline does not retain records.

use tokio::sync::mpsc;
use tracing::info;

use crate::cost::SlippageOutcome;
use crate::error::{Result, SimulatorError};
use crate::pipeline::ResultRecord;

#[cfg_attr(test, mockall::automock)]
pub trait ResultSink {
    fn publish(&mut self, record: &ResultRecord) -> Result<()>;
}

/// Writes every record as one structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn publish(&mut self, record: &ResultRecord) -> Result<()> {
        let estimate = &record.estimate;
        let slippage = match estimate.slippage {
            SlippageOutcome::Estimated(slippage) if slippage.is_partial() => {
                format!("{:.4} (partial fill)", slippage.slippage_usd)
            }
            SlippageOutcome::Estimated(slippage) => format!("{:.4}", slippage.slippage_usd),
            SlippageOutcome::InsufficientLiquidity => "insufficient liquidity".to_string(),
        };
        let net_cost = estimate
            .net_cost_usd
            .map(|net| format!("{:.4}", net))
            .unwrap_or_else(|| "unavailable".to_string());

        info!(
            asset = %estimate.instrument,
            order_type = %estimate.order.order_type,
            side = %estimate.order.side,
            order_size_usd = estimate.order.size_usd,
            volatility = estimate.volatility,
            impact_usd = estimate.impact_usd,
            slippage_usd = %slippage,
            fees_usd = estimate.fees_usd,
            maker_pct = estimate.maker_proportion * 100.0,
            taker_pct = estimate.taker_proportion * 100.0,
            net_cost_usd = %net_cost,
            latency_us = record.latency.as_micros() as u64,
            "Trade simulation output"
        );
        Ok(())
    }
}

/// Forwards records over a bounded channel
///
/// A full channel drops the newest record; consumers only care about the
/// latest estimate.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ResultRecord>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ResultRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn publish(&mut self, record: &ResultRecord) -> Result<()> {
        self.tx.try_send(record.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                SimulatorError::SinkError("Result channel full, record dropped".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                SimulatorError::SinkError("Result channel closed".to_string())
            }
        })
    }
}
