//! L2 Cost Simulator Library
//!
//! Streams full-depth order book snapshots from a WebSocket feed, keeps the
//! latest book for one instrument and estimates the execution cost of a
//! hypothetical order on every tick.

pub mod config;
pub mod cost;
pub mod error;
pub mod metrics;
pub mod orderbook;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod websocket;

pub use config::Config;
pub use cost::{CostEstimate, CostModel, FeeSchedule, OrderRequest, SlippageOutcome};
pub use error::{Result, SimulatorError};
pub use metrics::Metrics;
pub use orderbook::{BookState, OrderBook, OrderBookMetrics, PriceLevel, Side};
pub use parser::{RawLevel, RawSnapshot};
pub use pipeline::{IngestionPipeline, ResultRecord};
pub use sink::{ChannelSink, ResultSink, TracingSink};
pub use websocket::{ConnectionState, FeedConnection, FeedSettings, WebSocketConnector};
