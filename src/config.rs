//! Configuration module for the cost simulator

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cost::{FeeSchedule, OrderRequest, OrderSide, OrderType};
use crate::error::Result;
use crate::websocket::FeedSettings;

const DEFAULT_WS_ENDPOINT: &str =
    "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook/okx/BTC-USDT-SWAP";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// L2 snapshot stream
    pub ws_endpoint: String,

    /// Venue name used for the fee lookup
    pub exchange: String,

    /// Instrument tracked by the book
    pub symbol: String,

    pub fee_tier: String,

    /// Order to estimate
    pub order_side: String,
    pub order_type: String,
    pub order_size_usd: f64,
    pub limit_price: Option<f64>,
    pub volatility: Option<f64>,

    /// Feed liveness and reconnection settings
    pub heartbeat_interval_secs: u64,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,

    /// Optional fee table overriding the built-in one
    pub fee_schedule_path: Option<PathBuf>,

    /// Port for /health and /metrics
    pub health_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            ws_endpoint: env::var("WS_ENDPOINT").unwrap_or(defaults.ws_endpoint),
            exchange: env::var("EXCHANGE").unwrap_or(defaults.exchange),
            symbol: env::var("SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .unwrap_or(defaults.symbol),
            fee_tier: env::var("FEE_TIER").unwrap_or(defaults.fee_tier),
            order_side: env::var("ORDER_SIDE").unwrap_or(defaults.order_side),
            order_type: env::var("ORDER_TYPE").unwrap_or(defaults.order_type),
            order_size_usd: parse_or("ORDER_SIZE_USD", defaults.order_size_usd),
            limit_price: parse_optional("LIMIT_PRICE"),
            volatility: parse_optional("VOLATILITY"),
            heartbeat_interval_secs: parse_or(
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval_secs,
            ),
            reconnect_delay_ms: parse_or("RECONNECT_DELAY_MS", defaults.reconnect_delay_ms),
            max_reconnect_attempts: parse_or(
                "MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            fee_schedule_path: env::var("FEE_SCHEDULE_PATH").ok().map(PathBuf::from),
            health_port: parse_or("HEALTH_PORT", defaults.health_port),
        };

        // Surface a bad side or type now rather than on the first tick
        config.order_request()?;
        Ok(config)
    }

    /// The order every tick is evaluated for
    pub fn order_request(&self) -> Result<OrderRequest> {
        let side = OrderSide::from_str(&self.order_side)?;
        let size = self.order_size_usd;
        let order = match (OrderType::from_str(&self.order_type)?, self.limit_price) {
            (OrderType::Market, _) => OrderRequest::market(side, size),
            (OrderType::Limit, Some(price)) => OrderRequest::limit(side, size, price),
            // Accepted; the maker/taker split falls back to even
            (OrderType::Limit, None) => OrderRequest {
                order_type: OrderType::Limit,
                ..OrderRequest::market(side, size)
            },
        };

        Ok(match self.volatility {
            Some(volatility) => order.with_volatility(volatility),
            None => order,
        })
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }

    /// Fee table from `fee_schedule_path`, or the built-in tiers
    pub fn fee_schedule(&self) -> Result<FeeSchedule> {
        match &self.fee_schedule_path {
            Some(path) => FeeSchedule::from_file(path),
            None => Ok(FeeSchedule::builtin()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            exchange: "OKX".to_string(),
            symbol: "BTC-USDT-SWAP".to_string(),
            fee_tier: "VIP0".to_string(),
            order_side: "buy".to_string(),
            order_type: "market".to_string(),
            order_size_usd: 100.0,
            limit_price: None,
            volatility: None,
            heartbeat_interval_secs: 30,
            reconnect_delay_ms: 5000,
            max_reconnect_attempts: 10,
            fee_schedule_path: None,
            health_port: 9090,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| parse_value(&value))
        .unwrap_or(default)
}

fn parse_optional<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| parse_value(&value))
}

fn parse_value<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}
