//! Error types for the cost simulator

use thiserror::Error;

/// Cost simulator errors
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Frame is missing required fields: {missing:?}")]
    IncompleteFrame { missing: Vec<&'static str> },

    #[error("Frame for symbol {got}, expected {expected}")]
    SymbolMismatch { expected: String, got: String },

    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    #[error("WebSocket message error: {0}")]
    WebSocketMessage(String),

    #[error("Connection attempts exhausted after {attempts} tries")]
    ConnectionExhausted { attempts: u32 },

    #[error("Insufficient liquidity on the {side} side")]
    InsufficientLiquidity { side: &'static str },

    #[error("No fee tier {tier} configured for exchange {exchange}")]
    UnknownFeeTier { exchange: String, tier: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Sink error: {0}")]
    SinkError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SimulatorError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SimulatorError::WebSocketConnection(err.to_string())
    }
}

impl From<serde_json::Error> for SimulatorError {
    fn from(err: serde_json::Error) -> Self {
        SimulatorError::ParseError(err.to_string())
    }
}

impl From<config::ConfigError> for SimulatorError {
    fn from(err: config::ConfigError) -> Self {
        SimulatorError::ConfigError(err.to_string())
    }
}

impl From<prometheus::Error> for SimulatorError {
    fn from(err: prometheus::Error) -> Self {
        SimulatorError::MetricsError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimulatorError>;
