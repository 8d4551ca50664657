//! WebSocket module for the L2 feed connection
//!
//! The connection state machine talks to the transport through the
//! `Connector` / `FrameSink` / `FrameSource` traits. Splitting the send half
//! from the receive half lets the heartbeat write while the receive loop is
//! parked on the next frame.

mod client;
mod connection;
mod latency;

pub use client::WebSocketConnector;
pub use connection::{FeedConnection, FeedSettings};
pub use latency::LatencyTracker;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::Result;

/// Lifecycle of a feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Opens a transport session
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)>;
}

/// Outbound half of a session
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    async fn close(&mut self);
}

/// Inbound half of a session
#[async_trait]
pub trait FrameSource: Send {
    /// Receive the next frame
    ///
    /// `Ok(Some)` carries a data frame, `Ok(None)` a control frame with no
    /// payload for the pipeline. An error means the session is closed or
    /// broken and must be re-established.
    async fn recv(&mut self) -> Result<Option<String>>;
}
