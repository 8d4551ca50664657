//! WebSocket client for the L2 snapshot stream
//!
//! Handles the handshake and frame reception over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use super::{Connector, FrameSink, FrameSource};
use crate::error::{Result, SimulatorError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a WebSocket endpoint that pushes full book snapshots
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    endpoint: String,
}

impl WebSocketConnector {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)> {
        info!(url = %self.endpoint, "Connecting to WebSocket");

        let (ws_stream, response) = connect_async(self.endpoint.as_str()).await?;

        info!(status = ?response.status(), "WebSocket connected");

        let (sink, stream) = ws_stream.split();
        Ok((
            Box::new(WebSocketSink { sink }),
            Box::new(WebSocketSource { stream }),
        ))
    }
}

struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| SimulatorError::WebSocketMessage(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

struct WebSocketSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn recv(&mut self) -> Result<Option<String>> {
        match self.stream.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!(len = text.len(), "Received text message");
                Ok(Some(text))
            }
            Some(Ok(Message::Binary(data))) => {
                // Convert binary to text if needed
                let text = String::from_utf8_lossy(&data).to_string();
                Ok(Some(text))
            }
            Some(Ok(Message::Ping(_))) => {
                // tungstenite queues the pong itself
                debug!("Received ping");
                Ok(None)
            }
            Some(Ok(Message::Pong(_))) => {
                debug!("Received pong");
                Ok(None)
            }
            Some(Ok(Message::Close(frame))) => {
                warn!(frame = ?frame, "Received close frame");
                Err(SimulatorError::WebSocketConnection(
                    "Connection closed".to_string(),
                ))
            }
            Some(Ok(Message::Frame(_))) => Ok(None),
            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                Err(SimulatorError::WebSocketMessage(e.to_string()))
            }
            None => {
                warn!("WebSocket stream ended");
                Err(SimulatorError::WebSocketConnection(
                    "Stream ended".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        // Grab a free port, then release it so nothing is listening there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = WebSocketConnector::new(&format!("ws://127.0.0.1:{}", port));
        let result = connector.connect().await;

        assert!(matches!(result, Err(SimulatorError::WebSocketConnection(_))));
    }

    #[tokio::test]
    async fn test_malformed_endpoint_is_connection_error() {
        let connector = WebSocketConnector::new("not a url");
        let result = connector.connect().await;

        assert!(matches!(result, Err(SimulatorError::WebSocketConnection(_))));
    }
}
