//! Feed connection manager
//!
//! Owns reconnect with a fixed backoff, the liveness heartbeat, frame
//! decoding and latency tracking. Decoded snapshots are handed to the caller
//! synchronously, one at a time.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{ConnectionState, Connector, FrameSink, FrameSource, LatencyTracker};
use crate::error::{Result, SimulatorError};
use crate::metrics::Metrics;
use crate::parser::RawSnapshot;

/// Characters of a rejected frame kept in the log line
const FRAME_PREVIEW_CHARS: usize = 100;

/// Reconnect and heartbeat policy
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
        }
    }
}

type SharedSink = Arc<AsyncMutex<Option<Box<dyn FrameSink>>>>;

enum SessionEnd {
    Shutdown,
    Lost(SimulatorError),
}

/// Aborts the heartbeat task when the session it belongs to ends
struct HeartbeatTask(JoinHandle<()>);

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Live connection to the market-data source
pub struct FeedConnection<C: Connector> {
    connector: C,
    settings: FeedSettings,
    state: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
    /// Held by `run` for its whole lifetime so `stop` can wait it out
    active: AsyncMutex<()>,
    sink: SharedSink,
    latency: Mutex<LatencyTracker>,
    metrics: Arc<Metrics>,
}

impl<C: Connector> FeedConnection<C> {
    pub fn new(connector: C, settings: FeedSettings, metrics: Arc<Metrics>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = watch::channel(false);

        Self {
            connector,
            settings,
            state,
            shutdown,
            active: AsyncMutex::new(()),
            sink: Arc::new(AsyncMutex::new(None)),
            latency: Mutex::new(LatencyTracker::default()),
            metrics,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Mean hand-off latency over the last 1000 frames
    pub fn average_latency(&self) -> Option<Duration> {
        self.latency.lock().mean()
    }

    /// Connect and stream snapshots into `on_snapshot` until stopped
    ///
    /// Returns `Ok(())` after `stop()`, or `ConnectionExhausted` once every
    /// attempt of a connect or reconnect round has failed.
    pub async fn run<F>(&self, mut on_snapshot: F) -> Result<()>
    where
        F: FnMut(RawSnapshot),
    {
        let _active = self.active.lock().await;
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            debug!("Feed connection already stopped, not starting");
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        let mut source = match self.establish(&mut shutdown).await {
            Ok(Some(source)) => source,
            Ok(None) => return self.finish().await,
            Err(e) => return self.fail(e).await,
        };

        loop {
            let heartbeat = self.spawn_heartbeat();
            let end = self
                .receive(source.as_mut(), &mut shutdown, &mut on_snapshot)
                .await;
            drop(heartbeat);

            match end {
                SessionEnd::Shutdown => return self.finish().await,
                SessionEnd::Lost(e) => {
                    warn!(error = %e, "Feed connection lost, reconnecting");
                    self.set_state(ConnectionState::Reconnecting);
                    self.release_transport().await;

                    source = match self.establish(&mut shutdown).await {
                        Ok(Some(source)) => source,
                        Ok(None) => return self.finish().await,
                        Err(e) => return self.fail(e).await,
                    };
                }
            }
        }
    }

    /// Stop the connection
    ///
    /// Cancels the receive loop and heartbeat, waits for `run` to return and
    /// releases the transport. Calling it again is a no-op. Must not be
    /// awaited from inside the snapshot handler.
    pub async fn stop(&self) {
        // Stopped is terminal even when `run` ended on its own
        self.shutdown.send_replace(true);
        if self.state() == ConnectionState::Stopped {
            debug!("Feed connection already stopped");
            return;
        }

        info!("Stopping feed connection");

        let _active = self.active.lock().await;
        self.release_transport().await;
        self.set_state(ConnectionState::Stopped);
    }

    /// Try to open a session, retrying with a fixed delay
    ///
    /// `Ok(None)` means a stop was requested while trying.
    async fn establish(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<Box<dyn FrameSource>>> {
        let max_attempts = self.settings.max_reconnect_attempts.max(1);

        for attempt in 1..=max_attempts {
            self.metrics.connect_attempts.inc();

            let connected = tokio::select! {
                _ = shutdown_requested(shutdown) => return Ok(None),
                connected = self.connector.connect() => connected,
            };

            match connected {
                Ok((sink, source)) => {
                    *self.sink.lock().await = Some(sink);
                    self.set_state(ConnectionState::Connected);
                    info!(attempt, "Feed connection established");
                    return Ok(Some(source));
                }
                Err(e) => {
                    error!(attempt, max_attempts, error = %e, "Connection attempt failed");
                    if attempt < max_attempts {
                        tokio::select! {
                            _ = shutdown_requested(shutdown) => return Ok(None),
                            _ = sleep(self.settings.reconnect_delay) => {}
                        }
                    }
                }
            }
        }

        error!(attempts = max_attempts, "Maximum reconnection attempts reached");
        Err(SimulatorError::ConnectionExhausted {
            attempts: max_attempts,
        })
    }

    async fn receive<F>(
        &self,
        source: &mut dyn FrameSource,
        shutdown: &mut watch::Receiver<bool>,
        on_snapshot: &mut F,
    ) -> SessionEnd
    where
        F: FnMut(RawSnapshot),
    {
        loop {
            let frame = tokio::select! {
                _ = shutdown_requested(shutdown) => return SessionEnd::Shutdown,
                frame = source.recv() => frame,
            };

            match frame {
                Ok(Some(text)) => self.dispatch(&text, Instant::now(), on_snapshot),
                Ok(None) => continue,
                Err(e) => return SessionEnd::Lost(e),
            }
        }
    }

    fn dispatch<F>(&self, text: &str, received_at: Instant, on_snapshot: &mut F)
    where
        F: FnMut(RawSnapshot),
    {
        self.metrics.frames_received.inc();

        match RawSnapshot::parse(text, received_at) {
            Ok(snapshot) => {
                on_snapshot(snapshot);
                self.latency.lock().record(received_at.elapsed());
            }
            Err(SimulatorError::IncompleteFrame { missing }) => {
                self.metrics.frames_dropped.inc();
                warn!(
                    missing = ?missing,
                    frame = %preview(text),
                    "Invalid message format, frame dropped"
                );
            }
            Err(e) => {
                self.metrics.frames_dropped.inc();
                warn!(error = %e, frame = %preview(text), "Failed to decode frame");
            }
        }
    }

    fn spawn_heartbeat(&self) -> HeartbeatTask {
        let sink = Arc::clone(&self.sink);
        let metrics = Arc::clone(&self.metrics);
        let period = self.settings.heartbeat_interval.max(Duration::from_millis(1));

        HeartbeatTask(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let frame = serde_json::json!({
                    "type": "heartbeat",
                    "timestamp": Utc::now().timestamp_millis() as f64 / 1000.0,
                })
                .to_string();

                let mut guard = sink.lock().await;
                let Some(session) = guard.as_mut() else {
                    continue;
                };
                match session.send_text(frame).await {
                    Ok(()) => debug!("Heartbeat sent"),
                    Err(e) => {
                        metrics.heartbeat_failures.inc();
                        warn!(error = %e, "Error sending heartbeat");
                    }
                }
            }
        }))
    }

    async fn release_transport(&self) {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            sink.close().await;
            debug!("Transport released");
        }
    }

    async fn finish(&self) -> Result<()> {
        self.release_transport().await;
        self.set_state(ConnectionState::Stopped);
        info!("Feed connection stopped");
        Ok(())
    }

    async fn fail(&self, error: SimulatorError) -> Result<()> {
        self.release_transport().await;
        self.set_state(ConnectionState::Stopped);
        Err(error)
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Feed connection state changed");
        }
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // The sender lives in the connection, so this only errors if it was dropped
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

fn preview(text: &str) -> String {
    text.chars().take(FRAME_PREVIEW_CHARS).collect()
}
