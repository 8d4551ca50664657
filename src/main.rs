//! L2 Cost Simulator
//!
//! Connects to an L2 order book stream, keeps the latest book and logs the
//! estimated execution cost of the configured order on every snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use l2_cost_sim::cost::ImpactParams;
use l2_cost_sim::{
    BookState, Config, ConnectionState, CostModel, FeedConnection, IngestionPipeline, Metrics,
    TracingSink, WebSocketConnector,
};

/// Shared with the health server
struct AppState {
    feed: Arc<FeedConnection<WebSocketConnector>>,
    book: Arc<BookState>,
    metrics: Arc<Metrics>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting L2 cost simulator");

    let config = Config::load()?;
    info!(
        exchange = %config.exchange,
        symbol = %config.symbol,
        fee_tier = %config.fee_tier,
        order_side = %config.order_side,
        order_type = %config.order_type,
        order_size_usd = config.order_size_usd,
        "Configuration loaded"
    );

    // An unknown fee tier is fatal here, before any connection is made
    let schedule = config.fee_schedule()?;
    let model = CostModel::new(
        &schedule,
        &config.exchange,
        &config.fee_tier,
        ImpactParams::default(),
    )?;
    let order = config.order_request()?;

    let metrics = Arc::new(Metrics::new()?);
    let book = Arc::new(BookState::new(&config.symbol));
    let feed = Arc::new(FeedConnection::new(
        WebSocketConnector::new(&config.ws_endpoint),
        config.feed_settings(),
        Arc::clone(&metrics),
    ));

    // Start health check server
    let state = Arc::new(AppState {
        feed: Arc::clone(&feed),
        book: Arc::clone(&book),
        metrics: Arc::clone(&metrics),
    });
    let port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(state, port).await {
            warn!(error = %e, "Health server error");
        }
    });

    let mut pipeline = IngestionPipeline::new(book, model, order, TracingSink, metrics);
    let run = feed.run(|snapshot| pipeline.on_snapshot(snapshot));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
        feed.stop().await;
    };

    // `run` returns as soon as the stop is observed, so it wins this race
    tokio::select! {
        result = run => {
            if let Err(e) = result {
                error!(error = %e, "Feed connection failed");
                return Err(e.into());
            }
        }
        _ = shutdown => {}
    }

    info!("L2 cost simulator stopped");
    Ok(())
}

/// Start HTTP server for health checks and metrics
async fn start_health_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let connection = state.feed.state();
    let book = state.book.snapshot();
    let summary = book.metrics();
    let status = if connection == ConnectionState::Connected && summary.is_two_sided() {
        "healthy"
    } else {
        "degraded"
    };

    Json(serde_json::json!({
        "status": status,
        "component": "l2-cost-sim",
        "connection": connection,
        "instrument": book.instrument(),
        "book_as_of": book.as_of().map(|as_of| as_of.to_rfc3339()),
        "book_sequence": book.sequence(),
        "best_bid": summary.best_bid,
        "best_ask": summary.best_ask,
        "mean_latency_us": state.feed.average_latency().map(|latency| latency.as_micros() as u64),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, (StatusCode, String)> {
    state
        .metrics
        .encode()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
