//! API Gateway service - main entry point.
//!
//! Serves REST, SSE and WebSocket on one HTTP listener. The gateway never
//! mutates ledger or bus state itself; it calls the ledger, which queues
//! each commit for indexing, and opens bus subscriptions.

use crate::domain::{GatewayConfig, GatewayError, StreamInfo, StreamRegistry};
use crate::middleware::create_cors_layer;
use crate::{rest, sse, ws};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use mc_01_utxo_ledger::UtxoLedgerApi;
use mc_02_tx_indexer::{IndexerHandle, TransactionIndexer};
use mc_04_message_relay::MessageRelayApi;
use serde_json::json;
use shared_bus::NotificationBus;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn UtxoLedgerApi>,
    pub indexer: Arc<TransactionIndexer>,
    pub pipeline: IndexerHandle,
    pub relay: Arc<dyn MessageRelayApi>,
    pub bus: Arc<NotificationBus>,
    pub streams: Arc<StreamRegistry>,
    pub config: Arc<GatewayConfig>,
    /// Flips to `true` when the gateway starts shutting down.
    pub shutdown: watch::Receiver<bool>,
}

/// Resolves once shutdown starts, or once the gateway is gone.
pub(crate) async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}

/// API Gateway service
pub struct GatewayService {
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

impl GatewayService {
    /// Create a new API Gateway service
    pub fn new(
        config: GatewayConfig,
        ledger: Arc<dyn UtxoLedgerApi>,
        indexer: Arc<TransactionIndexer>,
        pipeline: IndexerHandle,
        relay: Arc<dyn MessageRelayApi>,
        bus: Arc<NotificationBus>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let (shutdown_tx, shutdown) = watch::channel(false);
        let state = AppState {
            ledger,
            indexer,
            pipeline,
            relay,
            bus,
            streams: Arc::new(StreamRegistry::new()),
            config: Arc::new(config),
            shutdown,
        };

        Ok(Self { state, shutdown_tx })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let config = &self.state.config;

        let rest = Router::new()
            .route("/", get(root))
            .route("/health", get(health_check))
            .route("/streams", get(list_streams))
            .route("/broadcast", post(rest::ledger::broadcast))
            .route("/tx/:txid", get(rest::ledger::transaction))
            .route("/txns", get(rest::ledger::transactions))
            .route("/utxos", post(rest::ledger::utxos_by_location))
            .route("/utxos/:key", get(rest::ledger::utxos))
            .route("/utxos/:key/spent", get(rest::ledger::spent))
            .route("/fund/:address", get(rest::ledger::fund))
            .route("/jigs", get(rest::records::jigs))
            .route("/jig/:loc", get(rest::records::jig))
            .route("/jigs/:address", get(rest::records::jigs_by_address))
            .route("/jigs/search", post(rest::records::search))
            .route("/jigs/address/:address", post(rest::records::query_held))
            .route("/jigs/script/:script", post(rest::records::query_held))
            .route("/jigs/kind/:kind", post(rest::records::jigs_by_kind))
            .route("/jigs/origin/:origin", post(rest::records::jigs_by_origin))
            .route(
                "/jigs/origin/:origin/current",
                get(rest::records::current_state),
            )
            .route("/channel/:loc", get(rest::records::channel))
            .route("/messages", post(rest::messages::post_message))
            .route("/messages/:id", get(rest::messages::message))
            .layer(TimeoutLayer::new(config.timeouts.request));

        let streaming = Router::new()
            .route("/notify/jigs", get(sse::notify_jigs))
            .route("/notify/channels", get(sse::notify_channels))
            .route("/notify/messages", get(sse::notify_messages))
            .route("/notify/:address", get(sse::notify_address))
            .route("/ws", get(ws::upgrade));

        let middleware = ServiceBuilder::new()
            .layer(create_cors_layer(&config.cors))
            .layer(MapResponseBodyLayer::new(axum::body::Body::new))
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.limits.max_request_size));

        Router::new()
            .merge(rest)
            .merge(streaming)
            .layer(middleware)
            .with_state(self.state.clone())
    }

    /// Bind the configured HTTP address
    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        let addr = self.config().http_addr();
        Ok(TcpListener::bind(addr).await?)
    }

    /// Serve until [`GatewayService::shutdown`] is called. Open streams are
    /// ended so in-flight requests can drain.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GatewayError> {
        if *self.shutdown_tx.borrow() {
            return Err(GatewayError::ShuttingDown);
        }

        let addr = listener.local_addr()?;
        info!(addr = %addr, "Starting HTTP server");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal(self.shutdown_tx.subscribe()))
            .await?;

        info!("API Gateway stopped");
        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        info!("API Gateway shutting down");
        self.shutdown_tx.send_replace(true);
    }
}

/// `GET /`
async fn root() -> Json<bool> {
    Json(true)
}

/// `GET /health`
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let bus = state.bus.stats();
    let ledger = state.ledger.stats().await;
    Json(json!({
        "status": "ok",
        "service": "mc-03-api-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "lastSequence": bus.last_sequence,
        "subscribers": bus.subscriber_count,
        "transactions": ledger.transactions,
        "pendingIndex": state.pipeline.pending(),
        "streams": state.streams.count(),
    }))
}

/// `GET /streams`
async fn list_streams(State(state): State<AppState>) -> Json<Vec<StreamInfo>> {
    Json(state.streams.list())
}
