//! WebSocket streaming.
//!
//! One connection may hold many topic subscriptions; see [`handler`] for the
//! message protocol.

pub mod handler;

pub use handler::WebSocketHandler;

use crate::service::AppState;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use std::sync::Arc;

/// `GET /ws`
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let handler = WebSocketHandler::new(
        Arc::clone(&state.bus),
        Arc::clone(&state.streams),
        state.config.streams.clone(),
    );
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| async move {
        handler.handle(socket, shutdown).await;
    })
}
