//! Message relay endpoints.

use crate::domain::ApiResult;
use crate::service::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use shared_types::Message;
use tracing::info;

/// `POST /messages`
///
/// Stores the message and publishes it to each recipient's address topic,
/// each context topic and the subject topic. Responds `true`.
pub async fn post_message(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<bool>> {
    let message: Message = serde_json::from_slice(&body)?;
    let posted = state.relay.post(message).await?;
    info!(
        id = %posted.id,
        recipients = posted.to.len(),
        contexts = posted.context.len(),
        "Message posted"
    );
    Ok(Json(true))
}

/// `GET /messages/:id`
pub async fn message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    Ok(Json(state.relay.get(&id).await?))
}
