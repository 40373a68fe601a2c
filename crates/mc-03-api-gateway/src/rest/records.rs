//! Jig and channel record endpoints.
//!
//! The `POST` jig queries take an optional [`JigQuery`] body (`criteria`,
//! `sort`, `skip`, `limit`, `project`); an empty body matches everything.

use crate::domain::{ApiError, ApiResult};
use crate::service::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use mc_02_tx_indexer::JigQuery;
use serde_json::{Map, Value};
use shared_types::{ChannelRecord, JigRecord, Location};

fn locations(records: Vec<JigRecord>) -> Vec<Location> {
    records.into_iter().map(|jig| jig.location).collect()
}

/// `GET /jigs`
pub async fn jigs(State(state): State<AppState>) -> Json<Vec<JigRecord>> {
    Json(state.indexer.jigs())
}

/// `GET /jig/:loc`
pub async fn jig(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> ApiResult<Json<JigRecord>> {
    let location: Location = location.parse()?;
    state
        .indexer
        .jig(&location)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("jig {location}")))
}

/// Records at the unspent outputs of an address or script.
async fn held_by(state: &AppState, key: &str) -> ApiResult<Vec<JigRecord>> {
    let held: Vec<Location> = state
        .ledger
        .utxos(key, false)
        .await?
        .into_iter()
        .map(|utxo| utxo.location)
        .collect();
    Ok(state.indexer.jigs_at(&held))
}

/// `GET /jigs/:address`
///
/// Jigs currently held by an address: records at its unspent outputs.
pub async fn jigs_by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<Vec<JigRecord>>> {
    Ok(Json(held_by(&state, &address).await?))
}

/// `POST /jigs/address/:address` and `POST /jigs/script/:script`
///
/// Held jigs run through the query body; the response is the projected
/// documents.
pub async fn query_held(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Vec<Value>>> {
    let query = JigQuery::from_body(&body)?;
    Ok(Json(query.run(held_by(&state, &key).await?)?))
}

/// `POST /jigs/search`
///
/// Every jig whose fields equal the body's fields, unpaged.
pub async fn search(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Vec<Value>>> {
    let criteria: Map<String, Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        serde_json::from_slice(&body)?
    };
    let query = JigQuery {
        limit: Some(usize::MAX),
        ..JigQuery::matching(criteria)
    };
    Ok(Json(query.run(state.indexer.jigs())?))
}

/// `POST /jigs/kind/:kind`
pub async fn jigs_by_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Vec<Location>>> {
    let query = JigQuery::from_body(&body)?;
    Ok(Json(locations(query.select(state.indexer.jigs_by_kind(&kind))?)))
}

/// `POST /jigs/origin/:origin`
pub async fn jigs_by_origin(
    State(state): State<AppState>,
    Path(origin): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Vec<Location>>> {
    let origin: Location = origin.parse()?;
    let query = JigQuery::from_body(&body)?;
    Ok(Json(locations(query.select(state.indexer.jigs_by_origin(&origin))?)))
}

/// `GET /jigs/origin/:origin/current`
pub async fn current_state(
    State(state): State<AppState>,
    Path(origin): Path<String>,
) -> ApiResult<Json<JigRecord>> {
    let origin: Location = origin.parse()?;
    state
        .indexer
        .current_state(&origin)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("jig with origin {origin}")))
}

/// `GET /channel/:loc`
pub async fn channel(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> ApiResult<Json<ChannelRecord>> {
    let location: Location = location.parse()?;
    state
        .indexer
        .channel(&location)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("channel {location}")))
}
