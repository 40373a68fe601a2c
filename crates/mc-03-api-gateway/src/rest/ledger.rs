//! Ledger endpoints: broadcast, transactions, UTXOs and the faucet.

use crate::domain::{ApiError, ApiResult};
use crate::service::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use shared_types::bitcoin::Txid;
use shared_types::{Location, SpentStatus, TransactionView, Utxo};
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub rawtx: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub txid: Txid,
}

/// Accepts `{"rawtx": "<hex>"}` or a bare hex body.
fn extract_rawtx(body: &str) -> ApiResult<String> {
    let body = body.trim();
    if body.starts_with('{') {
        let request: BroadcastRequest = serde_json::from_str(body)?;
        Ok(request.rawtx)
    } else if body.is_empty() {
        Err(ApiError::invalid_params("missing rawtx"))
    } else {
        Ok(body.trim_matches('"').to_string())
    }
}

/// `POST /broadcast`
///
/// Responds once the ledger has applied the transaction. The ledger queues
/// the mutation for indexing inside its commit, so indexing and
/// notification follow on the pipeline in commit order even if this
/// request is abandoned.
pub async fn broadcast(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<BroadcastResponse>> {
    let rawtx = extract_rawtx(&body)?;
    let limit = state.config.timeouts.broadcast;

    let mutation = tokio::time::timeout(limit, state.ledger.broadcast(&rawtx))
        .await
        .map_err(|_| ApiError::timeout("broadcast", limit))??;

    let txid = mutation.txid;
    if mutation.already_known {
        debug!(txid = %txid, "Broadcast of known transaction");
    } else {
        info!(
            txid = %txid,
            spent = mutation.spent.len(),
            created = mutation.created.len(),
            "Transaction broadcast"
        );
    }
    Ok(Json(BroadcastResponse { txid }))
}

/// `GET /tx/:txid`
pub async fn transaction(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> ApiResult<Json<TransactionView>> {
    let txid = Txid::from_str(&txid)
        .map_err(|e| ApiError::invalid_params(format!("txid {txid}: {e}")))?;
    Ok(Json(state.ledger.fetch(&txid).await?))
}

/// `GET /txns`
pub async fn transactions(State(state): State<AppState>) -> Json<Vec<TransactionView>> {
    Json(state.ledger.transactions().await)
}

#[derive(Debug, Default, Deserialize)]
pub struct UtxoQuery {
    /// Include spent outputs.
    #[serde(default)]
    pub history: bool,
}

/// `GET /utxos/:address`
pub async fn utxos(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<UtxoQuery>,
) -> ApiResult<Json<Vec<Utxo>>> {
    Ok(Json(state.ledger.utxos(&address, query.history).await?))
}

#[derive(Debug, Deserialize)]
pub struct UtxosRequest {
    pub locs: Vec<String>,
}

/// `POST /utxos`
pub async fn utxos_by_location(
    State(state): State<AppState>,
    Json(request): Json<UtxosRequest>,
) -> ApiResult<Json<Vec<Utxo>>> {
    let max = state.config.limits.max_batch_locations;
    if request.locs.len() > max {
        return Err(ApiError::limit_exceeded(format!(
            "{} locations requested (max: {max})",
            request.locs.len()
        )));
    }
    let locations = request
        .locs
        .iter()
        .map(|loc| loc.parse::<Location>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(state.ledger.utxos_by_location(&locations).await))
}

/// `GET /utxos/:loc/spent`
pub async fn spent(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> ApiResult<Json<SpentStatus>> {
    let location: Location = location.parse()?;
    Ok(Json(state.ledger.is_spent(&location).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct FundQuery {
    pub satoshis: Option<u64>,
}

/// `GET /fund/:address`
pub async fn fund(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<FundQuery>,
) -> ApiResult<Json<Utxo>> {
    let satoshis = query.satoshis.unwrap_or(state.config.faucet.satoshis);
    if satoshis == 0 {
        return Err(ApiError::invalid_params("satoshis must be positive"));
    }

    let funding = state.ledger.fund(&address, satoshis).await?;
    info!(
        address = %address,
        satoshis,
        location = %funding.utxo.location,
        "Funded address"
    );
    Ok(Json(funding.utxo))
}
