//! Coordinator endpoints: `POST /txn` and `GET /stats`.

use crate::error::ServerResult;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use hybridtx_core::{ParticipantTransport, StatsSnapshot, TransactionManager};
use hybridtx_protocol::{TransactionRequest, STATS_PATH, TXN_PATH};
use std::sync::Arc;

async fn submit_txn<T: ParticipantTransport>(
    State(manager): State<Arc<TransactionManager<T>>>,
    body: Bytes,
) -> ServerResult<String> {
    let request = TransactionRequest::decode(&body)?;
    let receipt = manager.submit(request).await?;
    Ok(format!("{receipt}\n"))
}

async fn stats<T: ParticipantTransport>(
    State(manager): State<Arc<TransactionManager<T>>>,
) -> Json<StatsSnapshot> {
    Json(manager.stats())
}

/// Builds the coordinator's router over `manager`.
///
/// `POST /txn` answers:
/// - `200` `SUCCESS [<MODE>]: Transaction <id> Committed across <n> nodes`
/// - `400` for a malformed or invalid body
/// - `409` `Conflict` or `Timeout` when the keys are unavailable
/// - `500` `FAILED [<MODE>]: Transaction Aborted`
pub fn coordinator_router<T: ParticipantTransport>(manager: Arc<TransactionManager<T>>) -> Router {
    Router::new()
        .route(TXN_PATH, post(submit_txn::<T>))
        .route(STATS_PATH, get(stats::<T>))
        .with_state(manager)
}
