//! Participant node: a local lock table behind `/prepare` and `/commit`.

use crate::config::ParticipantConfig;
use crate::error::{ServerError, ServerResult};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use hybridtx_protocol::{CommitRequest, PrepareRequest, COMMIT_PATH, PREPARE_PATH};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One simulated data node.
///
/// The lock table is independent of the coordinator's. Keys are taken on
/// prepare and dropped when the decision for their transaction arrives,
/// whichever the decision is.
#[derive(Debug)]
pub struct ParticipantNode {
    /// key -> owning transaction id.
    locks: Mutex<HashMap<String, String>>,
    latency: Duration,
    reject_prepares: bool,
}

impl ParticipantNode {
    /// Creates a node with an empty lock table.
    pub fn new(config: &ParticipantConfig) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            latency: config.latency,
            reject_prepares: config.reject_prepares,
        }
    }

    /// Simulates the work of preparing, then takes the keys.
    ///
    /// Keys already held by the same transaction do not conflict.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Locked`] if any key is held by another
    /// transaction or the node rejects every prepare.
    pub async fn prepare(&self, request: &PrepareRequest) -> ServerResult<()> {
        tracing::debug!(txn_id = %request.txn_id, latency = ?self.latency, "simulating database work");
        tokio::time::sleep(self.latency).await;

        if self.reject_prepares {
            return Err(ServerError::Locked {
                txn_id: request.txn_id.clone(),
            });
        }

        let mut locks = self.locks.lock();
        let blocked = request
            .keys
            .iter()
            .any(|k| locks.get(k).is_some_and(|owner| *owner != request.txn_id));
        if blocked {
            tracing::info!(txn_id = %request.txn_id, "prepare refused: keys locked");
            return Err(ServerError::Locked {
                txn_id: request.txn_id.clone(),
            });
        }

        for key in &request.keys {
            locks.insert(key.clone(), request.txn_id.clone());
        }
        tracing::info!(txn_id = %request.txn_id, keys = ?request.keys, "locked keys");
        Ok(())
    }

    /// Drops every key owned by the decided transaction.
    ///
    /// Returns the number of keys released.
    pub fn finish(&self, request: &CommitRequest) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, owner| *owner != request.txn_id);
        let released = before - locks.len();
        tracing::info!(txn_id = %request.txn_id, action = %request.action, released, "finished");
        released
    }

    /// Returns the transaction holding `key`, if any.
    pub fn owner(&self, key: &str) -> Option<String> {
        self.locks.lock().get(key).cloned()
    }

    /// Returns how many keys are held.
    pub fn locked_count(&self) -> usize {
        self.locks.lock().len()
    }
}

async fn handle_prepare(
    State(node): State<Arc<ParticipantNode>>,
    body: Bytes,
) -> ServerResult<&'static str> {
    let request = PrepareRequest::decode(&body)?;
    node.prepare(&request).await?;
    Ok("Prepared\n")
}

async fn handle_commit(
    State(node): State<Arc<ParticipantNode>>,
    body: Bytes,
) -> ServerResult<StatusCode> {
    let request = CommitRequest::decode(&body)?;
    node.finish(&request);
    Ok(StatusCode::OK)
}

/// Builds the participant's router.
pub fn participant_router(node: Arc<ParticipantNode>) -> Router {
    Router::new()
        .route(PREPARE_PATH, post(handle_prepare))
        .route(COMMIT_PATH, post(handle_commit))
        .with_state(node)
}
