//! Error types for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hybridtx_core::{CommitMode, CoreError};
use hybridtx_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned by coordinator and participant endpoints.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Body could not be decoded or failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Fast-path conflict or duplicate in-flight id.
    #[error("transaction {txn_id} conflicts with an active transaction")]
    Conflict {
        /// The rejected transaction.
        txn_id: String,
    },

    /// Slow-path keys stayed busy until the deadline.
    #[error("transaction {txn_id} timed out waiting for locks")]
    Timeout {
        /// The rejected transaction.
        txn_id: String,
    },

    /// A participant did not prepare.
    #[error("transaction {txn_id} aborted [{mode}]")]
    Aborted {
        /// The aborted transaction.
        txn_id: String,
        /// Routing class it ran under.
        mode: CommitMode,
    },

    /// Participant: a key is held by another transaction.
    #[error("keys for {txn_id} are locked")]
    Locked {
        /// The refused transaction.
        txn_id: String,
    },

    /// Coordinator failure outside the protocol.
    #[error("coordinator error: {0}")]
    Core(CoreError),

    /// HTTP client error.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict { .. }
            | ServerError::Timeout { .. }
            | ServerError::Locked { .. } => StatusCode::CONFLICT,
            ServerError::Aborted { .. }
            | ServerError::Core(_)
            | ServerError::Client(_)
            | ServerError::Io(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the plain-text response body.
    pub fn body(&self) -> String {
        match self {
            ServerError::Conflict { .. } => "Conflict".to_string(),
            ServerError::Timeout { .. } => "Timeout".to_string(),
            ServerError::Locked { .. } => "Locked".to_string(),
            ServerError::Aborted { mode, .. } => format!("FAILED [{mode}]: Transaction Aborted"),
            other => other.to_string(),
        }
    }
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(e) => ServerError::InvalidRequest(e.to_string()),
            CoreError::Conflict { txn_id } | CoreError::AlreadyInFlight { txn_id } => {
                ServerError::Conflict { txn_id }
            }
            CoreError::LockTimeout { txn_id, .. } => ServerError::Timeout { txn_id },
            CoreError::TransactionAborted { txn_id, mode, .. } => {
                ServerError::Aborted { txn_id, mode }
            }
            other => ServerError::Core(other),
        }
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        ServerError::InvalidRequest(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && !matches!(self, ServerError::Aborted { .. }) {
            tracing::error!(error = %self, "request failed");
        }
        (status, format!("{}\n", self.body())).into_response()
    }
}
