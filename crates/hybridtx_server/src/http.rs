//! Participant transport over HTTP.

use crate::error::ServerResult;
use hybridtx_core::{CoreError, CoreResult, ParticipantTransport, Vote};
use hybridtx_protocol::{CommitRequest, PrepareRequest, COMMIT_PATH, PREPARE_PATH};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Sends prepare and decision calls as JSON POSTs.
///
/// A participant address is its base URL, for example
/// `http://localhost:8081`. Prepare is acknowledged only by a `200 OK`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with no per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> ServerResult<Self> {
        Self::build(None)
    }

    /// Creates a transport that abandons a call after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> ServerResult<Self> {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> ServerResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

fn endpoint(participant: &str, path: &str) -> String {
    format!("{}{path}", participant.trim_end_matches('/'))
}

impl ParticipantTransport for HttpTransport {
    async fn prepare(&self, participant: &str, request: &PrepareRequest) -> CoreResult<Vote> {
        let response = self
            .client
            .post(endpoint(participant, PREPARE_PATH))
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::transport(participant, e.to_string()))?;

        if response.status() == StatusCode::OK {
            Ok(Vote::Ack)
        } else {
            tracing::debug!(
                participant,
                status = %response.status(),
                "participant refused prepare"
            );
            Ok(Vote::Reject)
        }
    }

    async fn commit(&self, participant: &str, request: &CommitRequest) -> CoreResult<()> {
        self.client
            .post(endpoint(participant, COMMIT_PATH))
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::transport(participant, e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_path() {
        assert_eq!(
            endpoint("http://localhost:8081", PREPARE_PATH),
            "http://localhost:8081/prepare"
        );
        assert_eq!(
            endpoint("http://localhost:8081/", COMMIT_PATH),
            "http://localhost:8081/commit"
        );
    }

    #[tokio::test]
    async fn unreachable_participant_is_a_transport_error() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let request = PrepareRequest {
            txn_id: "t1".into(),
            keys: vec!["k".into()],
        };

        // Port 1 on loopback refuses connections.
        let err = transport
            .prepare("http://127.0.0.1:1", &request)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Transport { .. }));
    }
}
