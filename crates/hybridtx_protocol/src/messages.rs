//! Protocol messages.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A client's request to commit a multi-key transaction.
///
/// `keys` may repeat a key; locking treats them as a set. `participants` are
/// base URLs (for example `http://localhost:8081`) that must all vote to
/// commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Client-chosen transaction identifier.
    pub id: String,
    /// Keys the transaction touches.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Participant base URLs.
    #[serde(default)]
    pub participants: Vec<String>,
}

impl TransactionRequest {
    /// Creates a new transaction request.
    pub fn new<K, P>(id: impl Into<String>, keys: K, participants: P) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            id: id.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            participants: participants.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the fields that the coordinator's log format depends on.
    ///
    /// The id must be non-empty, and neither the id nor any key may contain
    /// whitespace: log lines are space-separated and newline-terminated.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] naming the offending field.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.id.is_empty() {
            return Err(ProtocolError::invalid("transaction id is empty"));
        }
        if self.id.chars().any(char::is_whitespace) {
            return Err(ProtocolError::invalid(format!(
                "transaction id {:?} contains whitespace",
                self.id
            )));
        }
        if let Some(key) = self
            .keys
            .iter()
            .find(|k| k.is_empty() || k.chars().any(char::is_whitespace))
        {
            return Err(ProtocolError::invalid(format!(
                "key {key:?} is empty or contains whitespace"
            )));
        }
        Ok(())
    }

    /// Returns the distinct keys in first-seen order.
    #[must_use]
    pub fn unique_keys(&self) -> Vec<String> {
        let mut seen = HashSet::with_capacity(self.keys.len());
        self.keys
            .iter()
            .filter(|k| seen.insert(k.as_str()))
            .cloned()
            .collect()
    }

    /// Returns the prepare call sent to every participant.
    #[must_use]
    pub fn prepare_request(&self) -> PrepareRequest {
        PrepareRequest {
            txn_id: self.id.clone(),
            keys: self.keys.clone(),
        }
    }

    /// Encodes to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Decodes from JSON and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] for malformed JSON and
    /// [`ProtocolError::Invalid`] if validation fails.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;
        request.validate()?;
        Ok(request)
    }
}

/// Phase-one call: asks a participant to hold `keys` for `txn_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    /// Transaction identifier.
    pub txn_id: String,
    /// Keys to hold.
    #[serde(default)]
    pub keys: Vec<String>,
}

impl PrepareRequest {
    /// Encodes to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] for malformed JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
    }
}

/// The global decision for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Every participant acknowledged prepare.
    Commit,
    /// At least one participant did not.
    Abort,
}

impl Action {
    /// Returns the wire keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Commit => "COMMIT",
            Action::Abort => "ABORT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase-two call: tells a participant the outcome for `txn_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Transaction identifier.
    pub txn_id: String,
    /// The decision.
    pub action: Action,
}

impl CommitRequest {
    /// Creates a new commit request.
    pub fn new(txn_id: impl Into<String>, action: Action) -> Self {
        Self {
            txn_id: txn_id.into(),
            action,
        }
    }

    /// Encodes to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] for malformed JSON or an unknown action.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_client_request() {
        let body = br#"{"id":"txn-1","keys":["a","b"],"participants":["http://localhost:8081"]}"#;
        let request = TransactionRequest::decode(body).unwrap();

        assert_eq!(request.id, "txn-1");
        assert_eq!(request.keys, vec!["a", "b"]);
        assert_eq!(request.participants, vec!["http://localhost:8081"]);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let request = TransactionRequest::decode(br#"{"id":"txn-2"}"#).unwrap();
        assert!(request.keys.is_empty());
        assert!(request.participants.is_empty());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = TransactionRequest::decode(b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));

        let err = TransactionRequest::decode(br#"{"keys":["a"]}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn whitespace_is_rejected() {
        let request = TransactionRequest::new("txn 1", ["a"], Vec::<String>::new());
        assert!(matches!(request.validate(), Err(ProtocolError::Invalid(_))));

        let request = TransactionRequest::new("txn-1", ["a\nCOMMIT x"], Vec::<String>::new());
        assert!(matches!(request.validate(), Err(ProtocolError::Invalid(_))));

        let request = TransactionRequest::new("", ["a"], Vec::<String>::new());
        assert!(request.validate().is_err());
    }

    #[test]
    fn unique_keys_keeps_first_occurrence() {
        let request = TransactionRequest::new("t", ["b", "a", "b", "c", "a"], ["p"]);
        assert_eq!(request.unique_keys(), vec!["b", "a", "c"]);
    }

    #[test]
    fn prepare_request_mirrors_transaction() {
        let request = TransactionRequest::new("t9", ["x", "y"], ["p1", "p2"]);
        let prepare = request.prepare_request();
        assert_eq!(prepare.txn_id, "t9");
        assert_eq!(prepare.keys, vec!["x", "y"]);

        let json = String::from_utf8(prepare.encode().unwrap()).unwrap();
        assert_eq!(json, r#"{"txn_id":"t9","keys":["x","y"]}"#);
    }

    #[test]
    fn action_wire_format() {
        let json = String::from_utf8(CommitRequest::new("t1", Action::Abort).encode().unwrap())
            .unwrap();
        assert_eq!(json, r#"{"txn_id":"t1","action":"ABORT"}"#);

        let decoded = CommitRequest::decode(br#"{"txn_id":"t1","action":"COMMIT"}"#).unwrap();
        assert_eq!(decoded.action, Action::Commit);

        assert!(CommitRequest::decode(br#"{"txn_id":"t1","action":"MAYBE"}"#).is_err());
    }
}
