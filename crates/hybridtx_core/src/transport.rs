//! The seam between the coordinator and its participants.
//!
//! [`ParticipantTransport`] is implemented over HTTP by the server crate and
//! in memory by [`MockTransport`] for tests.

use crate::error::{CoreError, CoreResult};
use hybridtx_protocol::{Action, CommitRequest, PrepareRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Notify;

/// A participant's answer to prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    /// Resources held; ready to commit.
    Ack,
    /// Refused.
    Reject,
}

impl Vote {
    /// Returns true for [`Vote::Ack`].
    #[must_use]
    pub fn is_ack(self) -> bool {
        self == Vote::Ack
    }
}

/// Delivers the two protocol phases to participants.
///
/// `participant` is the address taken from the client request.
pub trait ParticipantTransport: Send + Sync + 'static {
    /// Sends prepare and returns the vote.
    ///
    /// A transport failure is an error, which the coordinator counts as a
    /// rejection.
    fn prepare(
        &self,
        participant: &str,
        request: &PrepareRequest,
    ) -> impl Future<Output = CoreResult<Vote>> + Send;

    /// Delivers the decision. The coordinator does not wait for this.
    fn commit(
        &self,
        participant: &str,
        request: &CommitRequest,
    ) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Scripted behavior of one in-memory participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockVote {
    /// Acknowledge prepare.
    #[default]
    Ack,
    /// Reject prepare.
    Reject,
    /// Fail as if unreachable.
    Fail,
}

#[derive(Debug, Default)]
struct MockState {
    votes: HashMap<String, MockVote>,
    delays: HashMap<String, Duration>,
    prepares: Vec<(String, PrepareRequest)>,
    decisions: Vec<(String, CommitRequest)>,
}

/// In-memory transport recording every call.
///
/// Participants without a scripted vote acknowledge.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    prepare_delay: Option<Duration>,
    decided: Notify,
}

impl MockTransport {
    /// Creates a transport where every participant acknowledges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every prepare by `delay`.
    #[must_use]
    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = Some(delay);
        self
    }

    /// Scripts the vote of `participant`.
    pub fn set_vote(&self, participant: impl Into<String>, vote: MockVote) {
        self.state.lock().votes.insert(participant.into(), vote);
    }

    /// Delays prepares sent to `participant` by `delay`, overriding
    /// [`MockTransport::with_prepare_delay`] for that participant.
    pub fn set_prepare_delay(&self, participant: impl Into<String>, delay: Duration) {
        self.state.lock().delays.insert(participant.into(), delay);
    }

    /// Returns every prepare delivered so far.
    pub fn prepares(&self) -> Vec<(String, PrepareRequest)> {
        self.state.lock().prepares.clone()
    }

    /// Returns every decision delivered so far.
    pub fn decisions(&self) -> Vec<(String, CommitRequest)> {
        self.state.lock().decisions.clone()
    }

    /// Returns the decisions delivered for `txn_id`.
    pub fn decisions_for(&self, txn_id: &str) -> Vec<(String, Action)> {
        self.state
            .lock()
            .decisions
            .iter()
            .filter(|(_, d)| d.txn_id == txn_id)
            .map(|(p, d)| (p.clone(), d.action))
            .collect()
    }

    /// Waits until at least `count` decisions have been delivered.
    ///
    /// Returns false if `timeout` passes first.
    pub async fn wait_for_decisions(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.decided.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.state.lock().decisions.len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl ParticipantTransport for MockTransport {
    async fn prepare(&self, participant: &str, request: &PrepareRequest) -> CoreResult<Vote> {
        let delay = self
            .state
            .lock()
            .delays
            .get(participant)
            .copied()
            .or(self.prepare_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state
            .prepares
            .push((participant.to_string(), request.clone()));
        match state.votes.get(participant).copied().unwrap_or_default() {
            MockVote::Ack => Ok(Vote::Ack),
            MockVote::Reject => Ok(Vote::Reject),
            MockVote::Fail => Err(CoreError::transport(participant, "connection refused")),
        }
    }

    async fn commit(&self, participant: &str, request: &CommitRequest) -> CoreResult<()> {
        self.state
            .lock()
            .decisions
            .push((participant.to_string(), request.clone()));
        self.decided.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_votes() {
        let transport = MockTransport::new();
        transport.set_vote("p2", MockVote::Reject);
        transport.set_vote("p3", MockVote::Fail);
        let prepare = PrepareRequest {
            txn_id: "t1".into(),
            keys: vec!["k".into()],
        };

        assert_eq!(transport.prepare("p1", &prepare).await.unwrap(), Vote::Ack);
        assert_eq!(
            transport.prepare("p2", &prepare).await.unwrap(),
            Vote::Reject
        );
        assert!(transport.prepare("p3", &prepare).await.is_err());
        assert_eq!(transport.prepares().len(), 3);
    }

    #[tokio::test]
    async fn per_participant_delay() {
        let transport = MockTransport::new();
        transport.set_prepare_delay("slow", Duration::from_millis(200));
        let prepare = PrepareRequest {
            txn_id: "t1".into(),
            keys: vec![],
        };

        let fast = tokio::time::timeout(
            Duration::from_millis(50),
            transport.prepare("fast", &prepare),
        )
        .await;
        assert!(matches!(fast, Ok(Ok(Vote::Ack))));

        let slow = tokio::time::timeout(
            Duration::from_millis(50),
            transport.prepare("slow", &prepare),
        )
        .await;
        assert!(slow.is_err());
        assert_eq!(transport.prepares().len(), 1);
    }

    #[tokio::test]
    async fn decisions_are_recorded() {
        let transport = MockTransport::new();
        transport
            .commit("p1", &CommitRequest::new("t1", Action::Commit))
            .await
            .unwrap();

        assert!(
            transport
                .wait_for_decisions(1, Duration::from_millis(100))
                .await
        );
        assert!(
            !transport
                .wait_for_decisions(2, Duration::from_millis(20))
                .await
        );
        assert_eq!(
            transport.decisions_for("t1"),
            vec![("p1".to_string(), Action::Commit)]
        );
    }
}
