//! Transaction manager.

use crate::analyzer::{DependencyAnalyzer, LockMode};
use crate::config::{CoordinatorConfig, RoutingPolicy};
use crate::error::{CoreError, CoreResult};
use crate::stats::{CoordinatorStats, StatsSnapshot};
use crate::transaction::state::{CommitMode, CommitReceipt, TxnPhase};
use crate::transport::{ParticipantTransport, Vote};
use crate::wal::{WalManager, WalRecord};
use hybridtx_protocol::{Action, CommitRequest, TransactionRequest};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

type Registry = Arc<RwLock<HashMap<String, TxnPhase>>>;

/// Coordinates transactions across participants.
///
/// The manager owns the lock table, the WAL and the participant transport.
/// It is shared behind an `Arc` by every request handler; all methods take
/// `&self`.
///
/// ## Ordering
///
/// For each transaction:
/// 1. the slow-path intent is durable before its keys are requested,
/// 2. the decision is durable before any participant hears it,
/// 3. its keys are released only after the decision has been dispatched.
///
/// Once a transaction holds its keys, prepare and decision run on their own
/// task. Dropping the future returned by [`TransactionManager::submit`]
/// from that point on does not stop the protocol: the transaction is still
/// decided, logged and broadcast.
///
/// Transactions with disjoint keys run fully in parallel.
pub struct TransactionManager<T: ParticipantTransport> {
    /// Coordinator lock table.
    analyzer: Arc<DependencyAnalyzer>,
    /// Routing policy.
    routing: RoutingPolicy,
    /// In-flight transactions by id.
    in_flight: Registry,
    /// WAL, transport and counters shared with the 2PC tasks.
    rounds: Rounds<T>,
}

impl<T: ParticipantTransport> TransactionManager<T> {
    /// Opens the WAL named by `config` and creates a manager over it.
    ///
    /// The existing log is scanned and its size reported. It is not
    /// replayed: the lock table always starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL cannot be opened or read.
    pub fn open(config: &CoordinatorConfig, transport: T) -> CoreResult<Self> {
        let wal = WalManager::open(&config.wal_path)?;
        let audit = wal.audit()?;
        tracing::info!(
            path = %config.wal_path.display(),
            entries = audit.entries,
            commits = audit.commits,
            aborts = audit.aborts,
            "recovered WAL history; {} historical entries",
            audit.entries
        );
        if audit.unparsable > 0 {
            tracing::warn!(lines = audit.unparsable, "WAL contains unparsable lines");
        }
        Ok(Self::new(config, wal, transport))
    }

    /// Creates a manager over an already opened WAL.
    pub fn new(config: &CoordinatorConfig, wal: WalManager, transport: T) -> Self {
        Self {
            analyzer: Arc::new(DependencyAnalyzer::with_timing(
                config.lock_poll_interval,
                config.lock_timeout,
            )),
            routing: config.routing,
            in_flight: Arc::new(RwLock::new(HashMap::new())),
            rounds: Rounds {
                wal: Arc::new(wal),
                transport: Arc::new(transport),
                stats: Arc::new(CoordinatorStats::new()),
            },
        }
    }

    /// Runs `request` to a decision.
    ///
    /// Returns the receipt if every participant prepared. The keys held for
    /// the transaction are released once the decision has been dispatched,
    /// whatever the outcome. If the returned future is dropped while the
    /// transaction waits for its keys, nothing is held and it simply ends.
    /// If it is dropped later, the transaction runs to its decision in the
    /// background.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidRequest`] if the request fails validation
    /// - [`CoreError::AlreadyInFlight`] if the id is being coordinated
    /// - [`CoreError::Conflict`] if a fast-path lock attempt lost a race
    /// - [`CoreError::LockTimeout`] if slow-path keys stayed busy
    /// - [`CoreError::TransactionAborted`] if any participant did not prepare
    pub async fn submit(&self, request: TransactionRequest) -> CoreResult<CommitReceipt> {
        request.validate()?;
        let guard = self.register(&request.id)?;
        let keys = request.unique_keys();
        let mode = self.classify(&request.id, &keys);
        self.admit(request, keys, mode, guard).await
    }

    fn classify(&self, txn_id: &str, keys: &[String]) -> CommitMode {
        match self.routing {
            RoutingPolicy::Standard => CommitMode::Standard,
            RoutingPolicy::Hybrid => {
                let started = Instant::now();
                let independent = self.analyzer.is_independent(keys);
                tracing::debug!(
                    txn_id,
                    independent,
                    elapsed = ?started.elapsed(),
                    "dependency analysis"
                );
                if independent {
                    CommitMode::FastPath
                } else {
                    CommitMode::SlowPath
                }
            }
        }
    }

    /// Takes the keys `mode` calls for, then hands the transaction to a 2PC
    /// task and waits for its outcome.
    async fn admit(
        &self,
        request: TransactionRequest,
        keys: Vec<String>,
        mode: CommitMode,
        mut guard: TxnGuard,
    ) -> CoreResult<CommitReceipt> {
        guard.set_phase(TxnPhase::Classified);
        self.rounds.stats.record_route(mode);
        tracing::info!(
            txn_id = %request.id,
            mode = %mode,
            keys = keys.len(),
            participants = request.participants.len(),
            "routing transaction"
        );

        match mode {
            CommitMode::FastPath => {
                if !self
                    .analyzer
                    .try_lock(&request.id, &keys, LockMode::NoWait)
                    .await
                {
                    self.rounds.stats.record_conflict();
                    tracing::info!(txn_id = %request.id, "fast path lost the race for its keys");
                    return Err(CoreError::conflict(&request.id));
                }
                guard.hold(keys);
            }
            CommitMode::SlowPath => {
                self.rounds
                    .log(WalRecord::raft_propose(&request.id, &keys))
                    .await;
                guard.set_phase(TxnPhase::LoggedIntent);

                let started = Instant::now();
                if !self
                    .analyzer
                    .try_lock(&request.id, &keys, LockMode::Wait)
                    .await
                {
                    self.rounds.stats.record_timeout();
                    let waited = started.elapsed();
                    tracing::warn!(txn_id = %request.id, ?waited, "timed out waiting for locks");
                    return Err(CoreError::LockTimeout {
                        txn_id: request.id,
                        waited,
                    });
                }
                tracing::debug!(txn_id = %request.id, waited = ?started.elapsed(), "slow path acquired locks");
                guard.hold(keys);
            }
            CommitMode::Standard => {}
        }

        let rounds = self.rounds.clone();
        let txn_id = request.id.clone();
        let task = tokio::spawn(async move { rounds.execute_2pc(request, mode, guard).await });
        task.await
            .map_err(|e| CoreError::internal(format!("2PC task for {txn_id} failed: {e}")))?
    }

    fn register(&self, txn_id: &str) -> CoreResult<TxnGuard> {
        let mut in_flight = self.in_flight.write();
        if in_flight.contains_key(txn_id) {
            self.rounds.stats.record_conflict();
            return Err(CoreError::AlreadyInFlight {
                txn_id: txn_id.to_string(),
            });
        }
        in_flight.insert(txn_id.to_string(), TxnPhase::Received);

        Ok(TxnGuard {
            txn_id: txn_id.to_string(),
            held: Vec::new(),
            analyzer: Arc::clone(&self.analyzer),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Returns the phase of an in-flight transaction.
    #[must_use]
    pub fn phase(&self, txn_id: &str) -> Option<TxnPhase> {
        self.in_flight.read().get(txn_id).copied()
    }

    /// Returns the number of transactions being coordinated.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.in_flight.read().len()
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.rounds.stats.snapshot()
    }

    /// Returns the routing policy.
    #[must_use]
    pub fn routing(&self) -> RoutingPolicy {
        self.routing
    }

    /// Returns the lock table.
    #[must_use]
    pub fn analyzer(&self) -> &DependencyAnalyzer {
        &self.analyzer
    }

    /// Returns the WAL.
    #[must_use]
    pub fn wal(&self) -> &WalManager {
        &self.rounds.wal
    }

    /// Returns the participant transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.rounds.transport
    }
}

impl<T: ParticipantTransport> std::fmt::Debug for TransactionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("routing", &self.routing)
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

/// The parts of the manager a detached 2PC task needs.
struct Rounds<T: ParticipantTransport> {
    wal: Arc<WalManager>,
    transport: Arc<T>,
    stats: Arc<CoordinatorStats>,
}

impl<T: ParticipantTransport> Clone for Rounds<T> {
    fn clone(&self) -> Self {
        Self {
            wal: Arc::clone(&self.wal),
            transport: Arc::clone(&self.transport),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: ParticipantTransport> Rounds<T> {
    /// Prepares, decides, logs and broadcasts. `guard` is dropped on return,
    /// which releases the keys after the decision has been dispatched.
    async fn execute_2pc(
        self,
        request: TransactionRequest,
        mode: CommitMode,
        guard: TxnGuard,
    ) -> CoreResult<CommitReceipt> {
        guard.set_phase(TxnPhase::Preparing);
        let participants = request.participants.len();

        // Phase 1: concurrent prepare, joined before deciding.
        let prepare = Arc::new(request.prepare_request());
        let acks = Arc::new(AtomicUsize::new(0));
        let mut calls = JoinSet::new();
        for participant in &request.participants {
            let transport = Arc::clone(&self.transport);
            let prepare = Arc::clone(&prepare);
            let acks = Arc::clone(&acks);
            let participant = participant.clone();
            calls.spawn(async move {
                match transport.prepare(&participant, &prepare).await {
                    Ok(Vote::Ack) => {
                        acks.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Vote::Reject) => {
                        tracing::debug!(txn_id = %prepare.txn_id, participant = %participant, "prepare rejected");
                    }
                    Err(e) => {
                        tracing::warn!(txn_id = %prepare.txn_id, participant = %participant, error = %e, "prepare failed");
                    }
                }
            });
        }
        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                tracing::error!(txn_id = %request.id, error = %e, "prepare task failed");
            }
        }

        let acks = acks.load(Ordering::SeqCst);
        let action = if acks == participants {
            Action::Commit
        } else {
            Action::Abort
        };

        // Phase 2: durable decision, then broadcast.
        self.log(WalRecord::decision(&request.id, action)).await;
        guard.set_phase(match action {
            Action::Commit => TxnPhase::Committed,
            Action::Abort => TxnPhase::Aborted,
        });
        self.broadcast(&request.id, &request.participants, action);
        drop(guard);

        match action {
            Action::Commit => {
                self.stats.record_commit();
                tracing::info!(txn_id = %request.id, mode = %mode, participants, "transaction committed");
                Ok(CommitReceipt {
                    txn_id: request.id,
                    mode,
                    participants,
                })
            }
            Action::Abort => {
                self.stats.record_abort();
                tracing::info!(txn_id = %request.id, mode = %mode, acks, participants, "transaction aborted");
                Err(CoreError::TransactionAborted {
                    txn_id: request.id,
                    mode,
                    acks,
                    participants,
                })
            }
        }
    }

    /// Sends the decision to every participant without waiting for replies.
    fn broadcast(&self, txn_id: &str, participants: &[String], action: Action) {
        let decision = Arc::new(CommitRequest::new(txn_id, action));
        for participant in participants {
            let transport = Arc::clone(&self.transport);
            let decision = Arc::clone(&decision);
            let participant = participant.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.commit(&participant, &decision).await {
                    tracing::warn!(
                        txn_id = %decision.txn_id,
                        participant = %participant,
                        error = %e,
                        "decision not delivered"
                    );
                }
            });
        }
    }

    /// Makes `record` durable on the blocking pool.
    ///
    /// A failed write is logged and counted; the protocol carries on.
    async fn log(&self, record: WalRecord) {
        let wal = Arc::clone(&self.wal);
        let txn_id = record.txn_id().to_string();
        let keyword = record.keyword();

        let result = tokio::task::spawn_blocking(move || wal.write(&record))
            .await
            .map_err(|e| CoreError::internal(format!("WAL task failed: {e}")))
            .and_then(|written| written);

        if let Err(e) = result {
            self.stats.record_wal_failure();
            tracing::error!(txn_id = %txn_id, %keyword, error = %e, "WAL write failed");
        }
    }
}

/// Registry entry and lock ownership for one transaction.
///
/// Dropping the guard releases the held keys and removes the registry
/// entry.
struct TxnGuard {
    txn_id: String,
    held: Vec<String>,
    analyzer: Arc<DependencyAnalyzer>,
    in_flight: Registry,
}

impl TxnGuard {
    fn set_phase(&self, phase: TxnPhase) {
        if let Some(current) = self.in_flight.write().get_mut(&self.txn_id) {
            *current = phase;
        }
    }

    fn hold(&mut self, keys: Vec<String>) {
        self.held = keys;
        self.set_phase(TxnPhase::Locked);
    }
}

impl Drop for TxnGuard {
    fn drop(&mut self) {
        self.set_phase(TxnPhase::Released);
        if !self.held.is_empty() {
            self.analyzer.release(&self.held);
        }
        self.in_flight.write().remove(&self.txn_id);
        tracing::debug!(txn_id = %self.txn_id, keys = self.held.len(), "released");
    }
}
