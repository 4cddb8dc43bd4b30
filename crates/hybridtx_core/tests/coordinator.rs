//! End-to-end coordinator behavior over the in-memory transport.

use hybridtx_core::{
    CommitMode, CoordinatorConfig, CoreError, MockTransport, MockVote, RoutingPolicy,
    TransactionManager, WalManager, WalRecord,
};
use hybridtx_protocol::{Action, TransactionRequest};
use hybridtx_storage::InMemoryBackend;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_lock_poll_interval(Duration::from_millis(10))
        .with_lock_timeout(Duration::from_secs(5))
}

fn coordinator(
    transport: MockTransport,
) -> (Arc<TransactionManager<MockTransport>>, InMemoryBackend) {
    let backend = InMemoryBackend::new();
    let wal = WalManager::new(Box::new(backend.clone())).unwrap();
    (
        Arc::new(TransactionManager::new(&config(), wal, transport)),
        backend,
    )
}

fn lines(backend: &InMemoryBackend) -> Vec<String> {
    String::from_utf8(backend.data())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn disjoint_transactions_run_in_parallel() {
    let transport = MockTransport::new().with_prepare_delay(Duration::from_millis(200));
    let (tm, _) = coordinator(transport);

    let started = Instant::now();
    let (a, b) = tokio::join!(
        tm.submit(TransactionRequest::new("a", ["user-1"], ["p1", "p2"])),
        tm.submit(TransactionRequest::new("b", ["user-2"], ["p1", "p2"])),
    );

    assert_eq!(a.unwrap().mode, CommitMode::FastPath);
    assert_eq!(b.unwrap().mode, CommitMode::FastPath);
    // Serialized execution would need at least 400ms.
    assert!(started.elapsed() < Duration::from_millis(380));
}

#[tokio::test]
async fn hot_key_is_serialized_through_the_slow_path() {
    let transport = MockTransport::new().with_prepare_delay(Duration::from_millis(150));
    let (tm, backend) = coordinator(transport);

    let first = {
        let tm = Arc::clone(&tm);
        tokio::spawn(async move {
            tm.submit(TransactionRequest::new("t1", ["HOT_KEY"], ["p1"]))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let second = tm
        .submit(TransactionRequest::new("t2", ["HOT_KEY"], ["p1"]))
        .await
        .unwrap();
    let first = first.await.unwrap().unwrap();

    assert_eq!(first.mode, CommitMode::FastPath);
    assert_eq!(second.mode, CommitMode::SlowPath);
    assert_eq!(
        lines(&backend),
        vec!["RAFT_PROPOSE t2 HOT_KEY", "COMMIT t1", "COMMIT t2"]
    );
    assert_eq!(tm.analyzer().locked_count(), 0);
}

#[tokio::test]
async fn mixed_load_commits_everything() {
    let transport = MockTransport::new().with_prepare_delay(Duration::from_millis(10));
    let (tm, _) = coordinator(transport);

    let mut tasks = Vec::new();
    for i in 0..50 {
        let tm = Arc::clone(&tm);
        let key = if i < 40 {
            format!("user-{i}")
        } else {
            "HOT_KEY".to_string()
        };
        tasks.push(tokio::spawn(async move {
            tm.submit(TransactionRequest::new(format!("txn-{i}"), [key], ["p1", "p2"]))
                .await
        }));
    }

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    let stats = tm.stats();
    assert_eq!(stats.committed, 50);
    assert_eq!(stats.fast_path + stats.slow_path, 50);
    assert!(stats.slow_path >= 1);
    assert_eq!(tm.active_count(), 0);
}

#[tokio::test]
async fn decision_is_logged_before_participants_hear_it() {
    let transport = MockTransport::new();
    transport.set_vote("p3", MockVote::Reject);
    let (tm, backend) = coordinator(transport);

    let err = tm
        .submit(TransactionRequest::new("t9", ["k1", "k2"], ["p1", "p2", "p3"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::TransactionAborted { acks: 2, .. }));

    // The WAL already holds the decision when submit returns; delivery is
    // asynchronous.
    assert_eq!(lines(&backend), vec!["ABORT t9"]);
    assert!(tm
        .transport()
        .wait_for_decisions(3, Duration::from_secs(1))
        .await);
    let mut delivered = tm.transport().decisions_for("t9");
    delivered.sort();
    assert_eq!(
        delivered,
        vec![
            ("p1".to_string(), Action::Abort),
            ("p2".to_string(), Action::Abort),
            ("p3".to_string(), Action::Abort),
        ]
    );
}

#[tokio::test]
async fn standard_routing_never_waits() {
    let backend = InMemoryBackend::new();
    let wal = WalManager::new(Box::new(backend.clone())).unwrap();
    let config = config().with_routing(RoutingPolicy::Standard);
    let tm = Arc::new(TransactionManager::new(
        &config,
        wal,
        MockTransport::new().with_prepare_delay(Duration::from_millis(100)),
    ));

    let started = Instant::now();
    let (a, b) = tokio::join!(
        tm.submit(TransactionRequest::new("s1", ["HOT_KEY"], ["p1"])),
        tm.submit(TransactionRequest::new("s2", ["HOT_KEY"], ["p1"])),
    );
    assert_eq!(a.unwrap().mode, CommitMode::Standard);
    assert_eq!(b.unwrap().mode, CommitMode::Standard);
    assert!(started.elapsed() < Duration::from_millis(190));
    assert!(lines(&backend).iter().all(|l| !l.starts_with("RAFT_PROPOSE")));
}

#[tokio::test]
async fn restart_keeps_history_but_not_locks() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    let config = CoordinatorConfig {
        wal_path: dir.path().join("coordinator.log"),
        ..config
    };

    {
        let tm = TransactionManager::open(&config, MockTransport::new()).unwrap();
        tm.submit(TransactionRequest::new("t1", ["a"], ["p1"]))
            .await
            .unwrap();

        // A second coordinator cannot share the log.
        let err = TransactionManager::open(&config, MockTransport::new()).unwrap_err();
        assert!(matches!(err, CoreError::Storage(ref e) if e.is_locked()));
    }

    let tm = TransactionManager::open(&config, MockTransport::new()).unwrap();
    assert_eq!(
        tm.wal().records().unwrap(),
        vec![WalRecord::decision("t1", Action::Commit)]
    );
    assert_eq!(tm.wal().audit().unwrap().commits, 1);
    assert_eq!(tm.analyzer().locked_count(), 0);

    tm.submit(TransactionRequest::new("t2", ["a"], ["p1"]))
        .await
        .unwrap();
    assert_eq!(tm.wal().read_all().unwrap(), vec!["COMMIT t1", "COMMIT t2"]);
}
