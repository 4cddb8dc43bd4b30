//! Key-level dependency analysis and locking.
//!
//! The analyzer keeps one table mapping each locked key to the transaction
//! that holds it. A transaction takes all of its keys or none of them; a
//! partial acquisition is never visible to other callers.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// How [`DependencyAnalyzer::try_lock`] behaves when a key is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Fail immediately.
    NoWait,
    /// Retry until the keys are free or the lock timeout passes.
    Wait,
}

/// Tracks which transaction holds which key.
#[derive(Debug)]
pub struct DependencyAnalyzer {
    /// key -> owning transaction id.
    active_locks: Mutex<HashMap<String, String>>,
    /// Signalled whenever keys are released.
    released: Notify,
    /// Upper bound between two attempts of a waiting caller.
    poll_interval: Duration,
    /// How long a waiting caller keeps trying.
    lock_timeout: Duration,
}

impl Default for DependencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyAnalyzer {
    /// Default upper bound between two lock attempts.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
    /// Default waiting deadline.
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates an analyzer with an empty lock table and default timing.
    pub fn new() -> Self {
        Self::with_timing(Self::DEFAULT_POLL_INTERVAL, Self::DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an analyzer with explicit waiting parameters.
    pub fn with_timing(poll_interval: Duration, lock_timeout: Duration) -> Self {
        Self {
            active_locks: Mutex::new(HashMap::new()),
            released: Notify::new(),
            poll_interval,
            lock_timeout,
        }
    }

    /// Returns true if none of `keys` is currently held.
    ///
    /// The answer is a snapshot: another transaction may take a key right
    /// after this returns. Callers that act on it must still go through
    /// [`DependencyAnalyzer::try_lock`].
    #[must_use]
    pub fn is_independent(&self, keys: &[String]) -> bool {
        let locks = self.active_locks.lock();
        keys.iter().all(|k| !locks.contains_key(k))
    }

    /// Takes every key in `keys` for `txn_id` if none of them is held.
    ///
    /// All-or-nothing; on `false` the table is unchanged.
    #[must_use]
    pub fn try_acquire(&self, txn_id: &str, keys: &[String]) -> bool {
        let mut locks = self.active_locks.lock();
        if keys.iter().any(|k| locks.contains_key(k)) {
            return false;
        }
        for key in keys {
            locks.insert(key.clone(), txn_id.to_string());
        }
        true
    }

    /// Takes every key in `keys` for `txn_id`.
    ///
    /// With [`LockMode::NoWait`] this is a single attempt. With
    /// [`LockMode::Wait`] the caller is re-tried on every release and at
    /// least once per poll interval, until it succeeds or the lock timeout
    /// has passed. Waiters are not queued fairly.
    pub async fn try_lock(&self, txn_id: &str, keys: &[String], mode: LockMode) -> bool {
        let deadline = Instant::now() + self.lock_timeout;

        loop {
            // Register for the release signal before looking at the table so
            // a release between the attempt and the wait is not missed.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(txn_id, keys) {
                return true;
            }
            if mode == LockMode::NoWait {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(txn_id, waited = ?self.lock_timeout, "gave up waiting for locks");
                return false;
            }

            let wait = self.poll_interval.min(deadline - now);
            let _ = tokio::time::timeout(wait, notified).await;
        }
    }

    /// Drops the locks on `keys` and wakes waiting callers.
    ///
    /// Keys that are not held are ignored.
    pub fn release(&self, keys: &[String]) {
        {
            let mut locks = self.active_locks.lock();
            for key in keys {
                locks.remove(key);
            }
        }
        self.released.notify_waiters();
    }

    /// Returns the transaction holding `key`, if any.
    #[must_use]
    pub fn owner(&self, key: &str) -> Option<String> {
        self.active_locks.lock().get(key).cloned()
    }

    /// Returns how many keys are currently held.
    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.active_locks.lock().len()
    }

    /// Returns the configured waiting deadline.
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn independent_until_locked() {
        let analyzer = DependencyAnalyzer::new();
        let ab = keys(&["a", "b"]);

        assert!(analyzer.is_independent(&ab));
        assert!(analyzer.try_acquire("t1", &keys(&["b"])));
        assert!(!analyzer.is_independent(&ab));
        assert!(analyzer.is_independent(&keys(&["c"])));
        assert!(analyzer.is_independent(&[]));
    }

    #[test]
    fn acquisition_is_all_or_nothing() {
        let analyzer = DependencyAnalyzer::new();
        assert!(analyzer.try_acquire("t1", &keys(&["b"])));

        assert!(!analyzer.try_acquire("t2", &keys(&["a", "b", "c"])));
        assert_eq!(analyzer.owner("a"), None);
        assert_eq!(analyzer.owner("c"), None);
        assert_eq!(analyzer.owner("b").as_deref(), Some("t1"));
        assert_eq!(analyzer.locked_count(), 1);
    }

    #[test]
    fn release_frees_keys() {
        let analyzer = DependencyAnalyzer::new();
        let ab = keys(&["a", "b"]);
        assert!(analyzer.try_acquire("t1", &ab));

        analyzer.release(&ab);
        assert_eq!(analyzer.locked_count(), 0);
        assert!(analyzer.try_acquire("t2", &ab));

        // Unheld keys are ignored.
        analyzer.release(&keys(&["zzz"]));
        assert_eq!(analyzer.locked_count(), 2);
    }

    #[tokio::test]
    async fn no_wait_fails_fast() {
        let analyzer = DependencyAnalyzer::new();
        assert!(analyzer.try_lock("t1", &keys(&["k"]), LockMode::NoWait).await);

        let started = std::time::Instant::now();
        assert!(!analyzer.try_lock("t2", &keys(&["k"]), LockMode::NoWait).await);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn waiter_wakes_on_release() {
        let analyzer = Arc::new(DependencyAnalyzer::with_timing(
            Duration::from_secs(5),
            Duration::from_secs(10),
        ));
        let hot = keys(&["HOT_KEY"]);
        assert!(analyzer.try_acquire("holder", &hot));

        let waiter = {
            let analyzer = Arc::clone(&analyzer);
            let hot = hot.clone();
            tokio::spawn(async move { analyzer.try_lock("waiter", &hot, LockMode::Wait).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = std::time::Instant::now();
        analyzer.release(&hot);

        assert!(waiter.await.unwrap());
        // Woken by the release, not by the 5s poll.
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(analyzer.owner("HOT_KEY").as_deref(), Some("waiter"));
    }

    #[tokio::test]
    async fn waiter_times_out() {
        let analyzer =
            DependencyAnalyzer::with_timing(Duration::from_millis(10), Duration::from_millis(100));
        let hot = keys(&["HOT_KEY"]);
        assert!(analyzer.try_acquire("holder", &hot));

        let started = std::time::Instant::now();
        assert!(!analyzer.try_lock("waiter", &hot, LockMode::Wait).await);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(analyzer.owner("HOT_KEY").as_deref(), Some("holder"));
    }

    #[tokio::test]
    async fn racing_waiters_get_exclusive_ownership() {
        let analyzer = Arc::new(DependencyAnalyzer::with_timing(
            Duration::from_millis(5),
            Duration::from_secs(10),
        ));
        let hot = keys(&["HOT_KEY"]);
        let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let analyzer = Arc::clone(&analyzer);
            let hot = hot.clone();
            let inside = Arc::clone(&inside);
            tasks.push(tokio::spawn(async move {
                let id = format!("t{i}");
                assert!(analyzer.try_lock(&id, &hot, LockMode::Wait).await);
                let concurrent = inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(concurrent, 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                analyzer.release(&hot);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(analyzer.locked_count(), 0);
    }

    proptest! {
        #[test]
        fn held_key_sets_are_disjoint(
            batches in prop::collection::vec(
                prop::collection::vec(0u8..12, 0..5),
                1..30,
            )
        ) {
            let analyzer = DependencyAnalyzer::new();
            let mut held: HashSet<String> = HashSet::new();

            for (i, batch) in batches.iter().enumerate() {
                let ks: Vec<String> = batch.iter().map(|k| format!("k{k}")).collect();
                let expected = ks.iter().all(|k| !held.contains(k));

                prop_assert_eq!(analyzer.is_independent(&ks), expected);
                prop_assert_eq!(analyzer.try_acquire(&format!("t{i}"), &ks), expected);
                if expected {
                    held.extend(ks);
                }
                prop_assert_eq!(analyzer.locked_count(), held.len());
            }
        }
    }
}
