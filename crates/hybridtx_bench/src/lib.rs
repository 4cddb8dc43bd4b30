//! Benchmark utilities.

#![warn(missing_docs)]

use hybridtx_core::DependencyAnalyzer;

/// Generates `count` distinct keys named `<prefix>-<n>`.
pub fn keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

/// Creates an analyzer whose table already holds `held` keys, one per
/// transaction.
pub fn loaded_analyzer(held: usize) -> DependencyAnalyzer {
    let analyzer = DependencyAnalyzer::new();
    for (i, key) in keys("held", held).into_iter().enumerate() {
        let acquired = analyzer.try_acquire(&format!("txn-{i}"), &[key]);
        assert!(acquired, "fixture keys must be distinct");
    }
    analyzer
}

/// Creates `size` bytes of deterministic data.
pub fn pattern_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
