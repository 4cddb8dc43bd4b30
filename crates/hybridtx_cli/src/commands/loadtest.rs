//! Load test command implementation.

use clap::ValueEnum;
use hybridtx_protocol::{TransactionRequest, TXN_PATH};
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Key shared by every contending request.
pub const HOT_KEY: &str = "HOT_KEY";

/// How much the generated transactions overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Contention {
    /// Every request uses the same key.
    High,
    /// Every request uses its own key.
    Low,
    /// 80 % own keys, the rest on the shared key.
    Mixed,
}

impl Contention {
    /// Returns the key used by request `index` out of `total`.
    pub fn key_for(self, index: usize, total: usize) -> String {
        let independent = match self {
            Contention::High => false,
            Contention::Low => true,
            Contention::Mixed => index < total * 4 / 5,
        };
        if independent {
            format!("user-{index}")
        } else {
            HOT_KEY.to_string()
        }
    }

    fn label(self) -> &'static str {
        match self {
            Contention::High => "high",
            Contention::Low => "low",
            Contention::Mixed => "mixed",
        }
    }
}

/// Parameters of one load test run.
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    /// Contention pattern.
    pub contention: Contention,
    /// Number of concurrent requests.
    pub requests: usize,
    /// Coordinator base URL.
    pub coordinator: String,
    /// Participant base URLs named in every request.
    pub participants: Vec<String>,
}

/// How one request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Committed,
    Refused,
    Aborted,
    Failed,
}

impl Outcome {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => Outcome::Committed,
            StatusCode::CONFLICT => Outcome::Refused,
            StatusCode::INTERNAL_SERVER_ERROR => Outcome::Aborted,
            _ => Outcome::Failed,
        }
    }
}

/// Result of a load test run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTestResult {
    /// Requests sent.
    pub total: usize,
    /// Committed transactions.
    pub successes: usize,
    /// Everything else.
    pub failures: usize,
    /// Failures answered with 409 (conflict or timeout).
    pub refused: usize,
    /// Failures answered with 500 (aborted).
    pub aborted: usize,
    /// Wall time of the whole run.
    pub duration: Duration,
    /// Committed transactions per second.
    pub throughput: f64,
}

impl LoadTestResult {
    fn from_outcomes(outcomes: &[Outcome], duration: Duration) -> Self {
        let count = |o: Outcome| outcomes.iter().filter(|x| **x == o).count();
        let successes = count(Outcome::Committed);
        let throughput = if duration.as_secs_f64() > 0.0 {
            successes as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total: outcomes.len(),
            successes,
            failures: outcomes.len() - successes,
            refused: count(Outcome::Refused),
            aborted: count(Outcome::Aborted),
            duration,
            throughput,
        }
    }

    /// Prints the results table.
    pub fn print_summary(&self, contention: Contention) {
        println!();
        println!("========================================");
        println!("          LOAD TEST RESULTS             ");
        println!("========================================");
        println!("Mode:             {} contention", contention.label());
        println!("Requests:         {}", self.total);
        println!("Total Time:       {:?}", self.duration);
        println!("Successful Txns:  {}", self.successes);
        println!(
            "Failed Txns:      {} ({} refused, {} aborted)",
            self.failures, self.refused, self.aborted
        );
        println!("Throughput:       {:.2} txn/sec", self.throughput);
        println!("========================================");
        println!();
    }
}

/// Builds the requests of one run; ids carry a per-run prefix so reruns
/// against the same coordinator never collide.
fn build_requests(config: &LoadTestConfig, run_id: &str) -> Vec<TransactionRequest> {
    (0..config.requests)
        .map(|i| {
            TransactionRequest::new(
                format!("{run_id}-txn-{i}"),
                [config.contention.key_for(i, config.requests)],
                config.participants.iter().cloned(),
            )
        })
        .collect()
}

/// Sends every request concurrently and tallies the answers.
pub async fn run(config: LoadTestConfig) -> Result<LoadTestResult, Box<dyn std::error::Error>> {
    let run_id = uuid::Uuid::new_v4().simple().to_string();
    let run_id = &run_id[..8];
    let url = format!("{}{TXN_PATH}", config.coordinator.trim_end_matches('/'));
    let client = reqwest::Client::new();

    tracing::info!(
        run_id,
        requests = config.requests,
        contention = config.contention.label(),
        "starting load test"
    );

    let started = Instant::now();
    let mut calls = JoinSet::new();
    for request in build_requests(&config, run_id) {
        let client = client.clone();
        let url = url.clone();
        calls.spawn(async move {
            match client.post(&url).json(&request).send().await {
                Ok(response) => Outcome::from_status(response.status()),
                Err(e) => {
                    tracing::debug!(txn_id = %request.id, error = %e, "request failed");
                    Outcome::Failed
                }
            }
        });
    }

    let mut outcomes = Vec::with_capacity(config.requests);
    while let Some(joined) = calls.join_next().await {
        outcomes.push(joined.unwrap_or(Outcome::Failed));
    }

    Ok(LoadTestResult::from_outcomes(&outcomes, started.elapsed()))
}
