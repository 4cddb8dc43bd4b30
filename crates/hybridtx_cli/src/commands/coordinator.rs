//! Coordinator command implementation.

use hybridtx_core::{CoordinatorConfig, RoutingPolicy};
use hybridtx_server::{serve_coordinator, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Flags of the coordinator command.
#[derive(Debug)]
pub struct Options {
    /// Port to listen on.
    pub port: u16,
    /// WAL file.
    pub wal: PathBuf,
    /// Data-blind 2PC instead of hybrid routing.
    pub standard: bool,
    /// Slow-path deadline in milliseconds.
    pub lock_timeout_ms: u64,
    /// Slow-path poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Per-call participant timeout in milliseconds.
    pub participant_timeout_ms: Option<u64>,
}

impl Options {
    fn configs(self) -> (ServerConfig, CoordinatorConfig) {
        let mut server = ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], self.port)));
        if let Some(ms) = self.participant_timeout_ms {
            server = server.with_participant_timeout(Duration::from_millis(ms));
        }

        let routing = if self.standard {
            RoutingPolicy::Standard
        } else {
            RoutingPolicy::Hybrid
        };
        let coordinator = CoordinatorConfig::new(self.wal)
            .with_routing(routing)
            .with_lock_timeout(Duration::from_millis(self.lock_timeout_ms))
            .with_lock_poll_interval(Duration::from_millis(self.poll_interval_ms));

        (server, coordinator)
    }
}

/// Runs the coordinator command.
pub async fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    let (server, coordinator) = options.configs();
    tracing::info!(port = server.bind_addr.port(), "starting coordinator");
    serve_coordinator(server, coordinator).await?;
    Ok(())
}
