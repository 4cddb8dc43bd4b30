//! Participant and cluster command implementations.

use hybridtx_server::{serve_cluster, serve_participant, ClusterConfig, ParticipantConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Runs one participant node.
pub async fn run(port: u16, latency_ms: u64, reject: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ParticipantConfig::new(SocketAddr::from(([0, 0, 0, 0], port)))
        .with_latency(Duration::from_millis(latency_ms));
    if reject {
        config = config.rejecting();
    }

    tracing::info!(port, "starting participant");
    serve_participant(config).await?;
    Ok(())
}

/// Runs `count` participants starting at `base_port`.
pub async fn run_cluster(
    base_port: u16,
    count: u16,
    latency_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClusterConfig {
        base_port,
        count,
        latency: Duration::from_millis(latency_ms),
        ..ClusterConfig::default()
    };

    tracing::info!(
        "starting {count} participants (ports {base_port} to {})",
        u32::from(base_port) + u32::from(count.saturating_sub(1))
    );
    serve_cluster(config).await?;
    Ok(())
}
