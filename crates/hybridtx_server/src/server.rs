//! Listeners for the coordinator, single participants and local clusters.

use crate::config::{ClusterConfig, ParticipantConfig, ServerConfig};
use crate::coordinator::coordinator_router;
use crate::error::{ServerError, ServerResult};
use crate::http::HttpTransport;
use crate::participant::{participant_router, ParticipantNode};
use axum::Router;
use hybridtx_core::{CoordinatorConfig, TransactionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Serves `router` on `listener` until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, router: Router) -> ServerResult<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn bind(addr: SocketAddr) -> ServerResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(ServerError::from)
}

/// Runs a coordinator with participants reached over HTTP.
///
/// The WAL named in `coordinator` is opened first; its history is audited
/// and logged but not replayed.
///
/// # Errors
///
/// Returns an error if the WAL cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn serve_coordinator(
    server: ServerConfig,
    coordinator: CoordinatorConfig,
) -> ServerResult<()> {
    let transport = match server.participant_timeout {
        Some(timeout) => HttpTransport::with_timeout(timeout)?,
        None => HttpTransport::new()?,
    };
    let manager = TransactionManager::open(&coordinator, transport)?;

    let listener = bind(server.bind_addr).await?;
    tracing::info!(
        addr = %server.bind_addr,
        routing = ?coordinator.routing,
        wal = %coordinator.wal_path.display(),
        "coordinator listening"
    );
    serve(listener, coordinator_router(Arc::new(manager))).await
}

/// Runs one participant node.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_participant(config: ParticipantConfig) -> ServerResult<()> {
    let listener = bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        latency = ?config.latency,
        reject_prepares = config.reject_prepares,
        "participant listening"
    );
    let node = Arc::new(ParticipantNode::new(&config));
    serve(listener, participant_router(node)).await
}

/// Runs `count` participants on consecutive ports until Ctrl+C.
///
/// Every address is bound before any node starts serving.
///
/// # Errors
///
/// Returns the first bind or serve error.
pub async fn serve_cluster(config: ClusterConfig) -> ServerResult<()> {
    let mut listeners = Vec::with_capacity(usize::from(config.count));
    for node in config.nodes() {
        let listener = bind(node.bind_addr).await?;
        listeners.push((listener, node));
    }

    tracing::info!(
        nodes = listeners.len(),
        base_port = config.base_port,
        "cluster running; press Ctrl+C to stop"
    );

    let mut nodes = JoinSet::new();
    for (listener, node) in listeners {
        let router = participant_router(Arc::new(ParticipantNode::new(&node)));
        nodes.spawn(serve(listener, router));
    }

    while let Some(joined) = nodes.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(ServerError::Internal(format!("node task failed: {e}"))),
        }
    }
    Ok(())
}
