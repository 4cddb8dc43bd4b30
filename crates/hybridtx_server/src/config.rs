//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Configuration for the coordinator's HTTP endpoint.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Upper bound on one participant call. `None` leaves calls unbounded.
    pub participant_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            participant_timeout: None,
        }
    }

    /// Bounds every participant call by `timeout`.
    pub fn with_participant_timeout(mut self, timeout: Duration) -> Self {
        self.participant_timeout = Some(timeout);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8082)))
    }
}

/// Configuration for one participant node.
#[derive(Debug, Clone)]
pub struct ParticipantConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Simulated work before each prepare is answered.
    pub latency: Duration,
    /// Reject every prepare (fault injection).
    pub reject_prepares: bool,
}

impl ParticipantConfig {
    /// Default simulated prepare latency.
    pub const DEFAULT_LATENCY: Duration = Duration::from_secs(3);

    /// Creates a participant configuration with the default latency.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            latency: Self::DEFAULT_LATENCY,
            reject_prepares: false,
        }
    }

    /// Sets the simulated prepare latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the participant reject every prepare.
    pub fn rejecting(mut self) -> Self {
        self.reject_prepares = true;
        self
    }
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8081)))
    }
}

/// Configuration for a local cluster of participants on consecutive ports.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Interface every node binds to.
    pub host: IpAddr,
    /// Port of the first node.
    pub base_port: u16,
    /// Number of nodes.
    pub count: u16,
    /// Simulated prepare latency of every node.
    pub latency: Duration,
}

impl ClusterConfig {
    /// Returns the configuration of each node.
    pub fn nodes(&self) -> impl Iterator<Item = ParticipantConfig> + '_ {
        (0..self.count).filter_map(move |i| {
            let port = self.base_port.checked_add(i)?;
            Some(ParticipantConfig::new(SocketAddr::new(self.host, port)).with_latency(self.latency))
        })
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            base_port: 8081,
            count: 100,
            latency: ParticipantConfig::DEFAULT_LATENCY,
        }
    }
}
