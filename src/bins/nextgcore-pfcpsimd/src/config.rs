//! PFCP Simulator Configuration
//!
//! YAML configuration for the simulated control-plane endpoint. Every field
//! has a default, so an empty document is a valid configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use ogs_pfcp::PFCP_UDP_PORT;
use serde::{Deserialize, Serialize};

use crate::error::{PfcpSimError, SimResult};

/// PFCP simulator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PfcpSimConfig {
    /// UPF N4 address, `host` or `host:port`
    pub remote_peer: String,
    /// Source IP for the N4 socket; unset binds the wildcard address
    pub local_address: Option<IpAddr>,
    /// Node ID advertised in association messages; defaults to the bound IP
    pub node_id: Option<String>,
    pub response_timeout_ms: u64,
    pub heartbeat_period_ms: u64,
    /// IPv4 CIDR the UE addresses are taken from
    pub ue_pool: String,
    /// (g/e)NodeB N3 address used for downlink forwarding
    pub gnodeb_address: Ipv4Addr,
    /// UPF N3 address used in uplink PDRs
    pub n3_address: Ipv4Addr,
    pub network_instance: Option<String>,
}

impl Default for PfcpSimConfig {
    fn default() -> Self {
        Self {
            remote_peer: "127.0.0.1".to_string(),
            local_address: None,
            node_id: None,
            response_timeout_ms: 5000,
            heartbeat_period_ms: 5000,
            ue_pool: "17.0.0.0/24".to_string(),
            gnodeb_address: Ipv4Addr::new(10, 0, 0, 1),
            n3_address: Ipv4Addr::new(198, 18, 0, 1),
            network_instance: None,
        }
    }
}

impl PfcpSimConfig {
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PfcpSimError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> SimResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| PfcpSimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject timer values the association cannot run with
    pub fn validate(&self) -> SimResult<()> {
        if self.response_timeout_ms == 0 {
            return Err(PfcpSimError::Config("response_timeout_ms must be non-zero".into()));
        }
        if self.heartbeat_period_ms == 0 {
            return Err(PfcpSimError::Config("heartbeat_period_ms must be non-zero".into()));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_period_ms)
    }

    /// Remote peer as `host:port`, with the PFCP port filled in when absent
    pub fn remote_endpoint(&self) -> String {
        let peer = self.remote_peer.trim();
        if peer.parse::<SocketAddr>().is_ok() {
            return peer.to_string();
        }
        if let Ok(ip) = peer.parse::<IpAddr>() {
            return SocketAddr::new(ip, PFCP_UDP_PORT).to_string();
        }
        if peer.contains(':') {
            peer.to_string()
        } else {
            format!("{peer}:{PFCP_UDP_PORT}")
        }
    }
}
