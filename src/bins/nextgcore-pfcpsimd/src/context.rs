//! PFCP Simulator Context
//!
//! The client handle for one simulated control-plane endpoint, the PFCP
//! sessions it owns and the registry those sessions are tracked in.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, RwLock};

use ogs_pfcp::ie::Ie;
use ogs_pfcp::types::{recovery_time_stamp_now, FSeid, NodeId};
use tokio_util::sync::CancellationToken;

use crate::config::PfcpSimConfig;
use crate::error::{PfcpSimError, SimResult};
use crate::id_alloc::IdAllocator;
use crate::pfcp_path::PfcpPath;
use crate::pfcp_sm::AssociationState;
use crate::{lock, read, write};

// ============================================================================
// Session
// ============================================================================

/// One PFCP session and the rules installed with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    local_seid: u64,
    peer_seid: u64,
    pdrs: Vec<Ie>,
    fars: Vec<Ie>,
    qers: Vec<Ie>,
    urrs: Vec<Ie>,
}

impl Session {
    pub fn new(local_seid: u64, peer_seid: u64) -> Self {
        Self {
            local_seid,
            peer_seid,
            pdrs: Vec::new(),
            fars: Vec::new(),
            qers: Vec::new(),
            urrs: Vec::new(),
        }
    }

    pub fn with_rules(mut self, pdrs: Vec<Ie>, fars: Vec<Ie>, qers: Vec<Ie>, urrs: Vec<Ie>) -> Self {
        self.pdrs = pdrs;
        self.fars = fars;
        self.qers = qers;
        self.urrs = urrs;
        self
    }

    pub fn local_seid(&self) -> u64 {
        self.local_seid
    }

    /// Zero until the UPF has accepted the establishment
    pub fn peer_seid(&self) -> u64 {
        self.peer_seid
    }

    pub fn is_active(&self) -> bool {
        self.peer_seid != 0
    }

    pub fn pdrs(&self) -> &[Ie] {
        &self.pdrs
    }

    pub fn fars(&self) -> &[Ie] {
        &self.fars
    }

    pub fn qers(&self) -> &[Ie] {
        &self.qers
    }

    pub fn urrs(&self) -> &[Ie] {
        &self.urrs
    }

    /// Replace the FARs kept for bookkeeping after a modification
    pub fn set_fars(&mut self, fars: Vec<Ie>) {
        self.fars = fars;
    }
}

// ============================================================================
// Session Registry
// ============================================================================

/// Active sessions keyed by caller-chosen index, iterated in index order
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<u32, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session previously stored under `index`, if any
    pub fn insert(&self, index: u32, session: Session) -> Option<Session> {
        lock(&self.sessions).insert(index, session)
    }

    pub fn get(&self, index: u32) -> Option<Session> {
        lock(&self.sessions).get(&index).cloned()
    }

    pub fn remove(&self, index: u32) -> Option<Session> {
        lock(&self.sessions).remove(&index)
    }

    /// Apply `f` to the session under `index`; false if there is none
    pub fn update(&self, index: u32, f: impl FnOnce(&mut Session)) -> bool {
        match lock(&self.sessions).get_mut(&index) {
            Some(session) => {
                f(session);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }

    pub fn indices(&self) -> Vec<u32> {
        lock(&self.sessions).keys().copied().collect()
    }

    /// Remove every session, in index order
    pub fn drain(&self) -> Vec<(u32, Session)> {
        std::mem::take(&mut *lock(&self.sessions)).into_iter().collect()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Control-plane PFCP client for one UPF peer
#[derive(Debug)]
pub struct PfcpClient {
    pub(crate) config: PfcpSimConfig,
    pub(crate) recovery_time_stamp: u32,
    pub(crate) ids: Arc<IdAllocator>,
    path: Mutex<Option<Arc<PfcpPath>>>,
    local_node_id: Mutex<Option<NodeId>>,
    pub(crate) alive: Arc<RwLock<bool>>,
    pub(crate) heartbeat_cancel: Mutex<Option<CancellationToken>>,
    sessions: SessionRegistry,
}

impl PfcpClient {
    pub fn new(config: PfcpSimConfig) -> Self {
        Self {
            config,
            recovery_time_stamp: recovery_time_stamp_now(),
            ids: Arc::new(IdAllocator::new()),
            path: Mutex::new(None),
            local_node_id: Mutex::new(None),
            alive: Arc::new(RwLock::new(false)),
            heartbeat_cancel: Mutex::new(None),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &PfcpSimConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn recovery_time_stamp(&self) -> u32 {
        self.recovery_time_stamp
    }

    /// Open the N4 path to the configured peer, replacing any previous one
    pub async fn connect(&self) -> SimResult<()> {
        let remote = self.config.remote_endpoint();
        let path = PfcpPath::open(&remote, self.config.local_address, self.recovery_time_stamp).await?;
        let node_id = match &self.config.node_id {
            Some(id) => match id.parse::<IpAddr>() {
                Ok(ip) => NodeId::from(ip),
                Err(_) => NodeId::Fqdn(id.clone()),
            },
            None => NodeId::from(path.local_addr().ip()),
        };
        log::info!("PFCP client connected to {} as node {}", path.remote_addr(), node_id);

        self.disconnect();
        *lock(&self.local_node_id) = Some(node_id);
        *lock(&self.path) = Some(Arc::new(path));
        Ok(())
    }

    /// Stop heartbeats and close the path. Safe to call more than once.
    pub fn disconnect(&self) {
        self.stop_heartbeats();
        *write(&self.alive) = false;
        if let Some(path) = lock(&self.path).take() {
            path.close();
        }
    }

    pub fn state(&self) -> AssociationState {
        if lock(&self.path).is_none() {
            AssociationState::Disconnected
        } else if *read(&self.alive) {
            AssociationState::Associated
        } else {
            AssociationState::Connected
        }
    }

    pub(crate) fn path(&self) -> SimResult<Arc<PfcpPath>> {
        lock(&self.path).clone().ok_or(PfcpSimError::NotConnected)
    }

    pub(crate) fn local_node_id(&self) -> SimResult<NodeId> {
        lock(&self.local_node_id).clone().ok_or(PfcpSimError::NotConnected)
    }

    /// CP F-SEID for `seid` on the local N4 address
    pub(crate) fn local_f_seid(&self, path: &PfcpPath, seid: u64) -> FSeid {
        FSeid::new(seid, path.local_addr().ip())
    }

    pub(crate) fn stop_heartbeats(&self) {
        if let Some(token) = lock(&self.heartbeat_cancel).take() {
            token.cancel();
        }
    }
}

impl Drop for PfcpClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
