//! PFCP Association State Machine
//!
//! Association setup and release towards the UPF, and the heartbeat
//! supervisor that runs while the association is up.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use ogs_pfcp::header::PfcpMessageType;
use ogs_pfcp::PfcpMessage;
use tokio_util::sync::CancellationToken;

use crate::context::PfcpClient;
use crate::error::{PfcpSimError, SimResult};
use crate::id_alloc::IdAllocator;
use crate::pfcp_path::PfcpPath;
use crate::{lock, read, write};

/// Association states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    /// No N4 path
    Disconnected,
    /// Path open, no association
    Connected,
    /// Association established and supervised
    Associated,
}

impl AssociationState {
    pub fn name(&self) -> &'static str {
        match self {
            AssociationState::Disconnected => "PFCP_STATE_DISCONNECTED",
            AssociationState::Connected => "PFCP_STATE_CONNECTED",
            AssociationState::Associated => "PFCP_STATE_ASSOCIATED",
        }
    }
}

impl std::fmt::Display for AssociationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Check that `resp` is the expected, accepted response
pub(crate) fn check_response(resp: &PfcpMessage, expected: PfcpMessageType) -> SimResult<()> {
    if resp.message_type() != expected {
        return Err(PfcpSimError::InvalidResponse {
            expected,
            actual: resp.message_type(),
        });
    }
    let cause = resp.cause()?;
    if !cause.is_accepted() {
        return Err(PfcpSimError::InvalidCause {
            message: expected,
            cause,
        });
    }
    Ok(())
}

impl PfcpClient {
    pub fn is_association_alive(&self) -> bool {
        *read(&self.alive)
    }

    /// Send an Association Setup Request and, once accepted, start the
    /// heartbeat supervisor.
    pub async fn setup_association(&self) -> SimResult<()> {
        self.config.validate()?;
        let path = self.path()?;
        let node_id = self.local_node_id()?;

        let before = self.state();
        self.stop_heartbeats();
        *write(&self.alive) = false;

        self.ids.reset_sequence_number();
        let seq = self.ids.next_sequence_number()?;
        let req = PfcpMessage::association_setup_request(seq, &node_id, self.recovery_time_stamp);
        let resp = path.request(&req, self.config.response_timeout()).await?;
        check_response(&resp, PfcpMessageType::AssociationSetupResponse)?;

        if let Ok(peer) = resp.node_id() {
            log::info!("PFCP associated with UPF node {peer}");
        }
        *write(&self.alive) = true;
        log::debug!(
            "PFCP state transition: {} -> {}",
            before.name(),
            AssociationState::Associated.name()
        );
        self.start_heartbeats(path);
        Ok(())
    }

    /// Release the association. The supervisor is stopped and the
    /// association marked down even when the release goes unanswered.
    pub async fn teardown_association(&self) -> SimResult<()> {
        if !self.is_association_alive() {
            return Err(PfcpSimError::AssociationInactive);
        }
        let path = self.path()?;
        let node_id = self.local_node_id()?;

        let seq = self.ids.next_sequence_number()?;
        let req = PfcpMessage::association_release_request(seq, &node_id);
        let result = path.request(&req, self.config.response_timeout()).await;

        self.stop_heartbeats();
        *write(&self.alive) = false;
        log::debug!(
            "PFCP state transition: {} -> {}",
            AssociationState::Associated.name(),
            AssociationState::Connected.name()
        );

        check_response(&result?, PfcpMessageType::AssociationReleaseResponse)?;
        log::info!("PFCP association released");
        Ok(())
    }

    fn start_heartbeats(&self, path: Arc<PfcpPath>) {
        let token = CancellationToken::new();
        if let Some(old) = lock(&self.heartbeat_cancel).replace(token.clone()) {
            old.cancel();
        }
        tokio::spawn(heartbeat_loop(HeartbeatContext {
            path,
            ids: self.ids.clone(),
            alive: self.alive.clone(),
            period: self.config.heartbeat_period(),
            timeout: self.config.response_timeout(),
            recovery_time_stamp: self.recovery_time_stamp,
            cancel: token,
        }));
    }
}

struct HeartbeatContext {
    path: Arc<PfcpPath>,
    ids: Arc<IdAllocator>,
    alive: Arc<RwLock<bool>>,
    period: Duration,
    timeout: Duration,
    recovery_time_stamp: u32,
    cancel: CancellationToken,
}

impl HeartbeatContext {
    async fn send_heartbeat(&self) -> SimResult<()> {
        let seq = self.ids.next_sequence_number()?;
        let req = PfcpMessage::heartbeat_request(seq, self.recovery_time_stamp);
        let resp = self.path.request(&req, self.timeout).await?;
        if resp.message_type() != PfcpMessageType::HeartbeatResponse {
            return Err(PfcpSimError::InvalidResponse {
                expected: PfcpMessageType::HeartbeatResponse,
                actual: resp.message_type(),
            });
        }
        Ok(())
    }
}

async fn heartbeat_loop(ctx: HeartbeatContext) {
    log::debug!("PFCP heartbeat supervisor started (period {:?})", ctx.period);
    let start = tokio::time::Instant::now() + ctx.period;
    let mut ticker = tokio::time::interval_at(start, ctx.period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                log::debug!("PFCP heartbeat supervisor cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let result = ctx.send_heartbeat().await;
        // A teardown may have happened while the heartbeat was in flight
        if ctx.cancel.is_cancelled() {
            return;
        }
        match result {
            Ok(()) => *write(&ctx.alive) = true,
            Err(e) => {
                *write(&ctx.alive) = false;
                log::warn!("PFCP heartbeat failed, association lost: {e}");
                return;
            }
        }
    }
}
