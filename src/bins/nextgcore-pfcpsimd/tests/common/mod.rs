//! Common test utilities
//!
//! A mock UPF on a local UDP socket that answers N4 requests according to a
//! configurable behaviour and records everything it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nextgcore_pfcpsimd::rules::{FarBuilder, PdrBuilder, QerBuilder};
use nextgcore_pfcpsimd::{PfcpSimConfig, SessionRules};
use ogs_pfcp::types::{FSeid, NodeId, PfcpCause};
use ogs_pfcp::{PfcpMessage, PfcpMessageType};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// How the mock answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpfBehavior {
    Accept,
    Reject,
    Silent,
}

#[derive(Debug)]
struct MockState {
    behavior: UpfBehavior,
    received: Vec<PfcpMessage>,
    /// UP SEID -> CP SEID
    sessions: HashMap<u64, u64>,
    next_up_seid: u64,
    peer: Option<SocketAddr>,
}

/// Mock UPF for PFCP client testing
pub struct MockUpf {
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    answer_heartbeats: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

const RECOVERY_TIME_STAMP: u32 = 3_900_000_000;

impl MockUpf {
    pub async fn start(behavior: UpfBehavior) -> Self {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = socket.local_addr().unwrap();
        let state = Arc::new(Mutex::new(MockState {
            behavior,
            received: Vec::new(),
            sessions: HashMap::new(),
            next_up_seid: 0x1000,
            peer: None,
        }));
        let answer_heartbeats = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(serve(
            socket.clone(),
            addr,
            state.clone(),
            answer_heartbeats.clone(),
        ));

        Self {
            socket,
            addr,
            state,
            answer_heartbeats,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn set_behavior(&self, behavior: UpfBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }

    /// Keep answering everything except Heartbeat Requests
    pub fn stop_heartbeats(&self) {
        self.answer_heartbeats.store(false, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<PfcpMessage> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn received_of(&self, message_type: PfcpMessageType) -> Vec<PfcpMessage> {
        self.received()
            .into_iter()
            .filter(|m| m.message_type() == message_type)
            .collect()
    }

    pub fn count(&self, message_type: PfcpMessageType) -> usize {
        self.received_of(message_type).len()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// UP SEID the mock allocated for the session with CP SEID `cp_seid`
    pub fn up_seid_for(&self, cp_seid: u64) -> Option<u64> {
        let state = self.state.lock().unwrap();
        state
            .sessions
            .iter()
            .find(|(_, &cp)| cp == cp_seid)
            .map(|(&up, _)| up)
    }

    /// Poll until a message of `message_type` has arrived
    pub async fn wait_for(&self, message_type: PfcpMessageType, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.count(message_type) > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.count(message_type) > 0
    }

    /// Send a UPF-initiated Heartbeat Request to the last client seen
    pub async fn send_heartbeat_request(&self, sequence_number: u32) {
        let peer = self.state.lock().unwrap().peer.expect("no client seen yet");
        let req = PfcpMessage::heartbeat_request(sequence_number, RECOVERY_TIME_STAMP);
        self.socket.send_to(&req.marshal().unwrap(), peer).await.unwrap();
    }

    /// Send raw bytes to the last client seen
    pub async fn send_raw(&self, data: &[u8]) {
        let peer = self.state.lock().unwrap().peer.expect("no client seen yet");
        self.socket.send_to(data, peer).await.unwrap();
    }
}

impl Drop for MockUpf {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    answer_heartbeats: Arc<AtomicBool>,
) {
    let node_id = NodeId::from(addr.ip());
    let mut buf = vec![0u8; 65535];
    loop {
        let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
            continue;
        };
        let Ok(msg) = PfcpMessage::parse(&buf[..len]) else {
            continue;
        };

        let reply = {
            let mut state = state.lock().unwrap();
            state.peer = Some(peer);
            state.received.push(msg.clone());
            respond(&mut state, &msg, &node_id, addr, &answer_heartbeats)
        };
        if let Some(reply) = reply {
            let _ = socket.send_to(&reply.marshal().unwrap(), peer).await;
        }
    }
}

fn respond(
    state: &mut MockState,
    msg: &PfcpMessage,
    node_id: &NodeId,
    addr: SocketAddr,
    answer_heartbeats: &AtomicBool,
) -> Option<PfcpMessage> {
    let seq = msg.sequence_number();
    let cause = match state.behavior {
        UpfBehavior::Accept => PfcpCause::RequestAccepted,
        UpfBehavior::Reject => PfcpCause::RequestRejected,
        UpfBehavior::Silent => return None,
    };

    match msg.message_type() {
        PfcpMessageType::HeartbeatRequest => answer_heartbeats
            .load(Ordering::SeqCst)
            .then(|| PfcpMessage::heartbeat_response(seq, RECOVERY_TIME_STAMP)),
        PfcpMessageType::AssociationSetupRequest => Some(PfcpMessage::association_setup_response(
            seq,
            node_id,
            cause,
            RECOVERY_TIME_STAMP,
        )),
        PfcpMessageType::AssociationReleaseRequest => {
            Some(PfcpMessage::association_release_response(seq, node_id, cause))
        }
        PfcpMessageType::SessionEstablishmentRequest => {
            let cp_seid = msg.f_seid().map(|f| f.seid).unwrap_or(0);
            if cause != PfcpCause::RequestAccepted {
                return Some(PfcpMessage::session_establishment_response(
                    cp_seid, seq, node_id, cause, None,
                ));
            }
            state.next_up_seid += 1;
            let up_seid = state.next_up_seid;
            state.sessions.insert(up_seid, cp_seid);
            let up_f_seid = FSeid::new(up_seid, addr.ip());
            Some(PfcpMessage::session_establishment_response(
                cp_seid,
                seq,
                node_id,
                cause,
                Some(&up_f_seid),
            ))
        }
        PfcpMessageType::SessionModificationRequest => {
            let up_seid = msg.seid().unwrap_or(0);
            let cp_seid = state.sessions.get(&up_seid).copied().unwrap_or(0);
            Some(PfcpMessage::session_modification_response(cp_seid, seq, cause))
        }
        PfcpMessageType::SessionDeletionRequest => {
            let up_seid = msg.seid().unwrap_or(0);
            let cp_seid = if cause == PfcpCause::RequestAccepted {
                state.sessions.remove(&up_seid)
            } else {
                state.sessions.get(&up_seid).copied()
            };
            Some(PfcpMessage::session_deletion_response(
                cp_seid.unwrap_or(0),
                seq,
                cause,
            ))
        }
        _ => None,
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Client configuration pointing at `upf` with short timers
pub fn test_config(upf: &MockUpf, heartbeat_period_ms: u64) -> PfcpSimConfig {
    PfcpSimConfig {
        remote_peer: upf.addr().to_string(),
        local_address: Some("127.0.0.1".parse().unwrap()),
        response_timeout_ms: 200,
        heartbeat_period_ms,
        ..Default::default()
    }
}

/// One uplink and one downlink PDR with their FARs and a QER
pub fn simple_rules(ue_address: Ipv4Addr) -> SessionRules {
    let pdrs = vec![
        PdrBuilder::new()
            .with_id(1)
            .mark_as_uplink()
            .with_teid(0x100)
            .with_n3_address(Ipv4Addr::new(198, 18, 0, 1))
            .with_far_id(1)
            .add_qer_id(1)
            .build()
            .unwrap(),
        PdrBuilder::new()
            .with_id(2)
            .mark_as_downlink()
            .with_ue_address(ue_address)
            .with_far_id(2)
            .add_qer_id(1)
            .build()
            .unwrap(),
    ];
    let fars = vec![
        FarBuilder::new().with_id(1).mark_as_uplink().with_forward(true).build().unwrap(),
        FarBuilder::new().with_id(2).mark_as_downlink().with_drop(true).build().unwrap(),
    ];
    let qers = vec![QerBuilder::new().with_id(1).build().unwrap()];
    SessionRules::new(pdrs, fars, qers)
}
