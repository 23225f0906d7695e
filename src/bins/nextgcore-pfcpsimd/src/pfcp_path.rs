//! PFCP Path Management
//!
//! Owns the N4 UDP socket. A background receive loop parses every datagram
//! from the peer and hands responses to the request waiting on the same
//! sequence number. Peer-initiated Heartbeat Requests are answered in the
//! loop; Session Report Requests are dropped.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use ogs_pfcp::header::PfcpMessageType;
use ogs_pfcp::PfcpMessage;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{PfcpSimError, SimResult};
use crate::lock;

/// Largest datagram the receive loop accepts
const MAX_DATAGRAM_LEN: usize = 65536;

/// A request waiting for its response
#[derive(Debug)]
struct PendingRequest {
    message_type: PfcpMessageType,
    sent_at: Instant,
    response_tx: oneshot::Sender<PfcpMessage>,
}

type PendingMap = Arc<Mutex<HashMap<u32, PendingRequest>>>;

/// UDP path to one PFCP peer
#[derive(Debug)]
pub struct PfcpPath {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    pending: PendingMap,
    recv_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl PfcpPath {
    /// Resolve `remote`, bind a local socket and start the receive loop.
    ///
    /// `recovery_time_stamp` is echoed in answers to peer Heartbeat Requests.
    pub async fn open(
        remote: &str,
        local_ip: Option<IpAddr>,
        recovery_time_stamp: u32,
    ) -> SimResult<Self> {
        let remote_addr = resolve(remote, local_ip).await?;
        let bind_ip = local_ip.unwrap_or(match remote_addr {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        });

        let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0))
            .await
            .map_err(|e| PfcpSimError::Connection(format!("bind {bind_ip}: {e}")))?;
        socket
            .connect(remote_addr)
            .await
            .map_err(|e| PfcpSimError::Connection(format!("connect {remote_addr}: {e}")))?;
        let local_addr = socket.local_addr()?;
        log::info!("PFCP path {local_addr} -> {remote_addr} opened");

        let socket = Arc::new(socket);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let recv_task = tokio::spawn(receive_loop(
            socket.clone(),
            pending.clone(),
            recovery_time_stamp,
        ));

        Ok(Self {
            socket,
            local_addr,
            remote_addr,
            pending,
            recv_task: Mutex::new(Some(recv_task)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Encode and send one message
    pub async fn send(&self, msg: &PfcpMessage) -> SimResult<()> {
        if self.is_closed() {
            return Err(PfcpSimError::NotConnected);
        }
        let mut buf = BytesMut::with_capacity(msg.encoded_len());
        msg.marshal_to(&mut buf)?;
        self.socket
            .send(&buf)
            .await
            .map_err(|e| PfcpSimError::Connection(format!("send to {}: {e}", self.remote_addr)))?;
        log::trace!(
            "PFCP TX {} seq={} ({} bytes)",
            msg.message_type(),
            msg.sequence_number(),
            buf.len()
        );
        Ok(())
    }

    /// Send a request and wait for the response carrying the same sequence
    /// number. The response type is checked by the caller.
    pub async fn request(&self, msg: &PfcpMessage, timeout: Duration) -> SimResult<PfcpMessage> {
        let seq = msg.sequence_number();
        let (response_tx, response_rx) = oneshot::channel();
        let replaced = lock(&self.pending).insert(
            seq,
            PendingRequest {
                message_type: msg.message_type(),
                sent_at: Instant::now(),
                response_tx,
            },
        );
        if let Some(old) = replaced {
            log::warn!(
                "PFCP seq={seq} reused by {} while {} sent {:?} ago is pending, replacing it",
                msg.message_type(),
                old.message_type,
                old.sent_at.elapsed()
            );
        }

        if let Err(e) = self.send(msg).await {
            lock(&self.pending).remove(&seq);
            return Err(e);
        }

        match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(response)) => Ok(response),
            // Sender dropped: the path was closed or the sequence number reused
            Ok(Err(_)) => Err(PfcpSimError::NotConnected),
            Err(_) => {
                lock(&self.pending).remove(&seq);
                log::warn!(
                    "PFCP {} seq={} timed out after {:?}",
                    msg.message_type(),
                    seq,
                    timeout
                );
                Err(PfcpSimError::TimeoutExpired(msg.message_type()))
            }
        }
    }

    /// Stop the receive loop and fail outstanding requests. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = lock(&self.recv_task).take() {
            task.abort();
        }
        let dropped = {
            let mut pending = lock(&self.pending);
            let n = pending.len();
            pending.clear();
            n
        };
        log::info!(
            "PFCP path {} -> {} closed ({} pending dropped)",
            self.local_addr,
            self.remote_addr,
            dropped
        );
    }
}

impl Drop for PfcpPath {
    fn drop(&mut self) {
        self.close();
    }
}

async fn resolve(remote: &str, local_ip: Option<IpAddr>) -> SimResult<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(remote)
        .await
        .map_err(|e| PfcpSimError::Connection(format!("resolve {remote}: {e}")))?
        .collect();
    // Prefer an address of the same family as the configured source IP
    let preferred = local_ip.and_then(|ip| addrs.iter().find(|a| a.is_ipv4() == ip.is_ipv4()));
    preferred
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| PfcpSimError::Connection(format!("no address for {remote}")))
}

async fn receive_loop(socket: Arc<UdpSocket>, pending: PendingMap, recovery_time_stamp: u32) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    loop {
        let len = match socket.recv(&mut buf).await {
            Ok(len) => len,
            Err(e) => {
                // ICMP port unreachable shows up here on a connected socket
                log::debug!("PFCP socket error: {e}");
                continue;
            }
        };

        let msg = match PfcpMessage::parse(&buf[..len]) {
            Ok(msg) => msg,
            Err(e) => {
                log::debug!("PFCP dropping malformed datagram ({len} bytes): {e}");
                continue;
            }
        };
        log::trace!("PFCP RX {} seq={}", msg.message_type(), msg.sequence_number());

        match msg.message_type() {
            PfcpMessageType::HeartbeatRequest => {
                let reply =
                    PfcpMessage::heartbeat_response(msg.sequence_number(), recovery_time_stamp);
                match reply.marshal() {
                    Ok(buf) => {
                        if let Err(e) = socket.send(&buf).await {
                            log::warn!("PFCP failed to answer Heartbeat Request: {e}");
                        }
                    }
                    Err(e) => log::warn!("PFCP failed to encode Heartbeat Response: {e}"),
                }
            }
            PfcpMessageType::SessionReportRequest => {
                log::debug!("PFCP ignoring Session Report Request seq={}", msg.sequence_number());
            }
            t if t.is_response() => dispatch_response(&pending, msg),
            t => log::warn!("PFCP unexpected {t} from peer, dropped"),
        }
    }
}

fn dispatch_response(pending: &PendingMap, msg: PfcpMessage) {
    let seq = msg.sequence_number();
    let Some(request) = lock(pending).remove(&seq) else {
        log::warn!("PFCP unmatched {} seq={seq}, dropped", msg.message_type());
        return;
    };
    log::debug!(
        "PFCP {} seq={seq} answered by {} in {:?}",
        request.message_type,
        msg.message_type(),
        request.sent_at.elapsed()
    );
    // The waiter may have given up already
    let _ = request.response_tx.send(msg);
}
