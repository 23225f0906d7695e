//! Association lifecycle and heartbeat supervision against a mock UPF

mod common;

use std::time::Duration;

use common::{init_logging, test_config, MockUpf, UpfBehavior};
use nextgcore_pfcpsimd::{AssociationState, PfcpClient, PfcpSimError};
use ogs_pfcp::types::PfcpCause;
use ogs_pfcp::PfcpMessageType;

/// Poll `cond` every 10 ms until it holds or `timeout` passes
async fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn test_setup_starts_heartbeats() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 100));

    client.connect().await.unwrap();
    assert_eq!(client.state(), AssociationState::Connected);

    client.setup_association().await.unwrap();
    assert!(client.is_association_alive());
    assert_eq!(client.state(), AssociationState::Associated);

    let setup = upf.received_of(PfcpMessageType::AssociationSetupRequest);
    assert_eq!(setup.len(), 1);
    assert_eq!(setup[0].sequence_number(), 1);
    assert!(setup[0].node_id().is_ok());
    assert_eq!(
        setup[0].recovery_time_stamp().unwrap(),
        client.recovery_time_stamp()
    );

    assert!(upf.wait_for(PfcpMessageType::HeartbeatRequest, Duration::from_secs(1)).await);
    assert!(client.is_association_alive());

    client.teardown_association().await.unwrap();
    assert!(!client.is_association_alive());
    assert_eq!(client.state(), AssociationState::Connected);
    assert_eq!(upf.count(PfcpMessageType::AssociationReleaseRequest), 1);

    // No heartbeats after the release
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = upf.count(PfcpMessageType::HeartbeatRequest);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(upf.count(PfcpMessageType::HeartbeatRequest), before);

    client.disconnect();
    assert_eq!(client.state(), AssociationState::Disconnected);
}

#[tokio::test]
async fn test_rejected_setup() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Reject).await;
    let client = PfcpClient::new(test_config(&upf, 100));
    client.connect().await.unwrap();

    let err = client.setup_association().await.unwrap_err();
    assert!(matches!(
        err,
        PfcpSimError::InvalidCause {
            message: PfcpMessageType::AssociationSetupResponse,
            cause: PfcpCause::RequestRejected,
        }
    ));
    assert!(!client.is_association_alive());
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Silent).await;
    let client = PfcpClient::new(test_config(&upf, 100));
    client.connect().await.unwrap();

    let err = client.setup_association().await.unwrap_err();
    assert!(matches!(
        err,
        PfcpSimError::TimeoutExpired(PfcpMessageType::AssociationSetupRequest)
    ));
    assert!(!client.is_association_alive());
    assert_eq!(upf.count(PfcpMessageType::AssociationSetupRequest), 1);
}

#[tokio::test]
async fn test_heartbeat_loss_marks_association_down() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 100));
    client.connect().await.unwrap();
    client.setup_association().await.unwrap();

    upf.stop_heartbeats();
    assert!(eventually(Duration::from_secs(2), || !client.is_association_alive()).await);
    assert_eq!(client.state(), AssociationState::Connected);

    // The supervisor gave up; a fresh setup restores the association
    client.setup_association().await.unwrap();
    assert!(client.is_association_alive());
}

#[tokio::test]
async fn test_sequence_number_resets_on_setup() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 60_000));
    client.connect().await.unwrap();

    client.setup_association().await.unwrap();
    client.teardown_association().await.unwrap();
    client.setup_association().await.unwrap();

    let release = upf.received_of(PfcpMessageType::AssociationReleaseRequest);
    assert_eq!(release[0].sequence_number(), 2);

    let seqs: Vec<u32> = upf
        .received_of(PfcpMessageType::AssociationSetupRequest)
        .iter()
        .map(|m| m.sequence_number())
        .collect();
    assert_eq!(seqs, vec![1, 1]);
}

#[tokio::test]
async fn test_teardown_without_answer_still_marks_down() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 60_000));
    client.connect().await.unwrap();
    client.setup_association().await.unwrap();

    upf.set_behavior(UpfBehavior::Silent);
    assert!(matches!(
        client.teardown_association().await,
        Err(PfcpSimError::TimeoutExpired(PfcpMessageType::AssociationReleaseRequest))
    ));
    assert!(!client.is_association_alive());
    assert!(matches!(
        client.teardown_association().await,
        Err(PfcpSimError::AssociationInactive)
    ));
}

#[tokio::test]
async fn test_peer_heartbeat_is_answered() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 60_000));
    client.connect().await.unwrap();
    client.setup_association().await.unwrap();

    upf.send_heartbeat_request(0x77).await;
    assert!(upf.wait_for(PfcpMessageType::HeartbeatResponse, Duration::from_secs(1)).await);

    let resp = &upf.received_of(PfcpMessageType::HeartbeatResponse)[0];
    assert_eq!(resp.sequence_number(), 0x77);
    assert_eq!(resp.recovery_time_stamp().unwrap(), client.recovery_time_stamp());
}

#[tokio::test]
async fn test_garbage_from_peer_is_ignored() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 60_000));
    client.connect().await.unwrap();
    client.setup_association().await.unwrap();

    upf.send_raw(&[0xde, 0xad, 0xbe, 0xef]).await;
    client.teardown_association().await.unwrap();
}

/// Heartbeat Response whose body is `levels` Create PDR IEs, each wrapping the next
fn deeply_nested_datagram(levels: usize) -> Vec<u8> {
    let body_len = levels * 4;
    let mut data = vec![0x20, 2];
    data.extend_from_slice(&((body_len + 4) as u16).to_be_bytes());
    data.extend_from_slice(&[0, 0, 9, 0]);
    for level in 0..levels {
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&(((levels - level - 1) * 4) as u16).to_be_bytes());
    }
    data
}

#[tokio::test]
async fn test_deeply_nested_datagram_is_dropped() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 60_000));
    client.connect().await.unwrap();
    client.setup_association().await.unwrap();

    let datagram = deeply_nested_datagram(16_000);
    assert_eq!(datagram.len(), 64_008);
    upf.send_raw(&datagram).await;

    // The receive loop survives and still matches responses
    client.teardown_association().await.unwrap();
}

#[tokio::test]
async fn test_zero_heartbeat_period_rejected_before_setup() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 0));
    client.connect().await.unwrap();

    let err = client.setup_association().await.unwrap_err();
    assert!(matches!(err, PfcpSimError::Config(_)));
    assert!(!client.is_association_alive());
    assert_eq!(client.state(), AssociationState::Connected);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(upf.count(PfcpMessageType::AssociationSetupRequest), 0);
    assert_eq!(upf.count(PfcpMessageType::HeartbeatRequest), 0);
}
