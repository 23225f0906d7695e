//! Session establishment, modification and deletion against a mock UPF

mod common;

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use common::{init_logging, simple_rules, test_config, MockUpf, UpfBehavior};
use nextgcore_pfcpsimd::rules::{FarBuilder, IeMethod};
use nextgcore_pfcpsimd::{PfcpClient, PfcpSimError, Session, SessionRules};
use ogs_pfcp::types::PfcpCause;
use ogs_pfcp::{IeType, PfcpMessageType};

async fn associated_client(upf: &MockUpf) -> PfcpClient {
    let client = PfcpClient::new(test_config(upf, 60_000));
    client.connect().await.unwrap();
    client.setup_association().await.unwrap();
    client
}

fn ue(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(17, 0, 0, n)
}

#[tokio::test]
async fn test_establish_requires_association() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = PfcpClient::new(test_config(&upf, 60_000));
    client.connect().await.unwrap();

    assert!(matches!(
        client.establish_session(simple_rules(ue(1))).await,
        Err(PfcpSimError::AssociationInactive)
    ));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(upf.received().is_empty());
}

#[tokio::test]
async fn test_establish_carries_rules_and_f_seid() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    let session = client.establish_session(simple_rules(ue(1))).await.unwrap();
    assert!(session.is_active());
    assert_eq!(session.pdrs().len(), 2);
    assert_eq!(session.fars().len(), 2);
    assert_eq!(session.qers().len(), 1);

    let req = &upf.received_of(PfcpMessageType::SessionEstablishmentRequest)[0];
    assert_eq!(req.seid(), Some(0));
    assert!(req.node_id().is_ok());
    let f_seid = req.f_seid().unwrap();
    assert_eq!(f_seid.seid, session.local_seid());
    assert_eq!(f_seid.ipv4, Some(Ipv4Addr::LOCALHOST));
    assert_eq!(req.find_all(IeType::CreatePdr).count(), 2);
    assert_eq!(req.find_all(IeType::CreateFar).count(), 2);
    assert_eq!(req.find_all(IeType::CreateQer).count(), 1);
}

#[tokio::test]
async fn test_f_seids_strictly_increase() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    let mut seids = Vec::new();
    for n in 1..=4 {
        let session = client.establish_session(simple_rules(ue(n))).await.unwrap();
        seids.push(session.local_seid());
    }
    assert!(seids.windows(2).all(|w| w[0] < w[1]));

    let sent: Vec<u64> = upf
        .received_of(PfcpMessageType::SessionEstablishmentRequest)
        .iter()
        .map(|m| m.f_seid().unwrap().seid)
        .collect();
    assert_eq!(sent, seids);
}

#[tokio::test]
async fn test_rejected_establishment() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    upf.set_behavior(UpfBehavior::Reject);
    assert!(matches!(
        client.establish_session(simple_rules(ue(1))).await,
        Err(PfcpSimError::InvalidCause {
            message: PfcpMessageType::SessionEstablishmentResponse,
            cause: PfcpCause::RequestRejected,
        })
    ));
    assert_eq!(upf.session_count(), 0);
}

#[tokio::test]
async fn test_modify_and_delete_address_peer_seid() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    let session = client.establish_session(simple_rules(ue(1))).await.unwrap();
    assert_eq!(upf.session_count(), 1);

    let update = FarBuilder::new()
        .with_method(IeMethod::Update)
        .with_id(2)
        .mark_as_downlink()
        .with_forward(true)
        .with_downlink_teid(0x200)
        .with_downlink_ip(Ipv4Addr::new(10, 0, 0, 1))
        .build()
        .unwrap();
    client
        .modify_session(&session, SessionRules::new(Vec::new(), vec![update], Vec::new()))
        .await
        .unwrap();

    let modify = &upf.received_of(PfcpMessageType::SessionModificationRequest)[0];
    assert_eq!(modify.seid(), Some(session.peer_seid()));
    assert_eq!(modify.find_all(IeType::UpdateFar).count(), 1);

    client.delete_session(&session).await.unwrap();
    let delete = &upf.received_of(PfcpMessageType::SessionDeletionRequest)[0];
    assert_eq!(delete.seid(), Some(session.peer_seid()));
    assert_eq!(delete.f_seid().unwrap().seid, session.local_seid());
    assert_eq!(upf.session_count(), 0);
}

#[tokio::test]
async fn test_inactive_session_rejected_before_send() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    let pending = Session::new(42, 0);
    assert!(matches!(
        client.delete_session(&pending).await,
        Err(PfcpSimError::SessionNotActive { local_seid: 42 })
    ));
    assert!(matches!(
        client.modify_session(&pending, SessionRules::default()).await,
        Err(PfcpSimError::SessionNotActive { local_seid: 42 })
    ));
    assert_eq!(upf.count(PfcpMessageType::SessionDeletionRequest), 0);
    assert_eq!(upf.count(PfcpMessageType::SessionModificationRequest), 0);
}

#[tokio::test]
async fn test_delete_all_sessions() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    for n in 1..=3u8 {
        let session = client.establish_session(simple_rules(ue(n))).await.unwrap();
        client.sessions().insert(n as u32, session);
    }
    assert_eq!(upf.session_count(), 3);

    assert_eq!(client.delete_all_sessions().await.unwrap(), 3);
    assert!(client.sessions().is_empty());
    assert_eq!(upf.session_count(), 0);
}

#[tokio::test]
async fn test_timeout_on_silent_session_peer() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = associated_client(&upf).await;

    upf.set_behavior(UpfBehavior::Silent);
    assert!(matches!(
        client.establish_session(simple_rules(ue(1))).await,
        Err(PfcpSimError::TimeoutExpired(PfcpMessageType::SessionEstablishmentRequest))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_establishments_get_their_own_peer_seid() {
    init_logging();
    let upf = MockUpf::start(UpfBehavior::Accept).await;
    let client = Arc::new(associated_client(&upf).await);

    let tasks: Vec<_> = (1..=16u8)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move { client.establish_session(simple_rules(ue(n))).await })
        })
        .collect();
    let mut sessions = Vec::new();
    for task in tasks {
        sessions.push(task.await.unwrap().unwrap());
    }

    let peers: HashSet<u64> = sessions.iter().map(Session::peer_seid).collect();
    assert_eq!(peers.len(), 16);
    for session in &sessions {
        assert_eq!(upf.up_seid_for(session.local_seid()), Some(session.peer_seid()));
    }

    let requests = upf.received_of(PfcpMessageType::SessionEstablishmentRequest);
    assert_eq!(requests.len(), 16);
    let seqs: HashSet<u32> = requests.iter().map(|m| m.sequence_number()).collect();
    assert_eq!(seqs.len(), 16);
}
