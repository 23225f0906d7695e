//! PFCP Session Lifecycle
//!
//! Session establishment, modification and deletion over an established
//! association.

use ogs_pfcp::header::PfcpMessageType;
use ogs_pfcp::ie::Ie;
use ogs_pfcp::PfcpMessage;

use crate::context::{PfcpClient, Session};
use crate::error::{PfcpSimError, SimResult};
use crate::pfcp_sm::check_response;

/// Rule IEs carried by one establishment or modification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRules {
    pub pdrs: Vec<Ie>,
    pub fars: Vec<Ie>,
    pub qers: Vec<Ie>,
    pub urrs: Vec<Ie>,
}

impl SessionRules {
    pub fn new(pdrs: Vec<Ie>, fars: Vec<Ie>, qers: Vec<Ie>) -> Self {
        Self {
            pdrs,
            fars,
            qers,
            urrs: Vec::new(),
        }
    }

    pub fn with_urrs(mut self, urrs: Vec<Ie>) -> Self {
        self.urrs = urrs;
        self
    }

    fn all(&self) -> impl Iterator<Item = Ie> + '_ {
        self.pdrs
            .iter()
            .chain(&self.fars)
            .chain(&self.qers)
            .chain(&self.urrs)
            .cloned()
    }
}

impl PfcpClient {
    fn ensure_associated(&self) -> SimResult<()> {
        if self.is_association_alive() {
            Ok(())
        } else {
            Err(PfcpSimError::AssociationInactive)
        }
    }

    /// Establish a session carrying `rules`. The returned session has both
    /// SEIDs set; registering it is up to the caller.
    pub async fn establish_session(&self, rules: SessionRules) -> SimResult<Session> {
        self.ensure_associated()?;
        let path = self.path()?;
        let node_id = self.local_node_id()?;

        let local_seid = self.ids.next_local_seid()?;
        let seq = self.ids.next_sequence_number()?;
        let cp_f_seid = self.local_f_seid(&path, local_seid);
        let req = PfcpMessage::session_establishment_request(seq, &node_id, &cp_f_seid, rules.all());

        let resp = path.request(&req, self.config.response_timeout()).await?;
        check_response(&resp, PfcpMessageType::SessionEstablishmentResponse)?;
        let up_f_seid = resp.f_seid()?;
        log::debug!(
            "PFCP session established: local SEID {:#x}, peer SEID {:#x}",
            local_seid,
            up_f_seid.seid
        );

        Ok(Session::new(local_seid, up_f_seid.seid).with_rules(
            rules.pdrs,
            rules.fars,
            rules.qers,
            rules.urrs,
        ))
    }

    /// Send a Session Modification Request to the peer SEID of `session`.
    /// The session object itself is left unchanged.
    pub async fn modify_session(&self, session: &Session, rules: SessionRules) -> SimResult<()> {
        self.ensure_associated()?;
        if !session.is_active() {
            return Err(PfcpSimError::SessionNotActive { local_seid: session.local_seid() });
        }
        let path = self.path()?;

        let seq = self.ids.next_sequence_number()?;
        let req = PfcpMessage::session_modification_request(session.peer_seid(), seq, rules.all());
        let resp = path.request(&req, self.config.response_timeout()).await?;
        check_response(&resp, PfcpMessageType::SessionModificationResponse)?;
        log::debug!("PFCP session {:#x} modified", session.local_seid());
        Ok(())
    }

    /// Delete `session` on the UPF; removing it from the registry is up to
    /// the caller.
    pub async fn delete_session(&self, session: &Session) -> SimResult<()> {
        self.ensure_associated()?;
        if !session.is_active() {
            return Err(PfcpSimError::SessionNotActive { local_seid: session.local_seid() });
        }
        let path = self.path()?;

        let seq = self.ids.next_sequence_number()?;
        let cp_f_seid = self.local_f_seid(&path, session.local_seid());
        let req = PfcpMessage::session_deletion_request(session.peer_seid(), seq, &cp_f_seid);
        let resp = path.request(&req, self.config.response_timeout()).await?;
        check_response(&resp, PfcpMessageType::SessionDeletionResponse)?;
        log::debug!("PFCP session {:#x} deleted", session.local_seid());
        Ok(())
    }

    /// Delete every registered session in index order, stopping at the
    /// first failure. Returns the number deleted.
    pub async fn delete_all_sessions(&self) -> SimResult<usize> {
        let mut deleted = 0;
        for index in self.sessions().indices() {
            let Some(session) = self.sessions().get(index) else {
                continue;
            };
            self.delete_session(&session).await?;
            self.sessions().remove(index);
            deleted += 1;
        }
        Ok(deleted)
    }
}
