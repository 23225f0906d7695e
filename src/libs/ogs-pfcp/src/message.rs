//! PFCP Messages
//!
//! A message is a header followed by a flat list of top-level IEs. Builders
//! for the node and session messages used on N4 live here too.

use bytes::{Buf, Bytes, BytesMut};
use crate::error::{PfcpError, PfcpResult};
use crate::header::{PfcpHeader, PfcpMessageType};
use crate::ie::{Ie, IeType};
use crate::types::{FSeid, NodeId, PfcpCause};

/// A complete PFCP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfcpMessage {
    pub header: PfcpHeader,
    pub ies: Vec<Ie>,
}

impl PfcpMessage {
    /// Node related message
    pub fn new(message_type: PfcpMessageType, sequence_number: u32) -> Self {
        Self {
            header: PfcpHeader::new(message_type, sequence_number),
            ies: Vec::new(),
        }
    }

    /// Session related message addressed to `seid`
    pub fn with_seid(message_type: PfcpMessageType, seid: u64, sequence_number: u32) -> Self {
        Self {
            header: PfcpHeader::with_seid(message_type, seid, sequence_number),
            ies: Vec::new(),
        }
    }

    pub fn message_type(&self) -> PfcpMessageType {
        self.header.message_type
    }

    pub fn sequence_number(&self) -> u32 {
        self.header.sequence_number
    }

    pub fn seid(&self) -> Option<u64> {
        self.header.seid
    }

    pub fn with_ie(mut self, ie: Ie) -> Self {
        self.ies.push(ie);
        self
    }

    pub fn with_ies(mut self, ies: impl IntoIterator<Item = Ie>) -> Self {
        self.ies.extend(ies);
        self
    }

    pub fn push(&mut self, ie: Ie) {
        self.ies.push(ie);
    }

    /// First top-level IE of the given type
    pub fn find(&self, ie_type: IeType) -> Option<&Ie> {
        self.ies.iter().find(|ie| ie.is(ie_type))
    }

    pub fn find_all(&self, ie_type: IeType) -> impl Iterator<Item = &Ie> {
        self.ies.iter().filter(move |ie| ie.is(ie_type))
    }

    fn mandatory(&self, ie_type: IeType) -> PfcpResult<&Ie> {
        self.find(ie_type)
            .ok_or(PfcpError::MissingMandatoryIe(ie_type.name()))
    }

    pub fn cause(&self) -> PfcpResult<PfcpCause> {
        self.mandatory(IeType::Cause)?.cause()
    }

    pub fn f_seid(&self) -> PfcpResult<FSeid> {
        self.mandatory(IeType::FSeid)?.f_seid()
    }

    pub fn node_id(&self) -> PfcpResult<NodeId> {
        self.mandatory(IeType::NodeId)?.node_id()
    }

    pub fn recovery_time_stamp(&self) -> PfcpResult<u32> {
        self.mandatory(IeType::RecoveryTimeStamp)?.as_u32()
    }

    /// Encoded size of the whole message
    pub fn encoded_len(&self) -> usize {
        self.header.header_len() + self.ies.iter().map(Ie::encoded_len).sum::<usize>()
    }

    /// Append the encoded message to `buf`, returning the number of octets
    /// written. Nothing is written if a length overflows its wire field.
    pub fn marshal_to(&self, buf: &mut BytesMut) -> PfcpResult<usize> {
        let body_len: usize = self.ies.iter().map(Ie::encoded_len).sum();
        let mut header = self.header.clone();
        let length = body_len + header.header_len() - 4;
        if length > u16::MAX as usize {
            return Err(PfcpError::overflow("message", length));
        }
        header.length = length as u16;

        let mut body = BytesMut::with_capacity(body_len);
        for ie in &self.ies {
            ie.encode(&mut body)?;
        }

        let start = buf.len();
        buf.reserve(header.header_len() + body_len);
        header.encode(buf);
        buf.extend_from_slice(&body);
        Ok(buf.len() - start)
    }

    pub fn marshal(&self) -> PfcpResult<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.marshal_to(&mut buf)?;
        Ok(buf)
    }

    /// Parse one datagram. Octets past the announced length are ignored.
    pub fn parse(data: &[u8]) -> PfcpResult<Self> {
        let mut buf = Bytes::copy_from_slice(data);
        let header = PfcpHeader::decode(&mut buf)?;
        let body_len = header.body_len()?;
        if buf.remaining() < body_len {
            return Err(PfcpError::short(body_len, buf.remaining()));
        }
        let mut body = buf.copy_to_bytes(body_len);
        let ies = Ie::decode_all(&mut body)?;
        Ok(Self { header, ies })
    }
}

// ============================================================================
// Node related messages
// ============================================================================

impl PfcpMessage {
    pub fn heartbeat_request(sequence_number: u32, recovery_time_stamp: u32) -> Self {
        Self::new(PfcpMessageType::HeartbeatRequest, sequence_number)
            .with_ie(Ie::recovery_time_stamp(recovery_time_stamp))
    }

    pub fn heartbeat_response(sequence_number: u32, recovery_time_stamp: u32) -> Self {
        Self::new(PfcpMessageType::HeartbeatResponse, sequence_number)
            .with_ie(Ie::recovery_time_stamp(recovery_time_stamp))
    }

    pub fn association_setup_request(
        sequence_number: u32,
        node_id: &NodeId,
        recovery_time_stamp: u32,
    ) -> Self {
        Self::new(PfcpMessageType::AssociationSetupRequest, sequence_number)
            .with_ie(node_id.to_ie())
            .with_ie(Ie::recovery_time_stamp(recovery_time_stamp))
    }

    pub fn association_setup_response(
        sequence_number: u32,
        node_id: &NodeId,
        cause: PfcpCause,
        recovery_time_stamp: u32,
    ) -> Self {
        Self::new(PfcpMessageType::AssociationSetupResponse, sequence_number)
            .with_ie(node_id.to_ie())
            .with_ie(cause.to_ie())
            .with_ie(Ie::recovery_time_stamp(recovery_time_stamp))
    }

    pub fn association_release_request(sequence_number: u32, node_id: &NodeId) -> Self {
        Self::new(PfcpMessageType::AssociationReleaseRequest, sequence_number)
            .with_ie(node_id.to_ie())
    }

    pub fn association_release_response(
        sequence_number: u32,
        node_id: &NodeId,
        cause: PfcpCause,
    ) -> Self {
        Self::new(PfcpMessageType::AssociationReleaseResponse, sequence_number)
            .with_ie(node_id.to_ie())
            .with_ie(cause.to_ie())
    }
}

// ============================================================================
// Session related messages
// ============================================================================

impl PfcpMessage {
    /// The peer SEID is not yet known, so the header SEID is zero
    pub fn session_establishment_request(
        sequence_number: u32,
        node_id: &NodeId,
        cp_f_seid: &FSeid,
        rules: impl IntoIterator<Item = Ie>,
    ) -> Self {
        Self::with_seid(PfcpMessageType::SessionEstablishmentRequest, 0, sequence_number)
            .with_ie(node_id.to_ie())
            .with_ie(cp_f_seid.to_ie())
            .with_ies(rules)
    }

    pub fn session_establishment_response(
        cp_seid: u64,
        sequence_number: u32,
        node_id: &NodeId,
        cause: PfcpCause,
        up_f_seid: Option<&FSeid>,
    ) -> Self {
        let mut msg =
            Self::with_seid(PfcpMessageType::SessionEstablishmentResponse, cp_seid, sequence_number)
                .with_ie(node_id.to_ie())
                .with_ie(cause.to_ie());
        if let Some(f_seid) = up_f_seid {
            msg.push(f_seid.to_ie());
        }
        msg
    }

    pub fn session_modification_request(
        up_seid: u64,
        sequence_number: u32,
        rules: impl IntoIterator<Item = Ie>,
    ) -> Self {
        Self::with_seid(PfcpMessageType::SessionModificationRequest, up_seid, sequence_number)
            .with_ies(rules)
    }

    pub fn session_modification_response(cp_seid: u64, sequence_number: u32, cause: PfcpCause) -> Self {
        Self::with_seid(PfcpMessageType::SessionModificationResponse, cp_seid, sequence_number)
            .with_ie(cause.to_ie())
    }

    /// Addressed to the UP SEID and carrying the CP F-SEID
    pub fn session_deletion_request(up_seid: u64, sequence_number: u32, cp_f_seid: &FSeid) -> Self {
        Self::with_seid(PfcpMessageType::SessionDeletionRequest, up_seid, sequence_number)
            .with_ie(cp_f_seid.to_ie())
    }

    pub fn session_deletion_response(cp_seid: u64, sequence_number: u32, cause: PfcpCause) -> Self {
        Self::with_seid(PfcpMessageType::SessionDeletionResponse, cp_seid, sequence_number)
            .with_ie(cause.to_ie())
    }
}
