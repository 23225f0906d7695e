//! PFCP Header
//!
//! PFCP message header as specified in 3GPP TS 29.244 Section 7.2.2.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::error::{PfcpError, PfcpResult};
use crate::types::PFCP_VERSION;

/// PFCP Header length without SEID (8 bytes)
pub const PFCP_HEADER_LEN: usize = 8;

/// PFCP Header length with SEID (16 bytes)
pub const PFCP_HEADER_LEN_WITH_SEID: usize = 16;

/// Largest value the 24-bit sequence number field can carry
pub const PFCP_MAX_SEQUENCE_NUMBER: u32 = 0x00FF_FFFF;

/// PFCP Message Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PfcpMessageType {
    // Node related messages (no SEID)
    HeartbeatRequest = 1,
    HeartbeatResponse = 2,
    PfdManagementRequest = 3,
    PfdManagementResponse = 4,
    AssociationSetupRequest = 5,
    AssociationSetupResponse = 6,
    AssociationUpdateRequest = 7,
    AssociationUpdateResponse = 8,
    AssociationReleaseRequest = 9,
    AssociationReleaseResponse = 10,
    VersionNotSupportedResponse = 11,
    NodeReportRequest = 12,
    NodeReportResponse = 13,

    // Session related messages (with SEID)
    SessionEstablishmentRequest = 50,
    SessionEstablishmentResponse = 51,
    SessionModificationRequest = 52,
    SessionModificationResponse = 53,
    SessionDeletionRequest = 54,
    SessionDeletionResponse = 55,
    SessionReportRequest = 56,
    SessionReportResponse = 57,
}

impl TryFrom<u8> for PfcpMessageType {
    type Error = PfcpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let message_type = match value {
            1 => Self::HeartbeatRequest,
            2 => Self::HeartbeatResponse,
            3 => Self::PfdManagementRequest,
            4 => Self::PfdManagementResponse,
            5 => Self::AssociationSetupRequest,
            6 => Self::AssociationSetupResponse,
            7 => Self::AssociationUpdateRequest,
            8 => Self::AssociationUpdateResponse,
            9 => Self::AssociationReleaseRequest,
            10 => Self::AssociationReleaseResponse,
            11 => Self::VersionNotSupportedResponse,
            12 => Self::NodeReportRequest,
            13 => Self::NodeReportResponse,
            50 => Self::SessionEstablishmentRequest,
            51 => Self::SessionEstablishmentResponse,
            52 => Self::SessionModificationRequest,
            53 => Self::SessionModificationResponse,
            54 => Self::SessionDeletionRequest,
            55 => Self::SessionDeletionResponse,
            56 => Self::SessionReportRequest,
            57 => Self::SessionReportResponse,
            _ => return Err(PfcpError::InvalidMessageType(value)),
        };
        Ok(message_type)
    }
}

impl PfcpMessageType {
    /// Session related messages carry a SEID in the header
    pub fn has_seid(&self) -> bool {
        (*self as u8) >= 50
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self,
            Self::HeartbeatResponse
                | Self::PfdManagementResponse
                | Self::AssociationSetupResponse
                | Self::AssociationUpdateResponse
                | Self::AssociationReleaseResponse
                | Self::VersionNotSupportedResponse
                | Self::NodeReportResponse
                | Self::SessionEstablishmentResponse
                | Self::SessionModificationResponse
                | Self::SessionDeletionResponse
                | Self::SessionReportResponse
        )
    }

    /// Message type name as written in TS 29.244
    pub fn name(&self) -> &'static str {
        match self {
            Self::HeartbeatRequest => "Heartbeat Request",
            Self::HeartbeatResponse => "Heartbeat Response",
            Self::PfdManagementRequest => "PFD Management Request",
            Self::PfdManagementResponse => "PFD Management Response",
            Self::AssociationSetupRequest => "Association Setup Request",
            Self::AssociationSetupResponse => "Association Setup Response",
            Self::AssociationUpdateRequest => "Association Update Request",
            Self::AssociationUpdateResponse => "Association Update Response",
            Self::AssociationReleaseRequest => "Association Release Request",
            Self::AssociationReleaseResponse => "Association Release Response",
            Self::VersionNotSupportedResponse => "Version Not Supported Response",
            Self::NodeReportRequest => "Node Report Request",
            Self::NodeReportResponse => "Node Report Response",
            Self::SessionEstablishmentRequest => "Session Establishment Request",
            Self::SessionEstablishmentResponse => "Session Establishment Response",
            Self::SessionModificationRequest => "Session Modification Request",
            Self::SessionModificationResponse => "Session Modification Response",
            Self::SessionDeletionRequest => "Session Deletion Request",
            Self::SessionDeletionResponse => "Session Deletion Response",
            Self::SessionReportRequest => "Session Report Request",
            Self::SessionReportResponse => "Session Report Response",
        }
    }
}

impl std::fmt::Display for PfcpMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// PFCP Header
///
/// ```text
///  octet 1     | Ver(3) | Spare(2) | FO | MP | S |
///  octet 2     | Message Type                     |
///  octet 3-4   | Message Length                   |
///  octet 5-12  | SEID (only when S = 1)           |
///  next 3      | Sequence Number                  |
///  last        | Message Priority(4) | Spare(4)   |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfcpHeader {
    pub message_type: PfcpMessageType,
    /// Length of everything after the first 4 octets
    pub length: u16,
    pub seid: Option<u64>,
    pub sequence_number: u32,
    pub message_priority: Option<u8>,
}

impl PfcpHeader {
    /// Header for a node related message
    pub fn new(message_type: PfcpMessageType, sequence_number: u32) -> Self {
        Self {
            message_type,
            length: 0,
            seid: None,
            sequence_number,
            message_priority: None,
        }
    }

    /// Header for a session related message
    pub fn with_seid(message_type: PfcpMessageType, seid: u64, sequence_number: u32) -> Self {
        Self {
            seid: Some(seid),
            ..Self::new(message_type, sequence_number)
        }
    }

    pub fn header_len(&self) -> usize {
        if self.seid.is_some() {
            PFCP_HEADER_LEN_WITH_SEID
        } else {
            PFCP_HEADER_LEN
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = PFCP_VERSION << 5;
        if self.message_priority.is_some() {
            flags |= 0x02;
        }
        if self.seid.is_some() {
            flags |= 0x01;
        }
        buf.put_u8(flags);
        buf.put_u8(self.message_type as u8);
        buf.put_u16(self.length);
        if let Some(seid) = self.seid {
            buf.put_u64(seid);
        }
        let seq = self.sequence_number & PFCP_MAX_SEQUENCE_NUMBER;
        buf.put_slice(&seq.to_be_bytes()[1..]);
        buf.put_u8(self.message_priority.unwrap_or(0) << 4);
    }

    pub fn decode(buf: &mut Bytes) -> PfcpResult<Self> {
        if buf.remaining() < PFCP_HEADER_LEN {
            return Err(PfcpError::short(PFCP_HEADER_LEN, buf.remaining()));
        }

        let flags = buf.get_u8();
        let version = flags >> 5;
        if version != PFCP_VERSION {
            return Err(PfcpError::VersionNotSupported(version));
        }
        let has_seid = flags & 0x01 != 0;
        let has_priority = flags & 0x02 != 0;

        let message_type = PfcpMessageType::try_from(buf.get_u8())?;
        let length = buf.get_u16();

        let seid = if has_seid {
            if buf.remaining() < 12 {
                return Err(PfcpError::short(12, buf.remaining()));
            }
            Some(buf.get_u64())
        } else {
            None
        };

        let mut seq = [0u8; 4];
        buf.copy_to_slice(&mut seq[1..]);
        let last = buf.get_u8();

        Ok(Self {
            message_type,
            length,
            seid,
            sequence_number: u32::from_be_bytes(seq),
            message_priority: has_priority.then_some(last >> 4),
        })
    }

    /// Number of body octets announced by the length field
    pub fn body_len(&self) -> PfcpResult<usize> {
        let after_length = self.header_len() - 4;
        (self.length as usize)
            .checked_sub(after_length)
            .ok_or_else(|| PfcpError::InvalidFormat(format!("message length {} too small", self.length)))
    }
}
