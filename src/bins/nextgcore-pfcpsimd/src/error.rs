//! PFCP Simulator Error Types

use ogs_pfcp::header::PfcpMessageType;
use ogs_pfcp::types::PfcpCause;
use ogs_pfcp::PfcpError;
use thiserror::Error;

/// Rule construction error, raised by `build()` before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{rule} ID is mandatory")]
    MissingId { rule: &'static str },

    #[error("PDR direction must be set to uplink or downlink")]
    MissingDirection,

    #[error("PDR {pdr_id} needs a FAR ID")]
    MissingFarId { pdr_id: u16 },

    #[error("PDR {pdr_id} needs at least one QER ID")]
    MissingQerId { pdr_id: u16 },

    #[error("uplink PDR {pdr_id} needs a non-zero TEID")]
    MissingTeid { pdr_id: u16 },

    #[error("uplink PDR {pdr_id} needs an N3 address")]
    MissingN3Address { pdr_id: u16 },

    #[error("downlink PDR {pdr_id} needs a UE address")]
    MissingUeAddress { pdr_id: u16 },

    #[error("PDR {pdr_id}: SDF filter of {len} octets does not fit an IE")]
    SdfFilterTooLong { pdr_id: u16, len: usize },

    #[error("FAR {far_id} cannot both forward and drop")]
    ForwardAndDrop { far_id: u32 },

    #[error("FAR {far_id} has no forward, drop or buffer action")]
    NoAction { far_id: u32 },

    #[error("FAR {far_id}: downlink TEID and IP must be set together")]
    IncompleteTunnel { far_id: u32 },

    #[error("URR {urr_id}: measurement information {bits:#04x} has undefined flags")]
    InvalidMeasurementInformation { urr_id: u32, bits: u8 },
}

/// PFCP simulator error
#[derive(Debug, Error)]
pub enum PfcpSimError {
    /// Socket or address resolution failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// No response within the response timeout
    #[error("Timeout expired waiting for {0}")]
    TimeoutExpired(PfcpMessageType),

    /// Response of the wrong message type
    #[error("Invalid response: expected {expected}, got {actual}")]
    InvalidResponse {
        expected: PfcpMessageType,
        actual: PfcpMessageType,
    },

    /// Response parsed but the cause rejects the request
    #[error("Invalid cause in {message}: {cause}")]
    InvalidCause {
        message: PfcpMessageType,
        cause: PfcpCause,
    },

    #[error("PFCP association is not active")]
    AssociationInactive,

    #[error("Not enough sessions: requested {requested}, tracked {tracked}")]
    NotEnoughSessions { requested: usize, tracked: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Rule invariant violation: {0}")]
    InvariantViolation(#[from] RuleError),

    #[error("Not connected to a PFCP peer")]
    NotConnected,

    #[error("Session {local_seid:#x} has no peer SEID")]
    SessionNotActive { local_seid: u64 },

    #[error("Identifier space exhausted: {0}")]
    IdentifierExhausted(&'static str),

    #[error("PFCP codec error: {0}")]
    Codec(#[from] PfcpError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for PfcpSimError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// PFCP simulator result type
pub type SimResult<T> = Result<T, PfcpSimError>;
