//! PFCP Error Types
//!
//! Error types for PFCP encoding and decoding.

use thiserror::Error;

/// PFCP codec error
#[derive(Debug, Error)]
pub enum PfcpError {
    /// Buffer too short for operation
    #[error("Buffer too short: needed {needed} bytes, available {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Invalid message or IE format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A length does not fit its 16-bit wire field
    #[error("{what} length {length} exceeds {max} octets")]
    LengthOverflow {
        what: &'static str,
        length: usize,
        max: usize,
    },

    /// Invalid message type
    #[error("Invalid message type: {0}")]
    InvalidMessageType(u8),

    /// Cause value not defined by TS 29.244
    #[error("Invalid cause value: {0}")]
    InvalidCause(u8),

    /// Invalid node ID type
    #[error("Invalid node ID type: {0}")]
    InvalidNodeIdType(u8),

    /// Missing mandatory IE
    #[error("Missing mandatory IE: {0}")]
    MissingMandatoryIe(&'static str),

    /// Version not supported
    #[error("PFCP version not supported: {0}")]
    VersionNotSupported(u8),
}

impl PfcpError {
    pub(crate) fn short(needed: usize, available: usize) -> Self {
        Self::BufferTooShort { needed, available }
    }

    pub(crate) fn overflow(what: &'static str, length: usize) -> Self {
        Self::LengthOverflow {
            what,
            length,
            max: u16::MAX as usize,
        }
    }
}

/// PFCP Result type
pub type PfcpResult<T> = Result<T, PfcpError>;
