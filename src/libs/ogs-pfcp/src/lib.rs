//! NextGCore PFCP Protocol Library
//!
//! PFCP (Packet Forwarding Control Protocol) message building and parsing as
//! specified in 3GPP TS 29.244.
//!
//! PFCP is used on N4/Sxb between the Control Plane (CP) and User Plane (UP)
//! functions in 5G and LTE networks.
//!
//! # Example
//!
//! ```rust
//! use ogs_pfcp::{PfcpMessage, PfcpMessageType};
//!
//! let msg = PfcpMessage::heartbeat_request(1, 3_900_000_000);
//! let buf = msg.marshal().unwrap();
//!
//! let parsed = PfcpMessage::parse(&buf).unwrap();
//! assert_eq!(parsed.message_type(), PfcpMessageType::HeartbeatRequest);
//! assert_eq!(parsed.recovery_time_stamp().unwrap(), 3_900_000_000);
//! ```

pub mod error;
pub mod header;
pub mod ie;
pub mod message;
pub mod types;


pub use error::{PfcpError, PfcpResult};
pub use header::{PfcpHeader, PfcpMessageType, PFCP_HEADER_LEN, PFCP_HEADER_LEN_WITH_SEID};
pub use ie::{Ie, IeBody, IeType, MAX_IE_NESTING};
pub use message::PfcpMessage;
pub use types::PFCP_UDP_PORT;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PfcpError, PfcpResult};
    pub use crate::header::{PfcpHeader, PfcpMessageType};
    pub use crate::ie::{Ie, IeBody, IeHeader, IeType};
    pub use crate::message::PfcpMessage;
    pub use crate::types::{
        recovery_time_stamp_now, ApplyAction, Bitrate, DestinationInterface, FSeid, FTeid,
        GateStatus, MeasurementMethod, NodeId, OuterHeaderCreation, OuterHeaderRemoval,
        PfcpCause, ReportingTriggers, SourceInterface, UeIpAddress, Volume, PFCP_UDP_PORT,
    };
}
