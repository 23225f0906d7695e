//! PFCP Information Elements
//!
//! IEs are held as a tree: a leaf carries its raw octets, a grouped IE
//! carries child IEs. Whether an IE is grouped is decided by its type
//! (TS 29.244 Section 8.1.2), so decoding needs no schema beyond that.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::error::{PfcpError, PfcpResult};

/// Deepest grouped IE nesting accepted when decoding
pub const MAX_IE_NESTING: usize = 8;

/// Longest flow description an SDF Filter IE can carry
pub const MAX_FLOW_DESCRIPTION_LEN: usize = u16::MAX as usize - 4;

/// PFCP IE Type values (TS 29.244 Section 8.1.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IeType {
    CreatePdr = 1,
    Pdi = 2,
    CreateFar = 3,
    ForwardingParameters = 4,
    CreateUrr = 6,
    CreateQer = 7,
    CreatedPdr = 8,
    UpdatePdr = 9,
    UpdateFar = 10,
    UpdateForwardingParameters = 11,
    UpdateUrr = 13,
    UpdateQer = 14,
    RemovePdr = 15,
    RemoveFar = 16,
    RemoveUrr = 17,
    RemoveQer = 18,
    Cause = 19,
    SourceInterface = 20,
    FTeid = 21,
    NetworkInstance = 22,
    SdfFilter = 23,
    GateStatus = 25,
    Mbr = 26,
    Gbr = 27,
    Precedence = 29,
    VolumeThreshold = 31,
    ReportingTriggers = 37,
    ReportType = 39,
    OffendingIe = 40,
    DestinationInterface = 42,
    UpFunctionFeatures = 43,
    ApplyAction = 44,
    PdrId = 56,
    FSeid = 57,
    NodeId = 60,
    MeasurementMethod = 62,
    MeasurementPeriod = 64,
    VolumeQuota = 73,
    UrrId = 81,
    OuterHeaderCreation = 84,
    CpFunctionFeatures = 89,
    UeIpAddress = 93,
    OuterHeaderRemoval = 95,
    RecoveryTimeStamp = 96,
    MeasurementInformation = 100,
    FarId = 108,
    QerId = 109,
    Qfi = 124,
}

impl IeType {
    /// Grouped IEs carry other IEs as their value
    pub fn is_grouped(ie_type: u16) -> bool {
        // Rule IEs, Load/Overload Control, PFD, Usage Reports, DL Data Report,
        // BAR IEs, Error Indication and UP Path Failure reports
        matches!(ie_type, 1..=18 | 51 | 54 | 58 | 59 | 78..=80 | 83 | 85..=87 | 99 | 102)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreatePdr => "Create PDR",
            Self::Pdi => "PDI",
            Self::CreateFar => "Create FAR",
            Self::ForwardingParameters => "Forwarding Parameters",
            Self::CreateUrr => "Create URR",
            Self::CreateQer => "Create QER",
            Self::CreatedPdr => "Created PDR",
            Self::UpdatePdr => "Update PDR",
            Self::UpdateFar => "Update FAR",
            Self::UpdateForwardingParameters => "Update Forwarding Parameters",
            Self::UpdateUrr => "Update URR",
            Self::UpdateQer => "Update QER",
            Self::RemovePdr => "Remove PDR",
            Self::RemoveFar => "Remove FAR",
            Self::RemoveUrr => "Remove URR",
            Self::RemoveQer => "Remove QER",
            Self::Cause => "Cause",
            Self::SourceInterface => "Source Interface",
            Self::FTeid => "F-TEID",
            Self::NetworkInstance => "Network Instance",
            Self::SdfFilter => "SDF Filter",
            Self::GateStatus => "Gate Status",
            Self::Mbr => "MBR",
            Self::Gbr => "GBR",
            Self::Precedence => "Precedence",
            Self::VolumeThreshold => "Volume Threshold",
            Self::ReportingTriggers => "Reporting Triggers",
            Self::ReportType => "Report Type",
            Self::OffendingIe => "Offending IE",
            Self::DestinationInterface => "Destination Interface",
            Self::UpFunctionFeatures => "UP Function Features",
            Self::ApplyAction => "Apply Action",
            Self::PdrId => "PDR ID",
            Self::FSeid => "F-SEID",
            Self::NodeId => "Node ID",
            Self::MeasurementMethod => "Measurement Method",
            Self::MeasurementPeriod => "Measurement Period",
            Self::VolumeQuota => "Volume Quota",
            Self::UrrId => "URR ID",
            Self::OuterHeaderCreation => "Outer Header Creation",
            Self::CpFunctionFeatures => "CP Function Features",
            Self::UeIpAddress => "UE IP Address",
            Self::OuterHeaderRemoval => "Outer Header Removal",
            Self::RecoveryTimeStamp => "Recovery Time Stamp",
            Self::MeasurementInformation => "Measurement Information",
            Self::FarId => "FAR ID",
            Self::QerId => "QER ID",
            Self::Qfi => "QFI",
        }
    }
}

/// IE Header: Type (2 octets) + Length (2 octets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IeHeader {
    pub ie_type: u16,
    pub length: u16,
}

impl IeHeader {
    pub const LEN: usize = 4;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.ie_type);
        buf.put_u16(self.length);
    }

    pub fn decode(buf: &mut Bytes) -> PfcpResult<Self> {
        if buf.remaining() < Self::LEN {
            return Err(PfcpError::short(Self::LEN, buf.remaining()));
        }
        Ok(Self {
            ie_type: buf.get_u16(),
            length: buf.get_u16(),
        })
    }
}

/// IE payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IeBody {
    Value(Bytes),
    Grouped(Vec<Ie>),
}

/// A single PFCP information element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ie {
    /// Raw type value; unknown and vendor types are kept as-is
    pub ie_type: u16,
    pub body: IeBody,
}

impl Ie {
    /// Leaf IE with the given octets
    pub fn new(ie_type: IeType, value: impl Into<Bytes>) -> Self {
        Self {
            ie_type: ie_type as u16,
            body: IeBody::Value(value.into()),
        }
    }

    /// Grouped IE with the given children
    pub fn grouped(ie_type: IeType, children: Vec<Ie>) -> Self {
        Self {
            ie_type: ie_type as u16,
            body: IeBody::Grouped(children),
        }
    }

    pub fn new_u8(ie_type: IeType, value: u8) -> Self {
        Self::new(ie_type, vec![value])
    }

    pub fn new_u16(ie_type: IeType, value: u16) -> Self {
        Self::new(ie_type, value.to_be_bytes().to_vec())
    }

    pub fn new_u32(ie_type: IeType, value: u32) -> Self {
        Self::new(ie_type, value.to_be_bytes().to_vec())
    }

    pub fn is(&self, ie_type: IeType) -> bool {
        self.ie_type == ie_type as u16
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.body, IeBody::Grouped(_))
    }

    /// Octets of a leaf IE
    pub fn value(&self) -> PfcpResult<&Bytes> {
        match &self.body {
            IeBody::Value(value) => Ok(value),
            IeBody::Grouped(_) => Err(PfcpError::InvalidFormat(format!(
                "IE type {} is grouped",
                self.ie_type
            ))),
        }
    }

    /// Children of a grouped IE; a leaf has none
    pub fn children(&self) -> &[Ie] {
        match &self.body {
            IeBody::Grouped(children) => children,
            IeBody::Value(_) => &[],
        }
    }

    /// First direct child of the given type
    pub fn find(&self, ie_type: IeType) -> Option<&Ie> {
        self.children().iter().find(|ie| ie.is(ie_type))
    }

    /// All direct children of the given type
    pub fn find_all(&self, ie_type: IeType) -> impl Iterator<Item = &Ie> {
        self.children().iter().filter(move |ie| ie.is(ie_type))
    }

    pub fn as_u8(&self) -> PfcpResult<u8> {
        let value = self.value()?;
        value.first().copied().ok_or_else(|| PfcpError::short(1, 0))
    }

    pub fn as_u16(&self) -> PfcpResult<u16> {
        let mut value = self.value()?.clone();
        if value.remaining() < 2 {
            return Err(PfcpError::short(2, value.remaining()));
        }
        Ok(value.get_u16())
    }

    pub fn as_u32(&self) -> PfcpResult<u32> {
        let mut value = self.value()?.clone();
        if value.remaining() < 4 {
            return Err(PfcpError::short(4, value.remaining()));
        }
        Ok(value.get_u32())
    }

    /// Length of the value part in octets
    pub fn value_len(&self) -> usize {
        match &self.body {
            IeBody::Value(value) => value.len(),
            IeBody::Grouped(children) => children.iter().map(Ie::encoded_len).sum(),
        }
    }

    /// Length including the IE header
    pub fn encoded_len(&self) -> usize {
        IeHeader::LEN + self.value_len()
    }

    /// Append the encoded IE to `buf`. Fails without writing anything if
    /// any length in the tree overflows its 16-bit field.
    pub fn encode(&self, buf: &mut BytesMut) -> PfcpResult<()> {
        self.check_lengths()?;
        self.encode_unchecked(buf);
        Ok(())
    }

    fn check_lengths(&self) -> PfcpResult<()> {
        let length = self.value_len();
        if length > u16::MAX as usize {
            return Err(PfcpError::overflow("IE value", length));
        }
        if let IeBody::Grouped(children) = &self.body {
            for child in children {
                child.check_lengths()?;
            }
        }
        Ok(())
    }

    fn encode_unchecked(&self, buf: &mut BytesMut) {
        IeHeader {
            ie_type: self.ie_type,
            length: self.value_len() as u16,
        }
        .encode(buf);
        match &self.body {
            IeBody::Value(value) => buf.put_slice(value),
            IeBody::Grouped(children) => {
                for child in children {
                    child.encode_unchecked(buf);
                }
            }
        }
    }

    /// Decode one IE. Grouped IEs nested deeper than [`MAX_IE_NESTING`]
    /// are rejected.
    pub fn decode(buf: &mut Bytes) -> PfcpResult<Self> {
        Self::decode_nested(buf, 0)
    }

    /// Decode IEs until the buffer is exhausted
    pub fn decode_all(buf: &mut Bytes) -> PfcpResult<Vec<Self>> {
        Self::decode_all_nested(buf, 0)
    }

    fn decode_nested(buf: &mut Bytes, depth: usize) -> PfcpResult<Self> {
        let header = IeHeader::decode(buf)?;
        let length = header.length as usize;
        if buf.remaining() < length {
            return Err(PfcpError::short(length, buf.remaining()));
        }
        let mut value = buf.copy_to_bytes(length);
        let body = if IeType::is_grouped(header.ie_type) {
            if depth >= MAX_IE_NESTING {
                return Err(PfcpError::InvalidFormat(format!(
                    "grouped IE {} nested deeper than {MAX_IE_NESTING} levels",
                    header.ie_type
                )));
            }
            IeBody::Grouped(Self::decode_all_nested(&mut value, depth + 1)?)
        } else {
            IeBody::Value(value)
        };
        Ok(Self {
            ie_type: header.ie_type,
            body,
        })
    }

    fn decode_all_nested(buf: &mut Bytes, depth: usize) -> PfcpResult<Vec<Self>> {
        let mut ies = Vec::new();
        while buf.has_remaining() {
            ies.push(Self::decode_nested(buf, depth)?);
        }
        Ok(ies)
    }
}

// ============================================================================
// Scalar IE constructors
// ============================================================================

impl Ie {
    pub fn pdr_id(id: u16) -> Self {
        Self::new_u16(IeType::PdrId, id)
    }

    pub fn far_id(id: u32) -> Self {
        Self::new_u32(IeType::FarId, id)
    }

    pub fn qer_id(id: u32) -> Self {
        Self::new_u32(IeType::QerId, id)
    }

    pub fn urr_id(id: u32) -> Self {
        Self::new_u32(IeType::UrrId, id)
    }

    pub fn precedence(precedence: u32) -> Self {
        Self::new_u32(IeType::Precedence, precedence)
    }

    pub fn recovery_time_stamp(ntp_seconds: u32) -> Self {
        Self::new_u32(IeType::RecoveryTimeStamp, ntp_seconds)
    }

    /// QFI occupies the low 6 bits
    pub fn qfi(qfi: u8) -> Self {
        Self::new_u8(IeType::Qfi, qfi & 0x3F)
    }

    pub fn measurement_period(seconds: u32) -> Self {
        Self::new_u32(IeType::MeasurementPeriod, seconds)
    }

    pub fn network_instance(name: &str) -> Self {
        Self::new(IeType::NetworkInstance, name.as_bytes().to_vec())
    }

    /// SDF Filter carrying only a flow description (FD flag)
    pub fn sdf_filter(flow_description: &str) -> PfcpResult<Self> {
        // flags, spare and the length field share the 16-bit IE length
        if flow_description.len() > MAX_FLOW_DESCRIPTION_LEN {
            return Err(PfcpError::overflow("flow description", flow_description.len()));
        }
        let mut buf = BytesMut::with_capacity(4 + flow_description.len());
        buf.put_u8(0x01);
        buf.put_u8(0);
        buf.put_u16(flow_description.len() as u16);
        buf.put_slice(flow_description.as_bytes());
        Ok(Self::new(IeType::SdfFilter, buf.freeze()))
    }

    /// Flow description of an SDF Filter IE, if present
    pub fn flow_description(&self) -> PfcpResult<Option<String>> {
        let mut value = self.value()?.clone();
        if value.remaining() < 2 {
            return Err(PfcpError::short(2, value.remaining()));
        }
        let flags = value.get_u8();
        value.advance(1);
        if flags & 0x01 == 0 {
            return Ok(None);
        }
        if value.remaining() < 2 {
            return Err(PfcpError::short(2, value.remaining()));
        }
        let len = value.get_u16() as usize;
        if value.remaining() < len {
            return Err(PfcpError::short(len, value.remaining()));
        }
        let text = value.copy_to_bytes(len);
        Ok(Some(String::from_utf8_lossy(&text).into_owned()))
    }
}
