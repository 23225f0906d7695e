//! PFCP Types
//!
//! Structured IE values from 3GPP TS 29.244 Section 8.2. Each type knows how
//! to turn itself into an [`Ie`] and how to read itself back from one.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::error::{PfcpError, PfcpResult};
use crate::ie::{Ie, IeType};

/// PFCP version
pub const PFCP_VERSION: u8 = 1;

/// PFCP UDP port
pub const PFCP_UDP_PORT: u16 = 8805;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Current time as a Recovery Time Stamp value (NTP seconds)
pub fn recovery_time_stamp_now() -> u32 {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    (unix + NTP_UNIX_OFFSET) as u32
}

fn take_ipv4(buf: &mut Bytes) -> PfcpResult<Ipv4Addr> {
    if buf.remaining() < 4 {
        return Err(PfcpError::short(4, buf.remaining()));
    }
    Ok(Ipv4Addr::from(buf.get_u32()))
}

fn take_ipv6(buf: &mut Bytes) -> PfcpResult<Ipv6Addr> {
    if buf.remaining() < 16 {
        return Err(PfcpError::short(16, buf.remaining()));
    }
    Ok(Ipv6Addr::from(buf.get_u128()))
}

fn value_of(ie: &Ie, expected: IeType) -> PfcpResult<Bytes> {
    if !ie.is(expected) {
        return Err(PfcpError::InvalidFormat(format!(
            "expected {} IE, found type {}",
            expected.name(),
            ie.ie_type
        )));
    }
    Ok(ie.value()?.clone())
}

// ============================================================================
// Cause
// ============================================================================

/// PFCP Cause Values (TS 29.244 Section 8.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PfcpCause {
    RequestAccepted = 1,
    MoreUsageReportToSend = 2,
    RequestRejected = 64,
    SessionContextNotFound = 65,
    MandatoryIeMissing = 66,
    ConditionalIeMissing = 67,
    InvalidLength = 68,
    MandatoryIeIncorrect = 69,
    InvalidForwardingPolicy = 70,
    InvalidFTeidAllocationOption = 71,
    NoEstablishedPfcpAssociation = 72,
    RuleCreationModificationFailure = 73,
    PfcpEntityInCongestion = 74,
    NoResourcesAvailable = 75,
    ServiceNotSupported = 76,
    SystemFailure = 77,
    RedirectionRequested = 78,
    AllDynamicAddressesAreOccupied = 79,
}

impl TryFrom<u8> for PfcpCause {
    type Error = PfcpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let cause = match value {
            1 => Self::RequestAccepted,
            2 => Self::MoreUsageReportToSend,
            64 => Self::RequestRejected,
            65 => Self::SessionContextNotFound,
            66 => Self::MandatoryIeMissing,
            67 => Self::ConditionalIeMissing,
            68 => Self::InvalidLength,
            69 => Self::MandatoryIeIncorrect,
            70 => Self::InvalidForwardingPolicy,
            71 => Self::InvalidFTeidAllocationOption,
            72 => Self::NoEstablishedPfcpAssociation,
            73 => Self::RuleCreationModificationFailure,
            74 => Self::PfcpEntityInCongestion,
            75 => Self::NoResourcesAvailable,
            76 => Self::ServiceNotSupported,
            77 => Self::SystemFailure,
            78 => Self::RedirectionRequested,
            79 => Self::AllDynamicAddressesAreOccupied,
            _ => return Err(PfcpError::InvalidCause(value)),
        };
        Ok(cause)
    }
}

impl PfcpCause {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::RequestAccepted)
    }

    pub fn to_ie(self) -> Ie {
        Ie::new_u8(IeType::Cause, self as u8)
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let value = value_of(ie, IeType::Cause)?;
        let raw = value.first().copied().ok_or_else(|| PfcpError::short(1, 0))?;
        Self::try_from(raw)
    }
}

impl std::fmt::Display for PfcpCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, *self as u8)
    }
}

// ============================================================================
// Interfaces
// ============================================================================

/// Source Interface values (TS 29.244 Section 8.2.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SourceInterface {
    Access = 0,
    Core = 1,
    SgiLanN6Lan = 2,
    CpFunction = 3,
}

impl SourceInterface {
    pub fn to_ie(self) -> Ie {
        Ie::new_u8(IeType::SourceInterface, self as u8)
    }
}

/// Destination Interface values (TS 29.244 Section 8.2.24)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DestinationInterface {
    Access = 0,
    Core = 1,
    SgiLanN6Lan = 2,
    CpFunction = 3,
    LiFunction = 4,
}

impl DestinationInterface {
    pub fn to_ie(self) -> Ie {
        Ie::new_u8(IeType::DestinationInterface, self as u8)
    }
}

// ============================================================================
// Node ID
// ============================================================================

/// Node ID (TS 29.244 Section 8.2.38)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeId {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Fqdn(String),
}

impl From<IpAddr> for NodeId {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::Ipv4(v4),
            IpAddr::V6(v6) => Self::Ipv6(v6),
        }
    }
}

impl NodeId {
    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::new();
        match self {
            Self::Ipv4(addr) => {
                buf.put_u8(0);
                buf.put_slice(&addr.octets());
            }
            Self::Ipv6(addr) => {
                buf.put_u8(1);
                buf.put_slice(&addr.octets());
            }
            Self::Fqdn(fqdn) => {
                buf.put_u8(2);
                for label in fqdn.split('.').filter(|l| !l.is_empty()) {
                    buf.put_u8(label.len() as u8);
                    buf.put_slice(label.as_bytes());
                }
            }
        }
        Ie::new(IeType::NodeId, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let mut value = value_of(ie, IeType::NodeId)?;
        if !value.has_remaining() {
            return Err(PfcpError::short(1, 0));
        }
        match value.get_u8() & 0x0F {
            0 => Ok(Self::Ipv4(take_ipv4(&mut value)?)),
            1 => Ok(Self::Ipv6(take_ipv6(&mut value)?)),
            2 => {
                let mut labels = Vec::new();
                while value.has_remaining() {
                    let len = value.get_u8() as usize;
                    if len == 0 {
                        break;
                    }
                    if value.remaining() < len {
                        return Err(PfcpError::short(len, value.remaining()));
                    }
                    let label = value.copy_to_bytes(len);
                    labels.push(String::from_utf8_lossy(&label).into_owned());
                }
                Ok(Self::Fqdn(labels.join(".")))
            }
            other => Err(PfcpError::InvalidNodeIdType(other)),
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4(addr) => write!(f, "{addr}"),
            Self::Ipv6(addr) => write!(f, "{addr}"),
            Self::Fqdn(name) => f.write_str(name),
        }
    }
}

// ============================================================================
// F-SEID / F-TEID
// ============================================================================

/// F-SEID (TS 29.244 Section 8.2.37)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FSeid {
    pub seid: u64,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl FSeid {
    pub fn new(seid: u64, addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self { seid, ipv4: Some(v4), ipv6: None },
            IpAddr::V6(v6) => Self { seid, ipv4: None, ipv6: Some(v6) },
        }
    }

    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(25);
        let flags = (self.ipv4.is_some() as u8) << 1 | self.ipv6.is_some() as u8;
        buf.put_u8(flags);
        buf.put_u64(self.seid);
        if let Some(addr) = self.ipv4 {
            buf.put_slice(&addr.octets());
        }
        if let Some(addr) = self.ipv6 {
            buf.put_slice(&addr.octets());
        }
        Ie::new(IeType::FSeid, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let mut value = value_of(ie, IeType::FSeid)?;
        if value.remaining() < 9 {
            return Err(PfcpError::short(9, value.remaining()));
        }
        let flags = value.get_u8();
        let seid = value.get_u64();
        let ipv4 = if flags & 0x02 != 0 { Some(take_ipv4(&mut value)?) } else { None };
        let ipv6 = if flags & 0x01 != 0 { Some(take_ipv6(&mut value)?) } else { None };
        Ok(Self { seid, ipv4, ipv6 })
    }
}

/// F-TEID (TS 29.244 Section 8.2.3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FTeid {
    pub teid: u32,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    /// CH flag: the UP function allocates the TEID
    pub choose: bool,
}

impl FTeid {
    pub fn new_ipv4(teid: u32, addr: Ipv4Addr) -> Self {
        Self { teid, ipv4: Some(addr), ipv6: None, choose: false }
    }

    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(21);
        let mut flags = 0u8;
        if self.ipv4.is_some() {
            flags |= 0x01;
        }
        if self.ipv6.is_some() {
            flags |= 0x02;
        }
        if self.choose {
            flags |= 0x04;
        }
        buf.put_u8(flags);
        if !self.choose {
            buf.put_u32(self.teid);
            if let Some(addr) = self.ipv4 {
                buf.put_slice(&addr.octets());
            }
            if let Some(addr) = self.ipv6 {
                buf.put_slice(&addr.octets());
            }
        }
        Ie::new(IeType::FTeid, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let mut value = value_of(ie, IeType::FTeid)?;
        if !value.has_remaining() {
            return Err(PfcpError::short(1, 0));
        }
        let flags = value.get_u8();
        let choose = flags & 0x04 != 0;
        if choose {
            return Ok(Self { teid: 0, ipv4: None, ipv6: None, choose });
        }
        if value.remaining() < 4 {
            return Err(PfcpError::short(4, value.remaining()));
        }
        let teid = value.get_u32();
        let ipv4 = if flags & 0x01 != 0 { Some(take_ipv4(&mut value)?) } else { None };
        let ipv6 = if flags & 0x02 != 0 { Some(take_ipv6(&mut value)?) } else { None };
        Ok(Self { teid, ipv4, ipv6, choose })
    }
}

// ============================================================================
// UE IP Address / Outer Header
// ============================================================================

/// UE IP Address (TS 29.244 Section 8.2.62), IPv4 only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeIpAddress {
    pub addr: Ipv4Addr,
    /// S/D flag: set when the address is the destination of the packets
    pub is_destination: bool,
}

impl UeIpAddress {
    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(5);
        let mut flags = 0x02;
        if self.is_destination {
            flags |= 0x04;
        }
        buf.put_u8(flags);
        buf.put_slice(&self.addr.octets());
        Ie::new(IeType::UeIpAddress, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let mut value = value_of(ie, IeType::UeIpAddress)?;
        if !value.has_remaining() {
            return Err(PfcpError::short(1, 0));
        }
        let flags = value.get_u8();
        if flags & 0x02 == 0 {
            return Err(PfcpError::InvalidFormat("UE IP Address without IPv4".into()));
        }
        Ok(Self {
            addr: take_ipv4(&mut value)?,
            is_destination: flags & 0x04 != 0,
        })
    }
}

/// Outer Header Removal description (TS 29.244 Section 8.2.64)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OuterHeaderRemoval {
    GtpuUdpIpv4 = 0,
    GtpuUdpIpv6 = 1,
    UdpIpv4 = 2,
    UdpIpv6 = 3,
}

impl OuterHeaderRemoval {
    pub fn to_ie(self) -> Ie {
        Ie::new_u8(IeType::OuterHeaderRemoval, self as u8)
    }
}

/// Outer Header Creation (TS 29.244 Section 8.2.56), GTP-U/UDP/IPv4 form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuterHeaderCreation {
    pub teid: u32,
    pub ipv4: Ipv4Addr,
}

impl OuterHeaderCreation {
    const GTPU_UDP_IPV4: u16 = 0x0100;

    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u16(Self::GTPU_UDP_IPV4);
        buf.put_u32(self.teid);
        buf.put_slice(&self.ipv4.octets());
        Ie::new(IeType::OuterHeaderCreation, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let mut value = value_of(ie, IeType::OuterHeaderCreation)?;
        if value.remaining() < 2 {
            return Err(PfcpError::short(2, value.remaining()));
        }
        let description = value.get_u16();
        if description & Self::GTPU_UDP_IPV4 == 0 {
            return Err(PfcpError::InvalidFormat(format!(
                "unsupported outer header creation description {description:#06x}"
            )));
        }
        if value.remaining() < 4 {
            return Err(PfcpError::short(4, value.remaining()));
        }
        let teid = value.get_u32();
        Ok(Self { teid, ipv4: take_ipv4(&mut value)? })
    }
}

// ============================================================================
// FAR / QER values
// ============================================================================

/// Apply Action flags (TS 29.244 Section 8.2.26)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyAction {
    pub drop: bool,
    pub forw: bool,
    pub buff: bool,
    pub nocp: bool,
    pub dupl: bool,
}

impl ApplyAction {
    pub const DROP: u8 = 0x01;
    pub const FORW: u8 = 0x02;
    pub const BUFF: u8 = 0x04;
    pub const NOCP: u8 = 0x08;
    pub const DUPL: u8 = 0x10;

    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.drop {
            bits |= Self::DROP;
        }
        if self.forw {
            bits |= Self::FORW;
        }
        if self.buff {
            bits |= Self::BUFF;
        }
        if self.nocp {
            bits |= Self::NOCP;
        }
        if self.dupl {
            bits |= Self::DUPL;
        }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Self {
            drop: bits & Self::DROP != 0,
            forw: bits & Self::FORW != 0,
            buff: bits & Self::BUFF != 0,
            nocp: bits & Self::NOCP != 0,
            dupl: bits & Self::DUPL != 0,
        }
    }

    pub fn to_ie(&self) -> Ie {
        Ie::new_u8(IeType::ApplyAction, self.bits())
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let value = value_of(ie, IeType::ApplyAction)?;
        let bits = value.first().copied().ok_or_else(|| PfcpError::short(1, 0))?;
        Ok(Self::from_bits(bits))
    }
}

/// Gate Status (TS 29.244 Section 8.2.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStatus {
    pub ul_open: bool,
    pub dl_open: bool,
}

impl Default for GateStatus {
    fn default() -> Self {
        Self { ul_open: true, dl_open: true }
    }
}

impl GateStatus {
    pub fn closed() -> Self {
        Self { ul_open: false, dl_open: false }
    }

    pub fn to_ie(&self) -> Ie {
        // 0 = OPEN, 1 = CLOSED; UL gate in bits 3-4, DL gate in bits 1-2
        let ul = if self.ul_open { 0 } else { 1 };
        let dl = if self.dl_open { 0 } else { 1 };
        Ie::new_u8(IeType::GateStatus, (ul << 2) | dl)
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        let value = value_of(ie, IeType::GateStatus)?;
        let bits = value.first().copied().ok_or_else(|| PfcpError::short(1, 0))?;
        Ok(Self {
            ul_open: (bits >> 2) & 0x03 == 0,
            dl_open: bits & 0x03 == 0,
        })
    }
}

/// MBR / GBR value in kbps (TS 29.244 Section 8.2.8 / 8.2.9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitrate {
    pub uplink: u64,
    pub downlink: u64,
}

impl Bitrate {
    /// Bitrates are 40-bit fields
    pub const MAX_KBPS: u64 = 0xFF_FFFF_FFFF;

    pub fn new(uplink: u64, downlink: u64) -> Self {
        Self { uplink, downlink }
    }

    fn encode(&self, ie_type: IeType) -> Ie {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_slice(&self.uplink.min(Self::MAX_KBPS).to_be_bytes()[3..]);
        buf.put_slice(&self.downlink.min(Self::MAX_KBPS).to_be_bytes()[3..]);
        Ie::new(ie_type, buf.freeze())
    }

    pub fn to_mbr_ie(&self) -> Ie {
        self.encode(IeType::Mbr)
    }

    pub fn to_gbr_ie(&self) -> Ie {
        self.encode(IeType::Gbr)
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        if !ie.is(IeType::Mbr) && !ie.is(IeType::Gbr) {
            return Err(PfcpError::InvalidFormat(format!("type {} is not a bitrate", ie.ie_type)));
        }
        let mut value = ie.value()?.clone();
        if value.remaining() < 10 {
            return Err(PfcpError::short(10, value.remaining()));
        }
        let mut read40 = || {
            let mut octets = [0u8; 8];
            value.copy_to_slice(&mut octets[3..]);
            u64::from_be_bytes(octets)
        };
        let uplink = read40();
        let downlink = read40();
        Ok(Self { uplink, downlink })
    }
}

// ============================================================================
// URR values
// ============================================================================

/// Measurement Method flags (TS 29.244 Section 8.2.40)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasurementMethod {
    pub durat: bool,
    pub volum: bool,
    pub event: bool,
}

impl MeasurementMethod {
    pub fn to_ie(&self) -> Ie {
        let bits = self.durat as u8 | (self.volum as u8) << 1 | (self.event as u8) << 2;
        Ie::new_u8(IeType::MeasurementMethod, bits)
    }
}

/// Measurement Information flags (TS 29.244 Section 8.2.68)
pub mod measurement_information {
    pub const MBQE: u8 = 0x01;
    pub const INAM: u8 = 0x02;
    pub const RADI: u8 = 0x04;
    pub const ISTM: u8 = 0x08;
    pub const MNOP: u8 = 0x10;
    /// Every defined flag
    pub const MASK: u8 = MBQE | INAM | RADI | ISTM | MNOP;
}

/// Reporting Triggers (TS 29.244 Section 8.2.19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportingTriggers {
    pub perio: bool,
    pub volth: bool,
    pub timth: bool,
    pub quhti: bool,
    pub start: bool,
    pub stopt: bool,
    pub droth: bool,
    pub liusa: bool,
    pub volqu: bool,
    pub timqu: bool,
    pub envcl: bool,
}

impl ReportingTriggers {
    pub fn bits(&self) -> u16 {
        let first = self.perio as u8
            | (self.volth as u8) << 1
            | (self.timth as u8) << 2
            | (self.quhti as u8) << 3
            | (self.start as u8) << 4
            | (self.stopt as u8) << 5
            | (self.droth as u8) << 6
            | (self.liusa as u8) << 7;
        let second = self.volqu as u8 | (self.timqu as u8) << 1 | (self.envcl as u8) << 2;
        u16::from_be_bytes([first, second])
    }

    pub fn to_ie(&self) -> Ie {
        Ie::new_u16(IeType::ReportingTriggers, self.bits())
    }
}

/// Volume Threshold / Volume Quota body (TS 29.244 Section 8.2.13 / 8.2.50)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Volume {
    pub total: Option<u64>,
    pub uplink: Option<u64>,
    pub downlink: Option<u64>,
}

impl Volume {
    pub fn total(total: u64) -> Self {
        Self { total: Some(total), ..Default::default() }
    }

    fn encode(&self, ie_type: IeType) -> Ie {
        let mut buf = BytesMut::with_capacity(25);
        let flags = self.total.is_some() as u8
            | (self.uplink.is_some() as u8) << 1
            | (self.downlink.is_some() as u8) << 2;
        buf.put_u8(flags);
        for value in [self.total, self.uplink, self.downlink].into_iter().flatten() {
            buf.put_u64(value);
        }
        Ie::new(ie_type, buf.freeze())
    }

    pub fn to_threshold_ie(&self) -> Ie {
        self.encode(IeType::VolumeThreshold)
    }

    pub fn to_quota_ie(&self) -> Ie {
        self.encode(IeType::VolumeQuota)
    }

    pub fn from_ie(ie: &Ie) -> PfcpResult<Self> {
        if !ie.is(IeType::VolumeThreshold) && !ie.is(IeType::VolumeQuota) {
            return Err(PfcpError::InvalidFormat(format!("type {} is not a volume", ie.ie_type)));
        }
        let mut value = ie.value()?.clone();
        if !value.has_remaining() {
            return Err(PfcpError::short(1, 0));
        }
        let flags = value.get_u8();
        let mut next = |bit: u8| -> PfcpResult<Option<u64>> {
            if flags & bit == 0 {
                return Ok(None);
            }
            if value.remaining() < 8 {
                return Err(PfcpError::short(8, value.remaining()));
            }
            Ok(Some(value.get_u64()))
        };
        Ok(Self {
            total: next(0x01)?,
            uplink: next(0x02)?,
            downlink: next(0x04)?,
        })
    }
}

// ============================================================================
// Typed accessors
// ============================================================================

impl Ie {
    pub fn cause(&self) -> PfcpResult<PfcpCause> {
        PfcpCause::from_ie(self)
    }

    pub fn f_seid(&self) -> PfcpResult<FSeid> {
        FSeid::from_ie(self)
    }

    pub fn node_id(&self) -> PfcpResult<NodeId> {
        NodeId::from_ie(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_from_ie() {
        let ie = PfcpCause::RuleCreationModificationFailure.to_ie();
        assert_eq!(PfcpCause::from_ie(&ie).unwrap(), PfcpCause::RuleCreationModificationFailure);
        assert!(!PfcpCause::RequestRejected.is_accepted());
        assert!(matches!(
            PfcpCause::from_ie(&Ie::new_u8(IeType::Cause, 200)),
            Err(PfcpError::InvalidCause(200))
        ));
    }

    #[test]
    fn test_node_id_fqdn_labels() {
        let node_id = NodeId::Fqdn("upf.example.org".to_string());
        let ie = node_id.to_ie();
        assert_eq!(
            &ie.value().unwrap()[..],
            b"\x02\x03upf\x07example\x03org"
        );
        assert_eq!(NodeId::from_ie(&ie).unwrap(), node_id);
    }

    #[test]
    fn test_f_seid_ipv4_layout() {
        let f_seid = FSeid::new(0x11, "10.0.0.1".parse().unwrap());
        let ie = f_seid.to_ie();
        let value = ie.value().unwrap();
        assert_eq!(value[0], 0x02);
        assert_eq!(value.len(), 13);
        assert_eq!(FSeid::from_ie(&ie).unwrap(), f_seid);
    }

    #[test]
    fn test_f_seid_wrong_ie_type() {
        assert!(FSeid::from_ie(&Ie::pdr_id(1)).is_err());
    }

    #[test]
    fn test_f_teid_choose_has_no_teid() {
        let f_teid = FTeid { teid: 0, ipv4: None, ipv6: None, choose: true };
        let ie = f_teid.to_ie();
        assert_eq!(ie.value().unwrap().len(), 1);
        assert!(FTeid::from_ie(&ie).unwrap().choose);
    }

    #[test]
    fn test_gate_status_bits() {
        assert_eq!(GateStatus::default().to_ie().as_u8().unwrap(), 0);
        assert_eq!(GateStatus::closed().to_ie().as_u8().unwrap(), 0x05);
        let half = GateStatus { ul_open: true, dl_open: false };
        assert_eq!(GateStatus::from_ie(&half.to_ie()).unwrap(), half);
    }

    #[test]
    fn test_bitrate_is_40_bit() {
        let rate = Bitrate::new(Bitrate::MAX_KBPS + 10, 1);
        let ie = rate.to_mbr_ie();
        assert_eq!(ie.value().unwrap().len(), 10);
        let decoded = Bitrate::from_ie(&ie).unwrap();
        assert_eq!(decoded.uplink, Bitrate::MAX_KBPS);
        assert_eq!(decoded.downlink, 1);
    }

    #[test]
    fn test_volume_partial_fields() {
        let volume = Volume { total: None, uplink: Some(10), downlink: None };
        let ie = volume.to_quota_ie();
        assert_eq!(ie.value().unwrap().len(), 9);
        assert_eq!(Volume::from_ie(&ie).unwrap(), volume);
    }

    #[test]
    fn test_outer_header_creation() {
        let ohc = OuterHeaderCreation { teid: 0xABCD, ipv4: Ipv4Addr::new(10, 0, 0, 1) };
        assert_eq!(OuterHeaderCreation::from_ie(&ohc.to_ie()).unwrap(), ohc);
    }

    #[test]
    fn test_reporting_triggers_octets() {
        let triggers = ReportingTriggers { volth: true, volqu: true, ..Default::default() };
        assert_eq!(triggers.bits(), 0x0201);
    }

    #[test]
    fn test_recovery_time_stamp_is_ntp_based() {
        // 2020-01-01 in NTP seconds
        assert!(recovery_time_stamp_now() > 3_786_825_600);
    }
}
