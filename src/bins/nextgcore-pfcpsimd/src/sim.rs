//! Session Scaling
//!
//! Bulk create/modify/delete over a range of session indices, the UE
//! address pool they draw from, and application filters that become SDF
//! filters and gate states on the generated rules.

use std::net::Ipv4Addr;

use ogs_pfcp::ie::{Ie, IeType};
use ogs_pfcp::types::{GateStatus, MeasurementMethod, ReportingTriggers, Volume};

use crate::context::PfcpClient;
use crate::error::{PfcpSimError, SimResult};
use crate::rules::{FarBuilder, IeMethod, PdrBuilder, QerBuilder, UrrBuilder};
use crate::session::SessionRules;

/// Rule IDs reserved per session index
pub const SESSION_STEP: u32 = 10;

/// Application filters one session can carry
pub const MAX_APP_FILTERS: usize = 4;

/// Default session AMBR in kbps
const SESSION_MBR_KBPS: u64 = 500_000;

/// Volume threshold for the optional URR
const URR_VOLUME_THRESHOLD: u64 = 100 * 1024 * 1024;

// ============================================================================
// Application filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterProtocol {
    Ip,
    Udp,
    Tcp,
}

impl FilterProtocol {
    fn as_str(&self) -> &'static str {
        match self {
            FilterProtocol::Ip => "ip",
            FilterProtocol::Udp => "udp",
            FilterProtocol::Tcp => "tcp",
        }
    }
}

/// One application filter: which downlink traffic it matches and whether
/// its gate is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFilter {
    pub protocol: FilterProtocol,
    /// `None` matches any remote address
    pub remote: Option<(Ipv4Addr, u8)>,
    /// Inclusive port range; `None` matches any port
    pub ports: Option<(u16, u16)>,
    pub allow: bool,
    pub precedence: u32,
}

impl Default for AppFilter {
    /// Allow-all filter
    fn default() -> Self {
        Self {
            protocol: FilterProtocol::Ip,
            remote: None,
            ports: None,
            allow: true,
            precedence: 100,
        }
    }
}

impl AppFilter {
    /// Parse `{ip|udp|tcp}:{CIDR|any}:{lo-hi|any}:{allow|deny}:{precedence}`
    pub fn parse(input: &str) -> SimResult<Self> {
        let bad = |what: &str| PfcpSimError::InvalidFormat(format!("app filter {input:?}: {what}"));

        let fields: Vec<&str> = input.trim().split(':').collect();
        let &[protocol, remote, ports, action, precedence] = fields.as_slice() else {
            return Err(bad("expected 5 ':'-separated fields"));
        };

        let protocol = match protocol.to_ascii_lowercase().as_str() {
            "ip" => FilterProtocol::Ip,
            "udp" => FilterProtocol::Udp,
            "tcp" => FilterProtocol::Tcp,
            _ => return Err(bad("protocol must be ip, udp or tcp")),
        };

        let remote = if remote.eq_ignore_ascii_case("any") {
            None
        } else {
            Some(parse_cidr(remote).ok_or_else(|| bad("invalid CIDR"))?)
        };

        let ports = if ports.eq_ignore_ascii_case("any") {
            None
        } else {
            let (lo, hi) = ports.split_once('-').ok_or_else(|| bad("port range must be lo-hi"))?;
            let lo: u16 = lo.parse().map_err(|_| bad("invalid low port"))?;
            let hi: u16 = hi.parse().map_err(|_| bad("invalid high port"))?;
            if lo > hi {
                return Err(bad("low port above high port"));
            }
            if protocol == FilterProtocol::Ip {
                return Err(bad("port range needs udp or tcp"));
            }
            Some((lo, hi))
        };

        let allow = match action.to_ascii_lowercase().as_str() {
            "allow" => true,
            "deny" => false,
            _ => return Err(bad("action must be allow or deny")),
        };

        let precedence = precedence.parse().map_err(|_| bad("invalid precedence"))?;

        Ok(Self {
            protocol,
            remote,
            ports,
            allow,
            precedence,
        })
    }

    /// IPFilterRule text for the SDF filter
    pub fn flow_description(&self) -> String {
        let remote = match self.remote {
            Some((addr, len)) => format!("{addr}/{len}"),
            None => "any".to_string(),
        };
        match self.ports {
            Some((lo, hi)) => format!(
                "permit out {} from {remote} {lo}-{hi} to assigned",
                self.protocol.as_str()
            ),
            None => format!("permit out {} from {remote} to assigned", self.protocol.as_str()),
        }
    }

    pub fn gate_status(&self) -> GateStatus {
        if self.allow {
            GateStatus::default()
        } else {
            GateStatus::closed()
        }
    }
}

/// Parse `a.b.c.d/len`; a bare address is taken as /32
fn parse_cidr(text: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, len) = match text.split_once('/') {
        Some((addr, len)) => (addr, len.parse::<u8>().ok()?),
        None => (text, 32),
    };
    if len > 32 {
        return None;
    }
    Some((addr.parse().ok()?, len))
}

// ============================================================================
// UE address pool
// ============================================================================

/// Hands out successive host addresses of an IPv4 prefix
#[derive(Debug, Clone)]
pub struct UeAddressPool {
    next: u64,
    end: u64,
}

impl UeAddressPool {
    pub fn new(cidr: &str) -> SimResult<Self> {
        let (addr, len) = parse_cidr(cidr)
            .ok_or_else(|| PfcpSimError::InvalidFormat(format!("UE pool {cidr:?} is not an IPv4 CIDR")))?;
        let mask = if len == 0 { 0 } else { u32::MAX << (32 - len) };
        let network = u32::from(addr) & mask;
        let broadcast = network | !mask;
        // /31 and /32 have no network or broadcast address to skip
        let (first, last) = if len >= 31 {
            (network, broadcast)
        } else {
            (network + 1, broadcast - 1)
        };
        Ok(Self {
            next: first as u64,
            end: last as u64 + 1,
        })
    }

    pub fn next_address(&mut self) -> SimResult<Ipv4Addr> {
        if self.next >= self.end {
            return Err(PfcpSimError::IdentifierExhausted("UE address pool"));
        }
        let addr = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Ok(addr)
    }

    /// Addresses still available
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }
}

// ============================================================================
// Bulk operations
// ============================================================================

/// Rule IDs of one session index
#[derive(Debug, Clone, Copy)]
struct RuleIds {
    base: u32,
}

impl RuleIds {
    fn new(index: u32) -> SimResult<Self> {
        let base = index
            .checked_mul(SESSION_STEP)
            .filter(|base| *base <= u16::MAX as u32 - SESSION_STEP)
            .ok_or(PfcpSimError::IdentifierExhausted("rule ID"))?;
        Ok(Self { base })
    }

    fn uplink_pdr(&self, app: usize) -> u16 {
        (self.base + 2 * app as u32) as u16
    }

    fn downlink_pdr(&self, app: usize) -> u16 {
        (self.base + 2 * app as u32 + 1) as u16
    }

    fn uplink_far(&self) -> u32 {
        self.base
    }

    fn downlink_far(&self) -> u32 {
        self.base + 1
    }

    fn app_qer(&self, app: usize) -> u32 {
        self.base + 4 + app as u32
    }

    fn session_qer(&self) -> u32 {
        self.base + 8
    }

    fn urr(&self) -> u32 {
        self.base + 9
    }

    /// UPF-side uplink TEID; never zero
    fn uplink_teid(&self) -> u32 {
        self.base + 1
    }

    /// (g/e)NodeB-side downlink TEID
    fn downlink_teid(&self) -> u32 {
        self.base + 2
    }
}

#[derive(Debug, Clone)]
pub struct CreateSessionsParams {
    pub count: u32,
    pub base_id: u32,
    pub qfi: Option<u8>,
    /// Empty means one allow-all filter
    pub app_filters: Vec<AppFilter>,
    pub with_urr: bool,
}

impl Default for CreateSessionsParams {
    fn default() -> Self {
        Self {
            count: 1,
            base_id: 1,
            qfi: None,
            app_filters: Vec::new(),
            with_urr: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModifySessionsParams {
    pub count: u32,
    pub base_id: u32,
    /// Buffer downlink traffic instead of forwarding it
    pub buffer: bool,
    /// Ask the UPF to notify the CP of buffered downlink data
    pub notify_cp: bool,
    /// (g/e)NodeB address for downlink forwarding; the configured one if unset
    pub gnodeb_address: Option<Ipv4Addr>,
}

impl Default for ModifySessionsParams {
    fn default() -> Self {
        Self {
            count: 1,
            base_id: 1,
            buffer: false,
            notify_cp: false,
            gnodeb_address: None,
        }
    }
}

fn session_range(count: u32, base_id: u32) -> SimResult<std::ops::Range<u32>> {
    let end = base_id
        .checked_add(count)
        .ok_or(PfcpSimError::IdentifierExhausted("session index"))?;
    Ok(base_id..end)
}

fn check_tracked(client: &PfcpClient, count: u32) -> SimResult<()> {
    let tracked = client.sessions().len();
    if count as usize > tracked {
        return Err(PfcpSimError::NotEnoughSessions {
            requested: count as usize,
            tracked,
        });
    }
    Ok(())
}

/// Rules installed at establishment for session `index`
fn build_session_rules(
    client: &PfcpClient,
    index: u32,
    ue_address: Ipv4Addr,
    params: &CreateSessionsParams,
) -> SimResult<SessionRules> {
    let ids = RuleIds::new(index)?;
    let config = client.config();
    let default_filters = [AppFilter::default()];
    let filters: &[AppFilter] = if params.app_filters.is_empty() {
        &default_filters
    } else {
        &params.app_filters
    };
    if filters.len() > MAX_APP_FILTERS {
        return Err(PfcpSimError::InvalidFormat(format!(
            "at most {MAX_APP_FILTERS} application filters per session"
        )));
    }

    let mut rules = SessionRules::default();

    let mut session_qer = QerBuilder::new()
        .with_id(ids.session_qer())
        .with_mbr(SESSION_MBR_KBPS, SESSION_MBR_KBPS);
    if let Some(qfi) = params.qfi {
        session_qer = session_qer.with_qfi(qfi);
    }
    rules.qers.push(session_qer.build()?);

    for (app, filter) in filters.iter().enumerate() {
        let mut app_qer = QerBuilder::new()
            .with_id(ids.app_qer(app))
            .with_gate_status(filter.gate_status());
        if let Some(qfi) = params.qfi {
            app_qer = app_qer.with_qfi(qfi);
        }
        rules.qers.push(app_qer.build()?);

        let mut uplink = PdrBuilder::new()
            .with_id(ids.uplink_pdr(app))
            .with_precedence(filter.precedence)
            .mark_as_uplink()
            .with_teid(ids.uplink_teid())
            .with_n3_address(config.n3_address)
            .with_far_id(ids.uplink_far())
            .add_qer_id(ids.session_qer())
            .add_qer_id(ids.app_qer(app));
        let mut downlink = PdrBuilder::new()
            .with_id(ids.downlink_pdr(app))
            .with_precedence(filter.precedence)
            .mark_as_downlink()
            .with_ue_address(ue_address)
            .with_sdf_filter(filter.flow_description())
            .with_far_id(ids.downlink_far())
            .add_qer_id(ids.session_qer())
            .add_qer_id(ids.app_qer(app));
        if let Some(qfi) = params.qfi {
            uplink = uplink.with_qfi(qfi);
        }
        if let Some(name) = &config.network_instance {
            uplink = uplink.with_network_instance(name.clone());
            downlink = downlink.with_network_instance(name.clone());
        }
        if params.with_urr {
            uplink = uplink.add_urr_id(ids.urr());
            downlink = downlink.add_urr_id(ids.urr());
        }
        rules.pdrs.push(uplink.build()?);
        rules.pdrs.push(downlink.build()?);
    }

    let mut uplink_far = FarBuilder::new()
        .with_id(ids.uplink_far())
        .mark_as_uplink()
        .with_forward(true);
    if let Some(name) = &config.network_instance {
        uplink_far = uplink_far.with_network_instance(name.clone());
    }
    rules.fars.push(uplink_far.build()?);
    // Downlink stays dropped until a modification supplies the tunnel
    rules.fars.push(
        FarBuilder::new()
            .with_id(ids.downlink_far())
            .mark_as_downlink()
            .with_drop(true)
            .build()?,
    );

    if params.with_urr {
        rules.urrs.push(
            UrrBuilder::new()
                .with_id(ids.urr())
                .with_measurement_method(MeasurementMethod { volum: true, ..Default::default() })
                .with_reporting_triggers(ReportingTriggers { volth: true, ..Default::default() })
                .with_volume_threshold(Volume::total(URR_VOLUME_THRESHOLD))
                .build()?,
        );
    }

    Ok(rules)
}

/// Establish `params.count` sessions starting at `params.base_id`, each
/// registered under its index. Returns the number established.
pub async fn create_sessions(
    client: &PfcpClient,
    pool: &mut UeAddressPool,
    params: &CreateSessionsParams,
) -> SimResult<usize> {
    let mut created = 0;
    for index in session_range(params.count, params.base_id)? {
        let ue_address = pool.next_address()?;
        let rules = build_session_rules(client, index, ue_address, params)?;
        let session = client.establish_session(rules).await?;
        log::info!(
            "Session {index} created: UE {ue_address}, SEID {:#x}/{:#x}",
            session.local_seid(),
            session.peer_seid()
        );
        if client.sessions().insert(index, session).is_some() {
            log::warn!("Session {index} replaced an existing registry entry");
        }
        created += 1;
    }
    Ok(created)
}

/// Point the downlink FAR of each session at the (g/e)NodeB, or make it
/// buffer. Returns the number modified.
pub async fn modify_sessions(client: &PfcpClient, params: &ModifySessionsParams) -> SimResult<usize> {
    check_tracked(client, params.count)?;
    let gnodeb = params.gnodeb_address.unwrap_or(client.config().gnodeb_address);

    let mut modified = 0;
    for index in session_range(params.count, params.base_id)? {
        let session = client.sessions().get(index).ok_or(PfcpSimError::NotEnoughSessions {
            requested: params.count as usize,
            tracked: client.sessions().len(),
        })?;
        let ids = RuleIds::new(index)?;

        let mut far = FarBuilder::new().with_id(ids.downlink_far()).mark_as_downlink();
        if params.buffer {
            far = far.with_buffer(true).with_notify_cp(params.notify_cp);
        } else {
            far = far
                .with_forward(true)
                .with_downlink_teid(ids.downlink_teid())
                .with_downlink_ip(gnodeb);
        }
        let update = far.clone().with_method(IeMethod::Update).build()?;
        let installed = far.build()?;

        client
            .modify_session(&session, SessionRules::new(Vec::new(), vec![update], Vec::new()))
            .await?;

        let far_id = ids.downlink_far();
        client.sessions().update(index, |s| {
            let mut fars: Vec<Ie> = s
                .fars()
                .iter()
                .filter(|f| far_id_of(f) != Some(far_id))
                .cloned()
                .collect();
            fars.push(installed);
            s.set_fars(fars);
        });
        log::info!("Session {index} modified ({})", if params.buffer { "buffering" } else { "forwarding" });
        modified += 1;
    }
    Ok(modified)
}

/// Delete `count` sessions starting at `base_id` and drop them from the
/// registry. Returns the number deleted.
pub async fn delete_sessions(client: &PfcpClient, count: u32, base_id: u32) -> SimResult<usize> {
    check_tracked(client, count)?;

    let mut deleted = 0;
    for index in session_range(count, base_id)? {
        let session = client.sessions().get(index).ok_or(PfcpSimError::NotEnoughSessions {
            requested: count as usize,
            tracked: client.sessions().len(),
        })?;
        client.delete_session(&session).await?;
        client.sessions().remove(index);
        log::info!("Session {index} deleted");
        deleted += 1;
    }
    Ok(deleted)
}

fn far_id_of(far: &Ie) -> Option<u32> {
    far.find(IeType::FarId).and_then(|id| id.as_u32().ok())
}
