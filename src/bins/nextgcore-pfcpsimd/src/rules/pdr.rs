//! Packet Detection Rule builder

use std::net::Ipv4Addr;

use ogs_pfcp::ie::{Ie, IeType};
use ogs_pfcp::types::{FTeid, OuterHeaderRemoval, SourceInterface, UeIpAddress};

use super::{wrap, Direction, IeMethod, RuleIeTypes};
use crate::error::RuleError;

/// Builder for Create/Update/Remove PDR
#[derive(Debug, Clone, Default)]
pub struct PdrBuilder {
    method: IeMethod,
    id: Option<u16>,
    precedence: u32,
    direction: Option<Direction>,
    teid: u32,
    n3_address: Option<Ipv4Addr>,
    ue_address: Option<Ipv4Addr>,
    sdf_filter: Option<String>,
    qfi: Option<u8>,
    network_instance: Option<String>,
    far_id: Option<u32>,
    qer_ids: Vec<u32>,
    urr_ids: Vec<u32>,
}

impl PdrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: IeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_id(mut self, id: u16) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_precedence(mut self, precedence: u32) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn mark_as_uplink(mut self) -> Self {
        self.direction = Some(Direction::Uplink);
        self
    }

    pub fn mark_as_downlink(mut self) -> Self {
        self.direction = Some(Direction::Downlink);
        self
    }

    /// Uplink tunnel endpoint on the UPF
    pub fn with_teid(mut self, teid: u32) -> Self {
        self.teid = teid;
        self
    }

    pub fn with_n3_address(mut self, addr: Ipv4Addr) -> Self {
        self.n3_address = Some(addr);
        self
    }

    pub fn with_ue_address(mut self, addr: Ipv4Addr) -> Self {
        self.ue_address = Some(addr);
        self
    }

    pub fn with_sdf_filter(mut self, flow_description: impl Into<String>) -> Self {
        self.sdf_filter = Some(flow_description.into());
        self
    }

    pub fn with_qfi(mut self, qfi: u8) -> Self {
        self.qfi = Some(qfi);
        self
    }

    pub fn with_network_instance(mut self, name: impl Into<String>) -> Self {
        self.network_instance = Some(name.into());
        self
    }

    pub fn with_far_id(mut self, far_id: u32) -> Self {
        self.far_id = Some(far_id);
        self
    }

    pub fn add_qer_id(mut self, qer_id: u32) -> Self {
        self.qer_ids.push(qer_id);
        self
    }

    pub fn add_urr_id(mut self, urr_id: u32) -> Self {
        self.urr_ids.push(urr_id);
        self
    }

    pub fn build(&self) -> Result<Ie, RuleError> {
        let pdr_id = self.id.ok_or(RuleError::MissingId { rule: "PDR" })?;
        let direction = self.direction.ok_or(RuleError::MissingDirection)?;
        let far_id = self.far_id.ok_or(RuleError::MissingFarId { pdr_id })?;
        if self.qer_ids.is_empty() {
            return Err(RuleError::MissingQerId { pdr_id });
        }

        let mut pdi = Vec::with_capacity(5);
        let mut outer_header_removal = None;
        match direction {
            Direction::Uplink => {
                if self.teid == 0 {
                    return Err(RuleError::MissingTeid { pdr_id });
                }
                let n3 = self
                    .n3_address
                    .filter(|addr| !addr.is_unspecified())
                    .ok_or(RuleError::MissingN3Address { pdr_id })?;
                pdi.push(SourceInterface::Access.to_ie());
                pdi.push(FTeid::new_ipv4(self.teid, n3).to_ie());
                outer_header_removal = Some(OuterHeaderRemoval::GtpuUdpIpv4.to_ie());
            }
            Direction::Downlink => {
                let ue = self
                    .ue_address
                    .filter(|addr| !addr.is_unspecified())
                    .ok_or(RuleError::MissingUeAddress { pdr_id })?;
                pdi.push(SourceInterface::Core.to_ie());
                pdi.push(UeIpAddress { addr: ue, is_destination: true }.to_ie());
            }
        }
        if let Some(name) = &self.network_instance {
            pdi.push(Ie::network_instance(name));
        }
        if let Some(filter) = &self.sdf_filter {
            let sdf_filter = Ie::sdf_filter(filter).map_err(|_| RuleError::SdfFilterTooLong {
                pdr_id,
                len: filter.len(),
            })?;
            pdi.push(sdf_filter);
        }
        if let Some(qfi) = self.qfi {
            pdi.push(Ie::qfi(qfi));
        }

        let mut children = vec![
            Ie::pdr_id(pdr_id),
            Ie::precedence(self.precedence),
            Ie::grouped(IeType::Pdi, pdi),
        ];
        children.extend(outer_header_removal);
        children.push(Ie::far_id(far_id));
        children.extend(self.qer_ids.iter().map(|&id| Ie::qer_id(id)));
        children.extend(self.urr_ids.iter().map(|&id| Ie::urr_id(id)));

        Ok(wrap(
            self.method,
            RuleIeTypes {
                create: IeType::CreatePdr,
                update: IeType::UpdatePdr,
                remove: IeType::RemovePdr,
            },
            children,
        ))
    }
}
