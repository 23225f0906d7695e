//! Forwarding Action Rule builder

use std::net::Ipv4Addr;

use ogs_pfcp::ie::{Ie, IeType};
use ogs_pfcp::types::{ApplyAction, DestinationInterface, OuterHeaderCreation};

use super::{wrap, Direction, IeMethod, RuleIeTypes};
use crate::error::RuleError;

/// Builder for Create/Update/Remove FAR
#[derive(Debug, Clone)]
pub struct FarBuilder {
    method: IeMethod,
    id: Option<u32>,
    direction: Direction,
    action: ApplyAction,
    downlink_teid: Option<u32>,
    downlink_ip: Option<Ipv4Addr>,
    network_instance: Option<String>,
}

impl Default for FarBuilder {
    fn default() -> Self {
        Self {
            method: IeMethod::Create,
            id: None,
            direction: Direction::Uplink,
            action: ApplyAction::default(),
            downlink_teid: None,
            downlink_ip: None,
            network_instance: None,
        }
    }
}

impl FarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: IeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn mark_as_uplink(mut self) -> Self {
        self.direction = Direction::Uplink;
        self
    }

    pub fn mark_as_downlink(mut self) -> Self {
        self.direction = Direction::Downlink;
        self
    }

    pub fn with_forward(mut self, forward: bool) -> Self {
        self.action.forw = forward;
        self
    }

    pub fn with_drop(mut self, drop: bool) -> Self {
        self.action.drop = drop;
        self
    }

    pub fn with_buffer(mut self, buffer: bool) -> Self {
        self.action.buff = buffer;
        self
    }

    pub fn with_notify_cp(mut self, notify: bool) -> Self {
        self.action.nocp = notify;
        self
    }

    /// Apply Action bits as a whole
    pub fn with_action(mut self, bits: u8) -> Self {
        self.action = ApplyAction::from_bits(bits);
        self
    }

    /// (g/e)NodeB tunnel endpoint for downlink traffic
    pub fn with_downlink_teid(mut self, teid: u32) -> Self {
        self.downlink_teid = Some(teid);
        self
    }

    pub fn with_downlink_ip(mut self, addr: Ipv4Addr) -> Self {
        self.downlink_ip = Some(addr);
        self
    }

    pub fn with_network_instance(mut self, name: impl Into<String>) -> Self {
        self.network_instance = Some(name.into());
        self
    }

    pub fn build(&self) -> Result<Ie, RuleError> {
        let far_id = self.id.ok_or(RuleError::MissingId { rule: "FAR" })?;
        if self.action.forw && self.action.drop {
            return Err(RuleError::ForwardAndDrop { far_id });
        }
        if !self.action.forw && !self.action.drop && !self.action.buff {
            return Err(RuleError::NoAction { far_id });
        }
        let tunnel = match (self.downlink_teid, self.downlink_ip) {
            (Some(teid), Some(ipv4)) => Some(OuterHeaderCreation { teid, ipv4 }),
            (None, None) => None,
            _ => return Err(RuleError::IncompleteTunnel { far_id }),
        };

        let mut children = vec![Ie::far_id(far_id), self.action.to_ie()];
        if self.action.forw {
            let destination = match self.direction {
                Direction::Uplink => DestinationInterface::Core,
                Direction::Downlink => DestinationInterface::Access,
            };
            let mut params = vec![destination.to_ie()];
            if let Some(name) = &self.network_instance {
                params.push(Ie::network_instance(name));
            }
            if let Some(ohc) = tunnel {
                params.push(ohc.to_ie());
            }
            let params_type = match self.method {
                IeMethod::Update => IeType::UpdateForwardingParameters,
                IeMethod::Create | IeMethod::Delete => IeType::ForwardingParameters,
            };
            children.push(Ie::grouped(params_type, params));
        }

        Ok(wrap(
            self.method,
            RuleIeTypes {
                create: IeType::CreateFar,
                update: IeType::UpdateFar,
                remove: IeType::RemoveFar,
            },
            children,
        ))
    }
}
