//! QoS Enforcement Rule builder

use ogs_pfcp::ie::{Ie, IeType};
use ogs_pfcp::types::{Bitrate, GateStatus};

use super::{wrap, IeMethod, RuleIeTypes};
use crate::error::RuleError;

/// Builder for Create/Update/Remove QER
#[derive(Debug, Clone, Default)]
pub struct QerBuilder {
    method: IeMethod,
    id: Option<u32>,
    qfi: Option<u8>,
    mbr: Option<Bitrate>,
    gbr: Option<Bitrate>,
    gate: GateStatus,
}

impl QerBuilder {
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

    pub fn with_qfi(mut self, qfi: u8) -> Self {
        self.qfi = Some(qfi);
        self
    }

    /// Maximum bitrate in kbps
    pub fn with_mbr(mut self, uplink: u64, downlink: u64) -> Self {
        self.mbr = Some(Bitrate::new(uplink, downlink));
        self
    }

    /// Guaranteed bitrate in kbps
    pub fn with_gbr(mut self, uplink: u64, downlink: u64) -> Self {
        self.gbr = Some(Bitrate::new(uplink, downlink));
        self
    }

    pub fn with_gate_status(mut self, gate: GateStatus) -> Self {
        self.gate = gate;
        self
    }

    pub fn build(&self) -> Result<Ie, RuleError> {
        let qer_id = self.id.ok_or(RuleError::MissingId { rule: "QER" })?;

        let mut children = vec![Ie::qer_id(qer_id), self.gate.to_ie()];
        if let Some(mbr) = self.mbr {
            children.push(mbr.to_mbr_ie());
        }
        if let Some(gbr) = self.gbr {
            children.push(gbr.to_gbr_ie());
        }
        if let Some(qfi) = self.qfi {
            children.push(Ie::qfi(qfi));
        }

        Ok(wrap(
            self.method,
            RuleIeTypes {
                create: IeType::CreateQer,
                update: IeType::UpdateQer,
                remove: IeType::RemoveQer,
            },
            children,
        ))
    }
}
