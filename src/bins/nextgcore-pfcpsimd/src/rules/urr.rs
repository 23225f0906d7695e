//! Usage Reporting Rule builder

use ogs_pfcp::ie::{Ie, IeType};
use ogs_pfcp::types::{measurement_information, MeasurementMethod, ReportingTriggers, Volume};

use super::{wrap, IeMethod, RuleIeTypes};
use crate::error::RuleError;

/// Builder for Create/Update/Remove URR. Every field but the ID is optional
/// and left out of the IE when unset.
#[derive(Debug, Clone, Default)]
pub struct UrrBuilder {
    method: IeMethod,
    id: Option<u32>,
    measurement_method: Option<MeasurementMethod>,
    measurement_information: Option<u8>,
    reporting_triggers: Option<ReportingTriggers>,
    measurement_period: Option<u32>,
    volume_threshold: Option<Volume>,
    volume_quota: Option<Volume>,
}

impl UrrBuilder {
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

    pub fn with_measurement_method(mut self, method: MeasurementMethod) -> Self {
        self.measurement_method = Some(method);
        self
    }

    /// Raw Measurement Information flags
    pub fn with_measurement_information(mut self, bits: u8) -> Self {
        self.measurement_information = Some(bits);
        self
    }

    pub fn with_reporting_triggers(mut self, triggers: ReportingTriggers) -> Self {
        self.reporting_triggers = Some(triggers);
        self
    }

    /// Measurement period in seconds
    pub fn with_measurement_period(mut self, seconds: u32) -> Self {
        self.measurement_period = Some(seconds);
        self
    }

    pub fn with_volume_threshold(mut self, volume: Volume) -> Self {
        self.volume_threshold = Some(volume);
        self
    }

    pub fn with_volume_quota(mut self, volume: Volume) -> Self {
        self.volume_quota = Some(volume);
        self
    }

    pub fn build(&self) -> Result<Ie, RuleError> {
        let urr_id = self.id.ok_or(RuleError::MissingId { rule: "URR" })?;
        if let Some(bits) = self.measurement_information {
            if bits & !measurement_information::MASK != 0 {
                return Err(RuleError::InvalidMeasurementInformation { urr_id, bits });
            }
        }

        let mut children = vec![Ie::urr_id(urr_id)];
        if let Some(method) = self.measurement_method {
            children.push(method.to_ie());
        }
        if let Some(triggers) = self.reporting_triggers {
            children.push(triggers.to_ie());
        }
        if let Some(period) = self.measurement_period {
            children.push(Ie::measurement_period(period));
        }
        if let Some(threshold) = self.volume_threshold {
            children.push(threshold.to_threshold_ie());
        }
        if let Some(quota) = self.volume_quota {
            children.push(quota.to_quota_ie());
        }
        if let Some(bits) = self.measurement_information {
            children.push(Ie::new_u8(IeType::MeasurementInformation, bits));
        }

        Ok(wrap(
            self.method,
            RuleIeTypes {
                create: IeType::CreateUrr,
                update: IeType::UpdateUrr,
                remove: IeType::RemoveUrr,
            },
            children,
        ))
    }
}
