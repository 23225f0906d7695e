//! N4 Rule Builders
//!
//! Fluent builders for PDR, FAR, QER and URR IEs. Setters only record
//! values; `build()` checks the field combination and produces the
//! Create, Update or Remove form of the rule.

pub mod far;
pub mod pdr;
pub mod qer;
pub mod urr;

pub use far::FarBuilder;
pub use pdr::PdrBuilder;
pub use qer::QerBuilder;
pub use urr::UrrBuilder;

use ogs_pfcp::ie::{Ie, IeType};

/// Which variant of a rule IE to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IeMethod {
    #[default]
    Create,
    Update,
    Delete,
}

/// Traffic direction of a PDR or FAR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Uplink,
    Downlink,
}

/// Grouped IE type per method for one rule kind
pub(crate) struct RuleIeTypes {
    pub create: IeType,
    pub update: IeType,
    pub remove: IeType,
}

/// Wrap the rule's children in the grouped IE matching `method`.
///
/// Delete keeps the full create-shaped children inside the Remove IE.
pub(crate) fn wrap(method: IeMethod, types: RuleIeTypes, children: Vec<Ie>) -> Ie {
    let ie_type = match method {
        IeMethod::Create => types.create,
        IeMethod::Update => types.update,
        IeMethod::Delete => types.remove,
    };
    Ie::grouped(ie_type, children)
}
