//! MachineRequestSetPressure resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

/// Aggregated unmet demand on a machine request set.
///
/// Written exclusively by the pressure controller; `required_machines` is
/// the sum of all non-tearing-down demands labeled with the set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRequestSetPressure {
    pub metadata: Metadata,
    pub spec: MachineRequestSetPressureSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineRequestSetPressureSpec {
    pub required_machines: u32,
    pub required_additional_machines: u32,
}

impl_resource!(
    MachineRequestSetPressure,
    MachineRequestSetPressureSpec,
    "MachineRequestSetPressures.fleet.dev"
);
