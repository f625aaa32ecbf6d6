//! MachineSetRequiredMachines resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

/// Demand signal published by an external machine-set controller, labeled
/// with the machine request set it draws from
/// ([`crate::LABEL_MACHINE_REQUEST_SET`]).
///
/// The pressure controller aggregates these and holds a finalizer on every
/// demand it has counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSetRequiredMachines {
    pub metadata: Metadata,
    pub spec: MachineSetRequiredMachinesSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetRequiredMachinesSpec {
    pub required_additional_machines: u32,
}

impl_resource!(
    MachineSetRequiredMachines,
    MachineSetRequiredMachinesSpec,
    "MachineSetRequiredMachines.fleet.dev"
);
