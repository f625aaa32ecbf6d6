//! MachineStatus resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

use crate::labels::LABEL_MACHINE_AVAILABLE;

/// Per-machine status carrier.
///
/// The auto-scale controller only consumes its labels:
/// [`crate::LABEL_MACHINE_REQUEST_SET`] links the machine to its pool and
/// [`crate::LABEL_MACHINE_AVAILABLE`] marks it idle and eligible for
/// release. Creation time in the metadata feeds the teardown grace period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineStatus {
    pub metadata: Metadata,
    pub spec: MachineStatusSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatusSpec {}

impl MachineStatus {
    /// True if the machine is idle and eligible for release.
    pub fn is_available(&self) -> bool {
        self.metadata.labels.contains(LABEL_MACHINE_AVAILABLE)
    }
}

impl_resource!(MachineStatus, MachineStatusSpec, "MachineStatuses.fleet.dev");
