//! MachineRequestSet resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

use crate::common::{MetaValue, Overlay};

/// Declared-size pool of machine requests for one provider.
///
/// Owned outright by the auto-scale controller, which copies the
/// declarative fields from the MachineProvision and adjusts
/// `machine_count`. A separate fan-out materializes individual
/// MachineRequests from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRequestSet {
    pub metadata: Metadata,
    pub spec: MachineRequestSetSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineRequestSetSpec {
    pub provider_id: String,
    pub extensions: Vec<String>,
    pub kernel_args: Vec<String>,
    pub meta_values: Vec<MetaValue>,
    pub talos_version: String,
    pub overlay: Option<Overlay>,
    pub machine_count: i32,
}

impl_resource!(
    MachineRequestSet,
    MachineRequestSetSpec,
    "MachineRequestSets.fleet.dev"
);
