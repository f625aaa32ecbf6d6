//! Cluster membership carriers consumed by the config patch lookup.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

/// A machine allocated into a cluster. Carries the `cluster` label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMachine {
    pub metadata: Metadata,
    pub spec: ClusterMachineSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMachineSpec {}

impl_resource!(ClusterMachine, ClusterMachineSpec, "ClusterMachines.fleet.dev");

/// A group of cluster machines sharing one role and config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSet {
    pub metadata: Metadata,
    pub spec: MachineSetSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetSpec {}

impl_resource!(MachineSet, MachineSetSpec, "MachineSets.fleet.dev");
