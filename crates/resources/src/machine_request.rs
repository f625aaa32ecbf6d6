//! MachineRequest resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

use crate::common::{MetaValue, Overlay};

/// Request to materialize one backing machine with a provider.
///
/// Created by the machine-request-set fan-out; reconciled by the provision
/// controller, which holds a finalizer on it for the full provisioning
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRequest {
    pub metadata: Metadata,
    pub spec: MachineRequestSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineRequestSpec {
    pub talos_version: String,
    pub extensions: Vec<String>,
    pub kernel_args: Vec<String>,
    pub meta_values: Vec<MetaValue>,
    pub overlay: Option<Overlay>,
    /// Opaque provider-specific payload, interpreted by the provisioner.
    pub provider_data: String,
}

impl_resource!(
    MachineRequest,
    MachineRequestSpec,
    "MachineRequests.fleet.dev"
);
