//! MachineRequestStatus resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

/// Observable outcome of provisioning one machine request.
///
/// Written exclusively by the provision controller. Labels mirror the
/// request's labels once provisioning succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRequestStatus {
    pub metadata: Metadata,
    pub spec: MachineRequestStatusSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineRequestStatusSpec {
    pub stage: ProvisionStage,
    /// Message of the last failed provisioning step; empty if none failed.
    pub error: String,
}

/// Provisioning stage of a machine request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ProvisionStage {
    #[default]
    Unknown = 0,
    Provisioning = 1,
    Provisioned = 2,
    Failed = 3,
}

impl_resource!(
    MachineRequestStatus,
    MachineRequestStatusSpec,
    "MachineRequestStatuses.fleet.dev"
);
