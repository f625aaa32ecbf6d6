//! ConnectionParams resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

/// Well-known id of the singleton ConnectionParams resource.
pub const CONNECTION_PARAMS_ID: &str = "current";

/// Management-plane connection arguments handed to provisioning steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub metadata: Metadata,
    pub spec: ConnectionParamsSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParamsSpec {
    /// Base kernel arguments for joining the management plane.
    pub join_args: String,
}

impl ConnectionParams {
    /// Connection arguments for machines managed by the given provider.
    pub fn args_for_provider(&self, provider_id: &str) -> String {
        if self.spec.join_args.is_empty() {
            return format!("fleet.provider={provider_id}");
        }
        format!("{} fleet.provider={provider_id}", self.spec.join_args)
    }
}

impl_resource!(
    ConnectionParams,
    ConnectionParamsSpec,
    "ConnectionParams.fleet.dev"
);
