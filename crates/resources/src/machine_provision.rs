//! MachineProvision resource.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

use crate::common::{MetaValue, Overlay};

/// User-declared auto-scaling policy for one provider.
///
/// Drives an automatically scaled MachineRequestSet of the same id: the
/// declarative fields propagate verbatim, while `idle_machine_count` and
/// `idle_machine_teardown_timeout` control how much idle capacity is kept
/// and for how long before release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineProvision {
    pub metadata: Metadata,
    pub spec: MachineProvisionSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineProvisionSpec {
    pub provider_id: String,
    pub extensions: Vec<String>,
    pub kernel_args: Vec<String>,
    pub meta_values: Vec<MetaValue>,
    pub talos_version: String,
    pub overlay: Option<Overlay>,
    /// Number of provisioned-but-unallocated machines to keep around.
    pub idle_machine_count: u32,
    /// Cooldown an idle machine must sit through before it may be released,
    /// in seconds.
    pub idle_machine_teardown_timeout_seconds: u64,
}

impl MachineProvisionSpec {
    /// The idle teardown cooldown as a [`Duration`].
    pub fn idle_machine_teardown_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_machine_teardown_timeout_seconds)
    }
}

impl_resource!(
    MachineProvision,
    MachineProvisionSpec,
    "MachineProvisions.fleet.dev"
);
