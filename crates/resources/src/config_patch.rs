//! ConfigPatch resource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use store::{impl_resource, Metadata};

/// A machine configuration patch.
///
/// Applicability is carried entirely by labels: `cluster`, `machine-set`,
/// `cluster-machine`, `machine`, `machine-class`, and
/// `cluster-machine-class-patch` select which machines the patch applies
/// to and at which precedence level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub metadata: Metadata,
    pub spec: ConfigPatchSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatchSpec {
    /// Patch payload, applied to the rendered machine config.
    pub data: String,
}

impl_resource!(ConfigPatch, ConfigPatchSpec, "ConfigPatches.fleet.dev");
