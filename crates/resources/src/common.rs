//! Spec types shared between provisioning resources.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Boot overlay applied to the machine image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub name: String,
    pub image: String,
}

/// A single META partition value baked into the machine image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetaValue {
    pub key: u32,
    pub value: String,
}
