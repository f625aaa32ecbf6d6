//! Resource metadata: identity, version, lifecycle phase, finalizers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::labels::Labels;

/// Namespace used by resources that do not declare their own.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Observable lifecycle phase of a resource.
///
/// A resource in `TearingDown` can only be destroyed once every finalizer
/// has been released by its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Running,
    TearingDown,
}

impl Phase {
    pub fn is_tearing_down(&self) -> bool {
        matches!(self, Phase::TearingDown)
    }
}

/// Address of a resource: `(namespace, type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub resource_type: String,
    pub id: String,
}

impl ResourceRef {
    pub fn new(
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.resource_type, self.id)
    }
}

/// Metadata common to every stored resource.
///
/// `version` increases monotonically per key and is maintained by the store;
/// so are `phase` and `finalizers`, which callers mutate only through the
/// dedicated store operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub namespace: String,
    pub resource_type: String,
    pub id: String,
    pub version: u64,
    pub phase: Phase,
    pub finalizers: Vec<String>,
    pub labels: Labels,
    pub annotations: BTreeMap<String, String>,
    pub created: DateTime<Utc>,
}

impl Metadata {
    pub fn new(namespace: &str, resource_type: &str, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.to_owned(),
            resource_type: resource_type.to_owned(),
            id: id.into(),
            version: 0,
            phase: Phase::Running,
            finalizers: Vec::new(),
            labels: Labels::new(),
            annotations: BTreeMap::new(),
            created: Utc::now(),
        }
    }

    /// Address of this resource.
    pub fn to_ref(&self) -> ResourceRef {
        ResourceRef::new(&self.namespace, &self.resource_type, &self.id)
    }

    pub fn has_finalizer(&self, name: &str) -> bool {
        self.finalizers.iter().any(|f| f == name)
    }

    pub(crate) fn add_finalizer(&mut self, name: &str) -> bool {
        if self.has_finalizer(name) {
            return false;
        }
        self.finalizers.push(name.to_owned());
        true
    }

    pub(crate) fn remove_finalizer(&mut self, name: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != name);
        self.finalizers.len() != before
    }
}

/// Dynamic representation of a stored resource: metadata plus the spec as a
/// JSON payload. Typed views convert through [`crate::Resource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResource {
    pub metadata: Metadata,
    pub spec: serde_json::Value,
}
