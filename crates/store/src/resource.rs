//! Typed resource views over the dynamic store representation.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::metadata::{Metadata, RawResource, ResourceRef, DEFAULT_NAMESPACE};

/// A typed resource: metadata plus a strongly-typed spec.
///
/// `Spec: Default` provides the empty-but-valid value a resource is created
/// with when a controller materializes it for the first time.
pub trait Resource: Clone + Send + Sync + Sized + 'static {
    type Spec: Serialize + DeserializeOwned + Clone + Default + Send + Sync;

    /// Stable type name, unique across the store.
    const TYPE: &'static str;

    /// Namespace this resource type lives in unless addressed explicitly.
    fn default_namespace() -> &'static str {
        DEFAULT_NAMESPACE
    }

    /// New resource with the given id and a default spec.
    fn new(id: impl Into<String>) -> Self;

    fn from_parts(metadata: Metadata, spec: Self::Spec) -> Self;

    fn metadata(&self) -> &Metadata;
    fn metadata_mut(&mut self) -> &mut Metadata;
    fn spec(&self) -> &Self::Spec;
    fn spec_mut(&mut self) -> &mut Self::Spec;

    /// Address of a resource of this type in its default namespace.
    fn store_ref(id: &str) -> ResourceRef {
        ResourceRef::new(Self::default_namespace(), Self::TYPE, id)
    }

    fn to_raw(&self) -> Result<RawResource, StoreError> {
        Ok(RawResource {
            metadata: self.metadata().clone(),
            spec: serde_json::to_value(self.spec())?,
        })
    }

    fn from_raw(raw: &RawResource) -> Result<Self, StoreError> {
        if raw.metadata.resource_type != Self::TYPE {
            return Err(StoreError::Internal(format!(
                "resource type mismatch: expected {}, got {}",
                Self::TYPE,
                raw.metadata.resource_type
            )));
        }
        let spec = serde_json::from_value(raw.spec.clone())?;
        Ok(Self::from_parts(raw.metadata.clone(), spec))
    }
}

/// Implements [`Resource`] for a `{ metadata, spec }` struct.
///
/// ```ignore
/// impl_resource!(MachineRequest, MachineRequestSpec, "MachineRequests.fleet.dev");
/// ```
///
/// An optional fourth argument overrides the default namespace.
#[macro_export]
macro_rules! impl_resource {
    ($name:ident, $spec:ty, $type_str:expr) => {
        $crate::impl_resource!($name, $spec, $type_str, $crate::DEFAULT_NAMESPACE);
    };
    ($name:ident, $spec:ty, $type_str:expr, $namespace:expr) => {
        impl $crate::Resource for $name {
            type Spec = $spec;

            const TYPE: &'static str = $type_str;

            fn default_namespace() -> &'static str {
                $namespace
            }

            fn new(id: impl Into<String>) -> Self {
                Self {
                    metadata: $crate::Metadata::new(Self::default_namespace(), Self::TYPE, id),
                    spec: <$spec as Default>::default(),
                }
            }

            fn from_parts(metadata: $crate::Metadata, spec: Self::Spec) -> Self {
                Self { metadata, spec }
            }

            fn metadata(&self) -> &$crate::Metadata {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut $crate::Metadata {
                &mut self.metadata
            }

            fn spec(&self) -> &Self::Spec {
                &self.spec
            }

            fn spec_mut(&mut self) -> &mut Self::Spec {
                &mut self.spec
            }
        }
    };
}
