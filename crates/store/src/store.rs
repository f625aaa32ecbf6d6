//! The watched-store trait implemented by store backends.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::labels::LabelQuery;
use crate::metadata::{RawResource, ResourceRef};

/// Kind of change carried by a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Updated,
    TearingDown,
    Destroyed,
}

/// A change notification. `resource` is a snapshot of the resource after the
/// change (for `Destroyed`, its last observed state).
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub resource: RawResource,
}

impl Event {
    /// Address of the changed resource.
    pub fn to_ref(&self) -> ResourceRef {
        self.resource.metadata.to_ref()
    }
}

/// Versioned, watched key/value store with labels, finalizers, and a
/// two-phase lifecycle.
///
/// Guarantees expected from implementations:
///
/// - versions increase monotonically per key; `update` fails with
///   [`StoreError::Conflict`] when the expected version is stale;
/// - `list` returns a consistent snapshot in stable id order;
/// - `destroy` is permitted only for resources that are `TearingDown` with
///   no remaining finalizers;
/// - every mutation is observable on the watch feed, including finalizer
///   changes (teardown readiness is signalled by the finalizer-removal
///   event that empties the set).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get(&self, reference: &ResourceRef) -> Result<RawResource, StoreError>;

    async fn list(
        &self,
        namespace: &str,
        resource_type: &str,
        query: &LabelQuery,
    ) -> Result<Vec<RawResource>, StoreError>;

    /// Stores a new resource. Fails with [`StoreError::Conflict`] if the key
    /// already exists.
    async fn create(&self, resource: RawResource) -> Result<RawResource, StoreError>;

    /// Replaces spec, labels, and annotations of an existing resource.
    /// Phase, finalizers, and creation time are store-maintained and kept.
    async fn update(
        &self,
        resource: RawResource,
        expected_version: u64,
    ) -> Result<RawResource, StoreError>;

    /// Adds a named hold preventing destruction. Idempotent.
    async fn add_finalizer(
        &self,
        reference: &ResourceRef,
        finalizer: &str,
    ) -> Result<(), StoreError>;

    /// Releases a named hold. Idempotent.
    async fn remove_finalizer(
        &self,
        reference: &ResourceRef,
        finalizer: &str,
    ) -> Result<(), StoreError>;

    /// Moves the resource into `TearingDown` and reports whether it is ready
    /// to be destroyed (no finalizers remain). Idempotent.
    async fn teardown(&self, reference: &ResourceRef) -> Result<bool, StoreError>;

    /// Removes a teardown-ready resource.
    async fn destroy(&self, reference: &ResourceRef) -> Result<(), StoreError>;

    /// Subscribes to the change feed.
    fn watch(&self) -> broadcast::Receiver<Event>;
}
