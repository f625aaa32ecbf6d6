//! In-memory store for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::labels::LabelQuery;
use crate::metadata::{Phase, RawResource, ResourceRef};
use crate::store::{Event, EventKind, Store};

const EVENT_CAPACITY: usize = 1024;

/// In-memory [`Store`] implementation.
///
/// Implements the full store contract: monotonic per-key versions,
/// label-filtered snapshot lists in id order, finalizer-gated destruction,
/// and a broadcast change feed. Used by controller unit tests in place of
/// the production backend.
pub struct MemoryStore {
    resources: Mutex<BTreeMap<ResourceRef, RawResource>>,
    events: broadcast::Sender<Event>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            resources: Mutex::new(BTreeMap::new()),
            events,
        }
    }

    fn emit(&self, kind: EventKind, resource: RawResource) {
        // no receivers is fine
        let _ = self.events.send(Event { kind, resource });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, reference: &ResourceRef) -> Result<RawResource, StoreError> {
        let resources = self.resources.lock().unwrap();
        resources
            .get(reference)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(reference.clone()))
    }

    async fn list(
        &self,
        namespace: &str,
        resource_type: &str,
        query: &LabelQuery,
    ) -> Result<Vec<RawResource>, StoreError> {
        let resources = self.resources.lock().unwrap();
        Ok(resources
            .values()
            .filter(|r| {
                r.metadata.namespace == namespace
                    && r.metadata.resource_type == resource_type
                    && query.matches(&r.metadata.labels)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, mut resource: RawResource) -> Result<RawResource, StoreError> {
        let reference = resource.metadata.to_ref();
        let mut resources = self.resources.lock().unwrap();
        if resources.contains_key(&reference) {
            return Err(StoreError::Conflict {
                reference,
                expected: 0,
            });
        }
        resource.metadata.version = 1;
        resource.metadata.phase = Phase::Running;
        resource.metadata.finalizers.clear();
        resources.insert(reference, resource.clone());
        drop(resources);
        self.emit(EventKind::Created, resource.clone());
        Ok(resource)
    }

    async fn update(
        &self,
        resource: RawResource,
        expected_version: u64,
    ) -> Result<RawResource, StoreError> {
        let reference = resource.metadata.to_ref();
        let mut resources = self.resources.lock().unwrap();
        let stored = resources
            .get_mut(&reference)
            .ok_or_else(|| StoreError::NotFound(reference.clone()))?;
        if stored.metadata.version != expected_version {
            return Err(StoreError::Conflict {
                reference,
                expected: expected_version,
            });
        }
        stored.metadata.version += 1;
        stored.metadata.labels = resource.metadata.labels;
        stored.metadata.annotations = resource.metadata.annotations;
        stored.spec = resource.spec;
        let updated = stored.clone();
        drop(resources);
        self.emit(EventKind::Updated, updated.clone());
        Ok(updated)
    }

    async fn add_finalizer(
        &self,
        reference: &ResourceRef,
        finalizer: &str,
    ) -> Result<(), StoreError> {
        let mut resources = self.resources.lock().unwrap();
        let stored = resources
            .get_mut(reference)
            .ok_or_else(|| StoreError::NotFound(reference.clone()))?;
        if !stored.metadata.add_finalizer(finalizer) {
            return Ok(());
        }
        stored.metadata.version += 1;
        let updated = stored.clone();
        drop(resources);
        self.emit(EventKind::Updated, updated);
        Ok(())
    }

    async fn remove_finalizer(
        &self,
        reference: &ResourceRef,
        finalizer: &str,
    ) -> Result<(), StoreError> {
        let mut resources = self.resources.lock().unwrap();
        let stored = resources
            .get_mut(reference)
            .ok_or_else(|| StoreError::NotFound(reference.clone()))?;
        if !stored.metadata.remove_finalizer(finalizer) {
            return Ok(());
        }
        stored.metadata.version += 1;
        let updated = stored.clone();
        drop(resources);
        self.emit(EventKind::Updated, updated);
        Ok(())
    }

    async fn teardown(&self, reference: &ResourceRef) -> Result<bool, StoreError> {
        let mut resources = self.resources.lock().unwrap();
        let stored = resources
            .get_mut(reference)
            .ok_or_else(|| StoreError::NotFound(reference.clone()))?;
        let ready = stored.metadata.finalizers.is_empty();
        if stored.metadata.phase.is_tearing_down() {
            return Ok(ready);
        }
        stored.metadata.phase = Phase::TearingDown;
        stored.metadata.version += 1;
        let updated = stored.clone();
        drop(resources);
        self.emit(EventKind::TearingDown, updated);
        Ok(ready)
    }

    async fn destroy(&self, reference: &ResourceRef) -> Result<(), StoreError> {
        let mut resources = self.resources.lock().unwrap();
        let stored = resources
            .get(reference)
            .ok_or_else(|| StoreError::NotFound(reference.clone()))?;
        if !stored.metadata.phase.is_tearing_down() {
            return Err(StoreError::FailedPrecondition {
                reference: reference.clone(),
                reason: "resource is not tearing down".to_owned(),
            });
        }
        if !stored.metadata.finalizers.is_empty() {
            return Err(StoreError::FailedPrecondition {
                reference: reference.clone(),
                reason: format!("finalizers remain: {}", stored.metadata.finalizers.join(", ")),
            });
        }
        if let Some(removed) = resources.remove(reference) {
            drop(resources);
            self.emit(EventKind::Destroyed, removed);
        }
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::client::TypedClient;
    use crate::impl_resource;
    use crate::metadata::Metadata;
    use crate::resource::Resource;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct WidgetSpec {
        size: u32,
    }

    #[derive(Debug, Clone)]
    struct Widget {
        metadata: Metadata,
        spec: WidgetSpec,
    }

    impl_resource!(Widget, WidgetSpec, "Widgets.test");

    fn client(store: &Arc<MemoryStore>) -> TypedClient<Widget> {
        TypedClient::new(Arc::clone(store) as Arc<dyn Store>)
    }

    #[tokio::test]
    async fn test_versions_increase_monotonically() {
        let store = Arc::new(MemoryStore::new());
        let widgets = client(&store);

        let created = widgets.modify("w1", |w| w.spec.size = 1).await.unwrap();
        assert_eq!(created.metadata.version, 1);

        let updated = widgets.modify("w1", |w| w.spec.size = 2).await.unwrap();
        assert_eq!(updated.metadata.version, 2);
        assert_eq!(updated.spec.size, 2);
    }

    #[tokio::test]
    async fn test_update_conflicts_on_stale_version() {
        let store = Arc::new(MemoryStore::new());
        let widgets = client(&store);

        let created = widgets.modify("w1", |w| w.spec.size = 1).await.unwrap();
        // concurrent writer bumps the version
        widgets.modify("w1", |w| w.spec.size = 5).await.unwrap();

        let err = store
            .update(created.to_raw().unwrap(), created.metadata.version)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_destroy_gated_on_phase_and_finalizers() {
        let store = Arc::new(MemoryStore::new());
        let widgets = client(&store);

        widgets.modify("w1", |w| w.spec.size = 1).await.unwrap();
        widgets.add_finalizer("w1", "owner").await.unwrap();

        // Running resources cannot be destroyed
        assert!(matches!(
            widgets.destroy("w1").await,
            Err(StoreError::FailedPrecondition { .. })
        ));

        // teardown reports not-ready while the finalizer is held
        assert!(!widgets.teardown("w1").await.unwrap());
        assert!(matches!(
            widgets.destroy("w1").await,
            Err(StoreError::FailedPrecondition { .. })
        ));

        widgets.remove_finalizer("w1", "owner").await.unwrap();
        assert!(widgets.teardown("w1").await.unwrap());
        widgets.destroy("w1").await.unwrap();
        assert!(widgets.get_opt("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_label() {
        let store = Arc::new(MemoryStore::new());
        let widgets = client(&store);

        widgets
            .modify("a", |w| w.metadata.labels.set("group", "g1"))
            .await
            .unwrap();
        widgets
            .modify("b", |w| w.metadata.labels.set("group", "g2"))
            .await
            .unwrap();
        widgets
            .modify("c", |w| w.metadata.labels.set("group", "g1"))
            .await
            .unwrap();

        let g1 = widgets
            .list(&LabelQuery::new().eq("group", "g1"))
            .await
            .unwrap();
        let ids: Vec<_> = g1.iter().map(|w| w.metadata.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_watch_observes_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let widgets = client(&store);
        let mut events = store.watch();

        widgets.modify("w1", |w| w.spec.size = 1).await.unwrap();
        widgets.teardown("w1").await.unwrap();
        widgets.destroy("w1").await.unwrap();

        let kinds: Vec<EventKind> = [
            events.recv().await.unwrap().kind,
            events.recv().await.unwrap().kind,
            events.recv().await.unwrap().kind,
        ]
        .into();
        assert_eq!(
            kinds,
            vec![
                EventKind::Created,
                EventKind::TearingDown,
                EventKind::Destroyed
            ]
        );
    }
}
