//! Typed per-resource store handles.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::StoreError;
use crate::labels::LabelQuery;
use crate::metadata::ResourceRef;
use crate::resource::Resource;
use crate::store::Store;

/// Typed view over the store for one resource type, addressed in that type's
/// default namespace. Controllers hold one handle per resource type they
/// read or write.
pub struct TypedClient<R: Resource> {
    store: Arc<dyn Store>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Clone for TypedClient<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> TypedClient<R> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    fn reference(id: &str) -> ResourceRef {
        R::store_ref(id)
    }

    pub async fn get(&self, id: &str) -> Result<R, StoreError> {
        let raw = self.store.get(&Self::reference(id)).await?;
        R::from_raw(&raw)
    }

    /// Like [`TypedClient::get`], mapping `NotFound` to `None`.
    pub async fn get_opt(&self, id: &str) -> Result<Option<R>, StoreError> {
        match self.store.get(&Self::reference(id)).await {
            Ok(raw) => Ok(Some(R::from_raw(&raw)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Label-filtered snapshot of all resources of this type, in store order.
    pub async fn list(&self, query: &LabelQuery) -> Result<Vec<R>, StoreError> {
        let raw = self
            .store
            .list(R::default_namespace(), R::TYPE, query)
            .await?;
        raw.iter().map(R::from_raw).collect()
    }

    /// Creates the resource if absent (default spec), applies `f`, and writes
    /// the result back, retrying the optimistic version check on conflict.
    /// Returns the stored resource.
    pub async fn modify<F>(&self, id: &str, mut f: F) -> Result<R, StoreError>
    where
        F: FnMut(&mut R) + Send,
    {
        loop {
            match self.store.get(&Self::reference(id)).await {
                Ok(raw) => {
                    let expected = raw.metadata.version;
                    let mut resource = R::from_raw(&raw)?;
                    f(&mut resource);
                    match self.store.update(resource.to_raw()?, expected).await {
                        Ok(stored) => return R::from_raw(&stored),
                        Err(err) if err.is_conflict() => continue,
                        Err(err) => return Err(err),
                    }
                }
                Err(err) if err.is_not_found() => {
                    let mut resource = R::new(id);
                    f(&mut resource);
                    match self.store.create(resource.to_raw()?).await {
                        Ok(stored) => return R::from_raw(&stored),
                        // lost a create race, go through the update path
                        Err(err) if err.is_conflict() => continue,
                        Err(err) => return Err(err),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn add_finalizer(&self, id: &str, finalizer: &str) -> Result<(), StoreError> {
        self.store
            .add_finalizer(&Self::reference(id), finalizer)
            .await
    }

    pub async fn remove_finalizer(&self, id: &str, finalizer: &str) -> Result<(), StoreError> {
        self.store
            .remove_finalizer(&Self::reference(id), finalizer)
            .await
    }

    /// See [`Store::teardown`].
    pub async fn teardown(&self, id: &str) -> Result<bool, StoreError> {
        self.store.teardown(&Self::reference(id)).await
    }

    /// See [`Store::destroy`].
    pub async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        self.store.destroy(&Self::reference(id)).await
    }
}
