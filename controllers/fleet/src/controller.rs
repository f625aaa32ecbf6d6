//! The queued-controller contract.
//!
//! A controller declares its inputs (which store events feed it and how they
//! map to primary keys), its outputs (which resource types it writes, and
//! whether exclusively), and a concurrency cap. The runtime turns store
//! events into `reconcile(id)` calls under those declarations.

use std::time::Duration;

use async_trait::async_trait;

use store::{Event, Resource};

use crate::error::ControllerError;

/// Terminal outcome of a successful reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Nothing more to do until the next input event.
    pub fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    /// Re-run this key after the given delay even without input events.
    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// How events on an input feed the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Events reconcile the event's own id.
    Primary,
    /// Events map through [`QueuedController::map_input`] to zero or more
    /// primary keys.
    Mapped,
    /// Mapped, but tearing-down resources are only delivered once they are
    /// ready to be destroyed (no finalizers remain).
    MappedDestroyReady,
}

/// One watched input of a controller.
#[derive(Debug, Clone)]
pub struct Input {
    pub namespace: String,
    pub resource_type: String,
    pub kind: InputKind,
    /// Restrict the input to a single resource id.
    pub id: Option<String>,
}

impl Input {
    pub fn primary<R: Resource>() -> Self {
        Self::new::<R>(InputKind::Primary)
    }

    pub fn mapped<R: Resource>() -> Self {
        Self::new::<R>(InputKind::Mapped)
    }

    pub fn mapped_destroy_ready<R: Resource>() -> Self {
        Self::new::<R>(InputKind::MappedDestroyReady)
    }

    fn new<R: Resource>(kind: InputKind) -> Self {
        Self {
            namespace: R::default_namespace().to_owned(),
            resource_type: R::TYPE.to_owned(),
            kind,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub(crate) fn matches(&self, event: &Event) -> bool {
        let metadata = &event.resource.metadata;
        metadata.resource_type == self.resource_type
            && metadata.namespace == self.namespace
            && self.id.as_deref().map_or(true, |id| id == metadata.id)
    }
}

/// Write-ownership mode of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Only this controller writes resources of the type.
    Exclusive,
    /// Multiple writers may coexist by id.
    Shared,
}

/// One declared output of a controller.
#[derive(Debug, Clone)]
pub struct Output {
    pub resource_type: String,
    pub kind: OutputKind,
}

impl Output {
    pub fn exclusive<R: Resource>() -> Self {
        Self {
            resource_type: R::TYPE.to_owned(),
            kind: OutputKind::Exclusive,
        }
    }

    pub fn shared<R: Resource>() -> Self {
        Self {
            resource_type: R::TYPE.to_owned(),
            kind: OutputKind::Shared,
        }
    }
}

/// Input/output declarations and the concurrency cap of a controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Maximum in-flight reconciles; at least 1.
    pub concurrency: usize,
}

/// A controller reconciling one primary resource type, driven by the
/// runtime with at-most-one in-flight reconcile per primary key.
///
/// Returning an error requeues the key with backoff; returning
/// [`Action::requeue`] schedules a deferred re-run.
#[async_trait]
pub trait QueuedController: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn settings(&self) -> ControllerSettings;

    /// Maps an event on a non-primary input to the primary keys to
    /// reconcile. The default fans in by id.
    fn map_input(&self, event: &Event) -> Result<Vec<String>, ControllerError> {
        Ok(vec![event.resource.metadata.id.clone()])
    }

    async fn reconcile(&self, id: &str) -> Result<Action, ControllerError>;
}
