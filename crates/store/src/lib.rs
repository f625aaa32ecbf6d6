//! Resource model and watched-store surface.
//!
//! The fleet controllers reconcile resources held in a versioned, watched
//! key/value store with labels, finalizers, and a two-phase lifecycle
//! (Running / TearingDown). This crate defines that surface:
//!
//! - the dynamic resource model ([`Metadata`], [`RawResource`]) and the typed
//!   view over it ([`Resource`]),
//! - the [`Store`] trait implemented by store backends,
//! - [`TypedClient`], the per-resource-type handle the controllers hold,
//! - an in-memory [`memory::MemoryStore`] for unit tests (feature
//!   `test-util`).
//!
//! The production backend lives outside this workspace; controllers only
//! depend on the trait.

pub mod client;
pub mod error;
pub mod labels;
pub mod metadata;
pub mod resource;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use client::TypedClient;
pub use error::StoreError;
pub use labels::{LabelQuery, LabelTerm, Labels};
pub use metadata::{Metadata, Phase, RawResource, ResourceRef, DEFAULT_NAMESPACE};
pub use resource::Resource;
pub use store::{Event, EventKind, Store};

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
