//! Reconciliation logic for the fleet control loops.
//!
//! - `provision`: drives MachineRequests through provider provisioning steps
//! - `pressure`: aggregates machine-set demand into request-set pressure
//! - `autoscale`: derives the desired request-set size from pressure and the
//!   idle-pool policy

pub mod autoscale;
pub mod pressure;
pub mod provision;

#[cfg(test)]
mod pressure_test;

use store::{Resource, StoreError, TypedClient};

/// Outcome of a teardown attempt on an owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    /// Destroyed, or already gone.
    Done,
    /// Another owner still holds a finalizer.
    Blocked,
}

/// Tears down and destroys a resource, skipping if it is already gone.
pub(crate) async fn teardown_resource<R: Resource>(
    client: &TypedClient<R>,
    id: &str,
) -> Result<Teardown, StoreError> {
    match client.teardown(id).await {
        Ok(true) => {}
        Ok(false) => return Ok(Teardown::Blocked),
        Err(err) if err.is_not_found() => return Ok(Teardown::Done),
        Err(err) => return Err(err),
    }
    match client.destroy(id).await {
        Ok(()) => Ok(Teardown::Done),
        Err(err) if err.is_not_found() => Ok(Teardown::Done),
        Err(err) => Err(err),
    }
}
