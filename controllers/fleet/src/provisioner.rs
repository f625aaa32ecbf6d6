//! The provisioner plug-in contract.
//!
//! A provider integrates by implementing [`Provisioner`]: an ordered list of
//! named [`Step`]s that advance a machine request towards a provisioned
//! machine, and a deprovision hook invoked on teardown. The provision
//! controller persists the name of the step it is about to run on the
//! provider resource, so a restarted controller resumes from there instead
//! of replaying the whole pipeline.

use std::any::Any;

use async_trait::async_trait;

use resources::{MachineRequest, MachineRequestStatus};
use store::Resource;

/// Opaque handle on the image factory.
///
/// The engine never calls into it; provisioners that know their concrete
/// factory client recover it through [`FactoryClient::as_any`].
pub trait FactoryClient: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Everything a provisioning step may read or mutate.
///
/// Mutations of `status` and `resource` are persisted by the provision
/// controller after the step returns successfully.
pub struct ProvisionContext<'a, T: Resource> {
    pub machine_request: &'a MachineRequest,
    pub status: &'a mut MachineRequestStatus,
    pub resource: &'a mut T,
    /// Connection arguments for joining the management plane.
    pub connection_args: &'a str,
    pub factory: &'a dyn FactoryClient,
}

/// A named unit of provisioning work.
///
/// Steps must be idempotent: re-running against the same provider resource
/// with the same inputs converges. A step whose annotation was persisted but
/// whose work did not complete will be re-run after a crash.
#[async_trait]
pub trait Step<T: Resource>: Send + Sync {
    /// Stable name, unique within the provisioner's step list. Renaming a
    /// step loses resume progress: requests stamped with the old name
    /// restart from the first step.
    fn name(&self) -> &str;

    async fn run(&self, ctx: &mut ProvisionContext<'_, T>) -> anyhow::Result<()>;
}

/// A provider's provisioning pipeline.
#[async_trait]
pub trait Provisioner<T: Resource>: Send + Sync {
    /// The ordered steps of the pipeline.
    fn provision_steps(&self) -> Vec<Box<dyn Step<T>>>;

    /// Releases provider-side resources of a request being torn down.
    /// `resource` is the last observed provider resource, loaded before its
    /// store representation was destroyed.
    async fn deprovision(&self, resource: &T, request: &MachineRequest) -> anyhow::Result<()>;
}
