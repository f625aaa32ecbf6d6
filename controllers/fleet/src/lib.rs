//! Fleet reconciliation controllers.
//!
//! Three coupled control loops drive the machine fleet:
//! - the provision controller advances each MachineRequest through a
//!   provider's ordered, resumable provisioning steps and deprovisions on
//!   teardown;
//! - the pressure controller aggregates per-machine-set demand into a
//!   machine-request-set pressure signal;
//! - the auto-scale controller reconciles the desired request-set size from
//!   pressure and the idle-pool policy, with cooldowns before scaling down.
//!
//! Controllers implement [`controller::QueuedController`] and are driven by
//! [`runtime::ControllerRuntime`] over the store's watch feed.

pub mod backoff;
pub mod configpatch;
pub mod controller;
pub mod error;
pub mod provisioner;
pub mod reconciler;
pub mod runtime;

#[cfg(test)]
mod test_utils;

pub use configpatch::ConfigPatchHelper;
pub use controller::{Action, ControllerSettings, Input, InputKind, Output, OutputKind, QueuedController};
pub use error::ControllerError;
pub use provisioner::{FactoryClient, ProvisionContext, Provisioner, Step};
pub use reconciler::autoscale::AutoScaleController;
pub use reconciler::pressure::PressureController;
pub use reconciler::provision::ProvisionController;
pub use runtime::ControllerRuntime;
