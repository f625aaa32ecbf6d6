//! Auto-scale controller: reconciles the desired machine-request-set size
//! from pressure and the idle-pool policy.
//!
//! Scale-up is eager: a pressure increase raises the machine count within
//! one reconcile. Scale-down is patient: an idle machine is only released
//! after the policy's idle teardown timeout plus a creation grace period,
//! tracked in an in-process cooldown map that resets on restart.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use resources::{
    MachineProvision, MachineRequestSet, MachineRequestSetPressure, MachineStatus,
    LABEL_MACHINE_REQUEST_SET,
};
use store::{Event, LabelQuery, Resource, Store, TypedClient};

use crate::controller::{Action, ControllerSettings, Input, Output, QueuedController};
use crate::error::ControllerError;
use crate::reconciler::{teardown_resource, Teardown};

const AUTO_SCALE_CONTROLLER_NAME: &str = "MachineProvisionController";

/// Floor on how young a machine must be before it may be released.
const TEARDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// How often pending scale-downs are re-examined.
const SCALE_DOWN_RECHECK: Duration = Duration::from_secs(30);

const CLEANUP_RETRY: Duration = Duration::from_secs(5);

/// Reconciles a MachineProvision policy into its MachineRequestSet.
pub struct AutoScaleController {
    provisions: TypedClient<MachineProvision>,
    request_sets: TypedClient<MachineRequestSet>,
    pressures: TypedClient<MachineRequestSetPressure>,
    machines: TypedClient<MachineStatus>,
    /// Per request set: earliest wall-clock time each idle machine becomes
    /// eligible for release. In-process only; restarts reset cooldowns.
    delete_at: Mutex<HashMap<String, HashMap<String, DateTime<Utc>>>>,
}

impl AutoScaleController {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            provisions: TypedClient::new(Arc::clone(&store)),
            request_sets: TypedClient::new(Arc::clone(&store)),
            pressures: TypedClient::new(Arc::clone(&store)),
            machines: TypedClient::new(store),
            delete_at: Mutex::new(HashMap::new()),
        }
    }

    /// Walks the machines of one request set: counts idle capacity, matures
    /// cooldown deadlines, schedules new ones, and sweeps entries of
    /// machines that vanished from the listing.
    ///
    /// Returns `(idle_machines, ready_to_delete)`.
    fn walk_idle_machines(
        &self,
        id: &str,
        machines: &[MachineStatus],
        idle_teardown_timeout: Duration,
        now: DateTime<Utc>,
    ) -> (i64, i64) {
        let grace_period = chrono::Duration::seconds(TEARDOWN_GRACE_PERIOD.as_secs() as i64);
        // out-of-range policy values degrade to a ten-year cooldown
        let idle_timeout = chrono::Duration::from_std(idle_teardown_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(3650));

        let mut all = self.delete_at.lock().unwrap();
        let delete_at = all.entry(id.to_owned()).or_default();

        let mut idle_machines: i64 = 0;
        let mut ready_to_delete: i64 = 0;

        for machine in machines {
            let machine_id = machine.metadata.id.as_str();

            if !machine.is_available() {
                // back in use, cancel any pending release
                delete_at.remove(machine_id);
                continue;
            }

            idle_machines += 1;

            match delete_at.get(machine_id) {
                Some(deadline) if now > *deadline => {
                    ready_to_delete += 1;
                    delete_at.remove(machine_id);
                }
                // still cooling down; the deadline stands
                Some(_) => {}
                None => {
                    let age = now - machine.metadata.created;
                    let grace = (grace_period - age).max(chrono::Duration::zero());
                    delete_at.insert(machine_id.to_owned(), now + idle_timeout + grace);
                }
            }
        }

        let listed: HashSet<&str> = machines
            .iter()
            .map(|machine| machine.metadata.id.as_str())
            .collect();
        delete_at.retain(|machine_id, _| listed.contains(machine_id.as_str()));

        (idle_machines, ready_to_delete)
    }

    /// Drops the request set of a destroyed or tearing-down provision.
    async fn cleanup(&self, id: &str) -> Result<Action, ControllerError> {
        self.delete_at.lock().unwrap().remove(id);

        match teardown_resource(&self.request_sets, id).await? {
            Teardown::Blocked => Ok(Action::requeue(CLEANUP_RETRY)),
            Teardown::Done => {
                info!(
                    "{}: removed machine request set {}",
                    AUTO_SCALE_CONTROLLER_NAME, id
                );
                Ok(Action::done())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn scheduled_deletions(&self, id: &str) -> usize {
        self.delete_at
            .lock()
            .unwrap()
            .get(id)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl QueuedController for AutoScaleController {
    fn name(&self) -> &str {
        AUTO_SCALE_CONTROLLER_NAME
    }

    fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            inputs: vec![
                Input::primary::<MachineProvision>(),
                Input::mapped::<MachineRequestSetPressure>(),
                Input::mapped::<MachineStatus>(),
            ],
            outputs: vec![Output::exclusive::<MachineRequestSet>()],
            concurrency: 4,
        }
    }

    fn map_input(&self, event: &Event) -> Result<Vec<String>, ControllerError> {
        let metadata = &event.resource.metadata;

        // pressure shares the provision's id; machines carry it as a label
        if metadata.resource_type == MachineRequestSetPressure::TYPE {
            return Ok(vec![metadata.id.clone()]);
        }

        Ok(metadata
            .labels
            .get(LABEL_MACHINE_REQUEST_SET)
            .map(|set| vec![set.to_owned()])
            .unwrap_or_default())
    }

    async fn reconcile(&self, id: &str) -> Result<Action, ControllerError> {
        let Some(provision) = self.provisions.get_opt(id).await? else {
            return self.cleanup(id).await;
        };

        if provision.metadata.phase.is_tearing_down() {
            return self.cleanup(id).await;
        }

        let machines = self
            .machines
            .list(&LabelQuery::new().eq(LABEL_MACHINE_REQUEST_SET, id))
            .await?;

        let (idle_machines, mut ready_to_delete) = self.walk_idle_machines(
            id,
            &machines,
            provision.spec.idle_machine_teardown_timeout(),
            Utc::now(),
        );

        let extra_machines = idle_machines - i64::from(provision.spec.idle_machine_count);

        let mut scale_down: i64 = 0;
        if extra_machines > 0 {
            ready_to_delete = ready_to_delete.min(extra_machines);
            scale_down = ready_to_delete;
        }

        if scale_down > 0 {
            info!(
                "{}: scaling {} down by {}",
                AUTO_SCALE_CONTROLLER_NAME, id, scale_down
            );
        }

        let pressure = self.pressures.get_opt(id).await?;

        let spec = provision.spec.clone();
        let expected_machines = pressure
            .as_ref()
            .map(|pressure| {
                i64::from(pressure.spec.required_machines) + i64::from(spec.idle_machine_count)
            });

        let set = self
            .request_sets
            .modify(id, move |set| {
                let target = &mut set.spec;
                target.provider_id = spec.provider_id.clone();
                target.extensions = spec.extensions.clone();
                target.kernel_args = spec.kernel_args.clone();
                target.meta_values = spec.meta_values.clone();
                target.talos_version = spec.talos_version.clone();
                target.overlay = spec.overlay.clone();

                target.machine_count -= scale_down as i32;

                // scale-up is eager and wins over a pending scale-down
                if let Some(expected) = expected_machines {
                    if expected > i64::from(target.machine_count) {
                        target.machine_count = expected as i32;
                    }
                }
            })
            .await?;

        debug!(
            "{}: {} machine count is {}",
            AUTO_SCALE_CONTROLLER_NAME, id, set.spec.machine_count
        );

        // without pressure there is nothing to scale up towards
        if pressure.is_none() {
            return Ok(Action::done());
        }

        if ready_to_delete < extra_machines {
            info!(
                "{}: waiting for the idle timeout of {} machines in {}",
                AUTO_SCALE_CONTROLLER_NAME,
                extra_machines - ready_to_delete,
                id
            );
            return Ok(Action::requeue(SCALE_DOWN_RECHECK));
        }

        Ok(Action::done())
    }
}
