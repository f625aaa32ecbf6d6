//! Pressure controller: aggregates machine-set demand per request set.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use resources::{
    MachineRequestSet, MachineRequestSetPressure, MachineSetRequiredMachines,
    LABEL_MACHINE_REQUEST_SET,
};
use store::{Event, LabelQuery, Store, TypedClient};

use crate::controller::{Action, ControllerSettings, Input, Output, QueuedController};
use crate::error::ControllerError;
use crate::reconciler::{teardown_resource, Teardown};

/// Finalizer the controller keeps on every demand it has aggregated.
pub const PRESSURE_CONTROLLER_NAME: &str = "MachineRequestSetPressureController";

const CLEANUP_RETRY: Duration = Duration::from_secs(5);

/// Sums MachineSetRequiredMachines demand labeled with a request set into
/// that set's MachineRequestSetPressure.
///
/// The controller holds a finalizer on every counted demand; a demand (or
/// the parent set) entering teardown releases the finalizer and leaves the
/// aggregate to the surviving demands.
pub struct PressureController {
    request_sets: TypedClient<MachineRequestSet>,
    demands: TypedClient<MachineSetRequiredMachines>,
    pressures: TypedClient<MachineRequestSetPressure>,
}

impl PressureController {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            request_sets: TypedClient::new(Arc::clone(&store)),
            demands: TypedClient::new(Arc::clone(&store)),
            pressures: TypedClient::new(store),
        }
    }

    /// Drops the pressure resource of a destroyed or tearing-down set.
    async fn cleanup(&self, id: &str) -> Result<Action, ControllerError> {
        match teardown_resource(&self.pressures, id).await? {
            Teardown::Blocked => Ok(Action::requeue(CLEANUP_RETRY)),
            Teardown::Done => {
                info!("{}: removed pressure for {}", PRESSURE_CONTROLLER_NAME, id);
                Ok(Action::done())
            }
        }
    }
}

#[async_trait]
impl QueuedController for PressureController {
    fn name(&self) -> &str {
        PRESSURE_CONTROLLER_NAME
    }

    fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            inputs: vec![
                Input::primary::<MachineRequestSet>(),
                Input::mapped::<MachineSetRequiredMachines>(),
            ],
            outputs: vec![Output::exclusive::<MachineRequestSetPressure>()],
            concurrency: 1,
        }
    }

    fn map_input(&self, event: &Event) -> Result<Vec<String>, ControllerError> {
        // demand resources carry the request set id as a label
        Ok(event
            .resource
            .metadata
            .labels
            .get(LABEL_MACHINE_REQUEST_SET)
            .map(|set| vec![set.to_owned()])
            .unwrap_or_default())
    }

    async fn reconcile(&self, id: &str) -> Result<Action, ControllerError> {
        let Some(set) = self.request_sets.get_opt(id).await? else {
            return self.cleanup(id).await;
        };

        let set_tearing_down = set.metadata.phase.is_tearing_down();

        let demands = self
            .demands
            .list(&LabelQuery::new().eq(LABEL_MACHINE_REQUEST_SET, id))
            .await?;

        let mut total: u32 = 0;

        for demand in &demands {
            let demand_id = demand.metadata.id.as_str();

            if set_tearing_down || demand.metadata.phase.is_tearing_down() {
                self.demands
                    .remove_finalizer(demand_id, PRESSURE_CONTROLLER_NAME)
                    .await?;
                continue;
            }

            total += demand.spec.required_additional_machines;

            if !demand.metadata.has_finalizer(PRESSURE_CONTROLLER_NAME) {
                self.demands
                    .add_finalizer(demand_id, PRESSURE_CONTROLLER_NAME)
                    .await?;
            }
        }

        if set_tearing_down {
            return self.cleanup(id).await;
        }

        self.pressures
            .modify(id, |pressure| {
                pressure.spec.required_machines = total;
                pressure.spec.required_additional_machines = total;
            })
            .await?;

        debug!(
            "{}: {} requires {} machines",
            PRESSURE_CONTROLLER_NAME, id, total
        );

        Ok(Action::done())
    }
}
