//! Unit tests for the pressure controller.

use std::sync::Arc;

use resources::{MachineRequestSet, MachineRequestSetPressure, MachineSetRequiredMachines};
use store::{MemoryStore, Resource, Store, TypedClient};

use crate::controller::QueuedController;
use crate::reconciler::pressure::{PressureController, PRESSURE_CONTROLLER_NAME};
use crate::test_utils::{demand, memory_store, seed};

struct Fixture {
    store: Arc<MemoryStore>,
    controller: PressureController,
    sets: TypedClient<MachineRequestSet>,
    demands: TypedClient<MachineSetRequiredMachines>,
    pressures: TypedClient<MachineRequestSetPressure>,
}

fn fixture() -> Fixture {
    let store = memory_store();
    Fixture {
        controller: PressureController::new(Arc::clone(&store) as Arc<dyn Store>),
        sets: TypedClient::new(Arc::clone(&store) as Arc<dyn Store>),
        demands: TypedClient::new(Arc::clone(&store) as Arc<dyn Store>),
        pressures: TypedClient::new(Arc::clone(&store) as Arc<dyn Store>),
        store,
    }
}

#[tokio::test]
async fn test_aggregates_labeled_demands() {
    let fx = fixture();
    seed(&fx.store, &MachineRequestSet::new("g1")).await;
    seed(&fx.store, &demand("d1", "g1", 2)).await;
    seed(&fx.store, &demand("d2", "g1", 3)).await;
    seed(&fx.store, &demand("d3", "g1", 0)).await;
    // demand for another set is not counted
    seed(&fx.store, &demand("d4", "g2", 7)).await;

    fx.controller.reconcile("g1").await.unwrap();

    let pressure = fx.pressures.get("g1").await.unwrap();
    assert_eq!(pressure.spec.required_machines, 5);

    // every counted demand carries our finalizer
    for id in ["d1", "d2", "d3"] {
        let demand = fx.demands.get(id).await.unwrap();
        assert!(demand.metadata.has_finalizer(PRESSURE_CONTROLLER_NAME));
    }
    let other = fx.demands.get("d4").await.unwrap();
    assert!(!other.metadata.has_finalizer(PRESSURE_CONTROLLER_NAME));
}

#[tokio::test]
async fn test_tearing_down_demand_is_released_and_dropped_from_total() {
    let fx = fixture();
    seed(&fx.store, &MachineRequestSet::new("g1")).await;
    seed(&fx.store, &demand("d1", "g1", 2)).await;
    seed(&fx.store, &demand("d2", "g1", 3)).await;
    seed(&fx.store, &demand("d3", "g1", 0)).await;
    fx.controller.reconcile("g1").await.unwrap();

    // held by our finalizer, so not ready yet
    assert!(!fx.demands.teardown("d2").await.unwrap());

    fx.controller.reconcile("g1").await.unwrap();

    let pressure = fx.pressures.get("g1").await.unwrap();
    assert_eq!(pressure.spec.required_machines, 2);

    // the finalizer was dropped, the demand can be destroyed now
    assert!(fx.demands.teardown("d2").await.unwrap());
    fx.demands.destroy("d2").await.unwrap();
}

#[tokio::test]
async fn test_tearing_down_set_releases_demands_and_removes_pressure() {
    let fx = fixture();
    seed(&fx.store, &MachineRequestSet::new("g1")).await;
    seed(&fx.store, &demand("d1", "g1", 2)).await;
    seed(&fx.store, &demand("d2", "g1", 3)).await;
    fx.controller.reconcile("g1").await.unwrap();
    assert_eq!(fx.pressures.get("g1").await.unwrap().spec.required_machines, 5);

    fx.sets.teardown("g1").await.unwrap();
    fx.controller.reconcile("g1").await.unwrap();

    for id in ["d1", "d2"] {
        let demand = fx.demands.get(id).await.unwrap();
        assert!(!demand.metadata.has_finalizer(PRESSURE_CONTROLLER_NAME));
    }
    assert!(fx.pressures.get_opt("g1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_destroyed_set_removes_pressure() {
    let fx = fixture();
    seed(&fx.store, &MachineRequestSet::new("g1")).await;
    fx.controller.reconcile("g1").await.unwrap();
    assert!(fx.pressures.get_opt("g1").await.unwrap().is_some());

    fx.sets.teardown("g1").await.unwrap();
    fx.sets.destroy("g1").await.unwrap();
    fx.controller.reconcile("g1").await.unwrap();

    assert!(fx.pressures.get_opt("g1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_repeated_reconcile_is_a_noop() {
    let fx = fixture();
    seed(&fx.store, &MachineRequestSet::new("g1")).await;
    seed(&fx.store, &demand("d1", "g1", 4)).await;

    fx.controller.reconcile("g1").await.unwrap();
    let first = fx.pressures.get("g1").await.unwrap();

    fx.controller.reconcile("g1").await.unwrap();
    let second = fx.pressures.get("g1").await.unwrap();

    assert_eq!(first.spec, second.spec);
    assert_eq!(second.spec.required_machines, 4);
}
