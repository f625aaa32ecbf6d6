//! Test utilities for controller unit tests.
//!
//! Provides an in-memory store, resource builders, and a scripted
//! provisioner whose steps record their invocations and can be programmed
//! to fail.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use resources::{
    ConnectionParams, MachineProvision, MachineRequest, MachineSetRequiredMachines, MachineStatus,
    CONNECTION_PARAMS_ID, LABEL_MACHINE_AVAILABLE, LABEL_MACHINE_REQUEST_SET,
};
use store::{impl_resource, MemoryStore, Metadata, Resource};

use crate::provisioner::{FactoryClient, ProvisionContext, Provisioner, Step};

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Stores a resource built by one of the helpers below.
pub async fn seed<R: Resource>(store: &Arc<MemoryStore>, resource: &R) {
    use store::Store as _;

    store.create(resource.to_raw().unwrap()).await.unwrap();
}

pub fn machine_request(id: &str) -> MachineRequest {
    let mut request = MachineRequest::new(id);
    request.metadata.labels.set(LABEL_MACHINE_REQUEST_SET, "pool-1");
    request.spec.talos_version = "v1.9.1".to_owned();
    request
}

pub fn connection_params() -> ConnectionParams {
    let mut params = ConnectionParams::new(CONNECTION_PARAMS_ID);
    params.spec.join_args = "fleet.api=10.5.0.2:8090".to_owned();
    params
}

pub fn demand(id: &str, set: &str, required: u32) -> MachineSetRequiredMachines {
    let mut demand = MachineSetRequiredMachines::new(id);
    demand.metadata.labels.set(LABEL_MACHINE_REQUEST_SET, set);
    demand.spec.required_additional_machines = required;
    demand
}

pub fn machine_provision(id: &str, idle_count: u32, idle_timeout: Duration) -> MachineProvision {
    let mut provision = MachineProvision::new(id);
    provision.spec.provider_id = "test-provider".to_owned();
    provision.spec.talos_version = "v1.9.1".to_owned();
    provision.spec.idle_machine_count = idle_count;
    provision.spec.idle_machine_teardown_timeout_seconds = idle_timeout.as_secs();
    provision
}

pub fn machine_status(id: &str, set: &str, available: bool, age: Duration) -> MachineStatus {
    let mut machine = MachineStatus::new(id);
    machine.metadata.labels.set(LABEL_MACHINE_REQUEST_SET, set);
    if available {
        machine.metadata.labels.set(LABEL_MACHINE_AVAILABLE, "");
    }
    machine.metadata.created = Utc::now()
        - chrono::Duration::from_std(age).expect("test ages fit in a chrono duration");
    machine
}

/// Provider resource used by provisioning tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMachine {
    pub metadata: Metadata,
    pub spec: TestMachineSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMachineSpec {
    pub instance_id: Option<String>,
    pub powered_on: bool,
}

impl_resource!(
    TestMachine,
    TestMachineSpec,
    "TestMachines.test-provider",
    "test-provider"
);

pub struct TestFactory;

impl FactoryClient for TestFactory {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Scripted provisioner: a fixed list of named steps that record their
/// invocations and can be programmed to fail a number of times.
pub struct TestProvisioner {
    step_names: Vec<&'static str>,
    /// Step names in run order, across all reconciles.
    pub runs: Arc<Mutex<Vec<String>>>,
    /// step name -> (remaining failures, message)
    failures: Arc<Mutex<HashMap<String, (u32, String)>>>,
    /// Instance ids observed by deprovision calls.
    pub deprovisioned: Arc<Mutex<Vec<Option<String>>>>,
}

impl TestProvisioner {
    pub fn new(step_names: &[&'static str]) -> Self {
        Self {
            step_names: step_names.to_vec(),
            runs: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            deprovisioned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes the named step fail `times` times before succeeding again.
    pub fn fail_step(&self, name: &str, times: u32, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(name.to_owned(), (times, message.to_owned()));
    }

    pub fn run_log(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

struct ScriptedStep {
    name: &'static str,
    runs: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, (u32, String)>>>,
}

#[async_trait]
impl Step<TestMachine> for ScriptedStep {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, ctx: &mut ProvisionContext<'_, TestMachine>) -> anyhow::Result<()> {
        self.runs.lock().unwrap().push(self.name.to_owned());

        let failure = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(self.name) {
                Some((remaining, message)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(message.clone())
                }
                _ => None,
            }
        };
        if let Some(message) = failure {
            bail!("{message}");
        }

        // idempotent provider work: converges on reruns
        if ctx.resource.spec.instance_id.is_none() {
            ctx.resource.spec.instance_id =
                Some(format!("instance-{}", ctx.machine_request.metadata.id));
        }
        ctx.resource.spec.powered_on = true;

        Ok(())
    }
}

#[async_trait]
impl Provisioner<TestMachine> for TestProvisioner {
    fn provision_steps(&self) -> Vec<Box<dyn Step<TestMachine>>> {
        self.step_names
            .iter()
            .map(|&name| {
                Box::new(ScriptedStep {
                    name,
                    runs: Arc::clone(&self.runs),
                    failures: Arc::clone(&self.failures),
                }) as Box<dyn Step<TestMachine>>
            })
            .collect()
    }

    async fn deprovision(
        &self,
        resource: &TestMachine,
        _request: &MachineRequest,
    ) -> anyhow::Result<()> {
        self.deprovisioned
            .lock()
            .unwrap()
            .push(resource.spec.instance_id.clone());
        Ok(())
    }
}
