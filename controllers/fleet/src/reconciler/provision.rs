//! Provision controller: drives each MachineRequest through the provider's
//! provisioning steps.
//!
//! The controller holds a finalizer on the request for the full provisioning
//! lifetime, checkpoints step progress in an annotation on the provider
//! resource, and reports step failures through the request status rather
//! than as reconcile errors.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use resources::{
    ConnectionParams, MachineRequest, MachineRequestStatus, ProvisionStage,
    ANNOTATION_CURRENT_STEP, CONNECTION_PARAMS_ID,
};
use store::{Event, Resource, Store, StoreError, TypedClient};

use crate::controller::{
    Action, ControllerSettings, Input, Output, QueuedController,
};
use crate::error::ControllerError;
use crate::provisioner::{FactoryClient, ProvisionContext, Provisioner};
use crate::reconciler::{teardown_resource, Teardown};

/// Generic provision controller operating one provider's [`Provisioner`].
///
/// `T` is the provider-scoped resource the provisioner records its state in,
/// one per MachineRequest id.
pub struct ProvisionController<T: Resource> {
    name: String,
    provider_id: String,
    concurrency: usize,
    provisioner: Arc<dyn Provisioner<T>>,
    factory: Arc<dyn FactoryClient>,
    requests: TypedClient<MachineRequest>,
    statuses: TypedClient<MachineRequestStatus>,
    provider_resources: TypedClient<T>,
    connection_params: TypedClient<ConnectionParams>,
}

impl<T: Resource> ProvisionController<T> {
    pub fn new(
        store: Arc<dyn Store>,
        provider_id: impl Into<String>,
        provisioner: Arc<dyn Provisioner<T>>,
        factory: Arc<dyn FactoryClient>,
        concurrency: usize,
    ) -> Self {
        let provider_id = provider_id.into();
        Self {
            name: format!("{provider_id}.ProvisionController"),
            provider_id,
            concurrency,
            provisioner,
            factory,
            requests: TypedClient::new(Arc::clone(&store)),
            statuses: TypedClient::new(Arc::clone(&store)),
            provider_resources: TypedClient::new(Arc::clone(&store)),
            connection_params: TypedClient::new(store),
        }
    }

    async fn reconcile_running(&self, request: &MachineRequest) -> Result<Action, ControllerError> {
        let id = request.metadata.id.as_str();

        if !request.metadata.has_finalizer(&self.name) {
            self.requests.add_finalizer(id, &self.name).await?;
        }

        let mut status = self.initialize_status(request).await?;

        let mut provider = match self.provider_resources.get_opt(id).await? {
            Some(resource) => resource,
            None => T::new(id),
        };

        // nothing to do, the machine was already provisioned
        if status.spec.stage == ProvisionStage::Provisioned {
            return Ok(Action::done());
        }

        let connection_args = self
            .connection_params
            .get(CONNECTION_PARAMS_ID)
            .await?
            .args_for_provider(&self.provider_id);

        let steps = self.provisioner.provision_steps();

        // resume where the annotation points; an unknown step name (renamed
        // or removed) restarts from the first step
        let resume_index = provider
            .metadata()
            .annotations
            .get(ANNOTATION_CURRENT_STEP)
            .and_then(|current| steps.iter().position(|step| step.name() == current))
            .unwrap_or(0);

        for step in &steps[resume_index..] {
            info!("{}: running provision step {} for {}", self.name, step.name(), id);

            // persist the step name before running it, so a crash mid-step
            // resumes here
            provider
                .metadata_mut()
                .annotations
                .insert(ANNOTATION_CURRENT_STEP.to_owned(), step.name().to_owned());
            provider = self.persist_provider(&provider).await?;

            let mut ctx = ProvisionContext {
                machine_request: request,
                status: &mut status,
                resource: &mut provider,
                connection_args: &connection_args,
                factory: self.factory.as_ref(),
            };

            if let Err(err) = step.run(&mut ctx).await {
                error!(
                    "{}: provisioning of {} failed at step {}: {:#}",
                    self.name,
                    id,
                    step.name(),
                    err
                );

                // the failure is durably reported through the status;
                // retries come from later input events
                let message = format!("{err:#}");
                self.statuses
                    .modify(id, |stored| {
                        stored.spec.stage = ProvisionStage::Failed;
                        stored.spec.error = message.clone();
                    })
                    .await?;

                return Ok(Action::done());
            }

            provider = self.persist_provider(&provider).await?;
            status = self.persist_status(&status).await?;
        }

        self.statuses
            .modify(id, |stored| {
                stored.spec.stage = ProvisionStage::Provisioned;
                stored.metadata.labels = request.metadata.labels.clone();
            })
            .await?;

        info!("{}: machine request {} provisioned", self.name, id);

        Ok(Action::done())
    }

    /// Creates the status in the Provisioning stage if it does not exist
    /// yet. This write is the point at which provisioning becomes
    /// observable.
    async fn initialize_status(
        &self,
        request: &MachineRequest,
    ) -> Result<MachineRequestStatus, ControllerError> {
        let id = request.metadata.id.as_str();

        if let Some(status) = self.statuses.get_opt(id).await? {
            return Ok(status);
        }

        let labels = request.metadata.labels.clone();
        let status = self
            .statuses
            .modify(id, move |status| {
                if status.spec.stage == ProvisionStage::Unknown {
                    status.spec.stage = ProvisionStage::Provisioning;
                    status.metadata.labels = labels.clone();
                }
            })
            .await?;

        info!("{}: machine provision started for {}", self.name, id);

        Ok(status)
    }

    async fn reconcile_tearing_down(
        &self,
        request: &MachineRequest,
    ) -> Result<Action, ControllerError> {
        let id = request.metadata.id.as_str();

        // the provider resource may hold provider-side handles the
        // deprovision call needs, so load it before destroying its store
        // representation
        let provider = self.provider_resources.get_opt(id).await?;

        if teardown_resource(&self.provider_resources, id).await? == Teardown::Blocked {
            return Ok(Action::done());
        }
        if teardown_resource(&self.statuses, id).await? == Teardown::Blocked {
            return Ok(Action::done());
        }

        let resource = match provider {
            Some(resource) => resource,
            None => T::new(id),
        };
        self.provisioner
            .deprovision(&resource, request)
            .await
            .map_err(ControllerError::Provisioner)?;

        info!("{}: machine request {} deprovisioned", self.name, id);

        self.requests.remove_finalizer(id, &self.name).await?;

        Ok(Action::done())
    }

    /// Writes the local provider resource state back to the store.
    async fn persist_provider(&self, provider: &T) -> Result<T, StoreError> {
        let id = provider.metadata().id.clone();
        let spec = provider.spec().clone();
        let annotations = provider.metadata().annotations.clone();
        let labels = provider.metadata().labels.clone();
        self.provider_resources
            .modify(&id, move |stored| {
                *stored.spec_mut() = spec.clone();
                stored.metadata_mut().annotations = annotations.clone();
                stored.metadata_mut().labels = labels.clone();
            })
            .await
    }

    /// Writes status mutations produced by a step back to the store.
    async fn persist_status(
        &self,
        status: &MachineRequestStatus,
    ) -> Result<MachineRequestStatus, StoreError> {
        let id = status.metadata.id.clone();
        let spec = status.spec.clone();
        self.statuses
            .modify(&id, move |stored| {
                stored.spec = spec.clone();
            })
            .await
    }
}

#[async_trait]
impl<T: Resource> QueuedController for ProvisionController<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            inputs: vec![
                Input::primary::<MachineRequest>(),
                Input::mapped_destroy_ready::<MachineRequestStatus>(),
                Input::mapped::<ConnectionParams>().with_id(CONNECTION_PARAMS_ID),
                Input::mapped_destroy_ready::<T>(),
            ],
            outputs: vec![
                Output::exclusive::<MachineRequestStatus>(),
                Output::shared::<T>(),
            ],
            concurrency: self.concurrency,
        }
    }

    fn map_input(&self, event: &Event) -> Result<Vec<String>, ControllerError> {
        // connection parameter changes don't retrigger provisioned requests
        if event.resource.metadata.resource_type == ConnectionParams::TYPE {
            return Ok(Vec::new());
        }

        // statuses and provider resources share the request's id
        Ok(vec![event.resource.metadata.id.clone()])
    }

    async fn reconcile(&self, id: &str) -> Result<Action, ControllerError> {
        let Some(request) = self.requests.get_opt(id).await? else {
            return Ok(Action::done());
        };

        if request.metadata.phase.is_tearing_down() {
            return self.reconcile_tearing_down(&request).await;
        }

        self.reconcile_running(&request).await
    }
}
