//! Queued controller runtime.
//!
//! One dispatcher task per registered controller turns store events into
//! reconcile calls. The dispatcher guarantees at-most-one in-flight
//! reconcile per primary key, a per-controller concurrency cap, FIFO
//! fairness across keys, coalescing of events that arrive mid-reconcile,
//! and Fibonacci backoff on reconcile errors.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use store::{Event, EventKind, LabelQuery, Store};

use crate::backoff::FibonacciBackoff;
use crate::controller::{Action, ControllerSettings, Input, InputKind, OutputKind, QueuedController};
use crate::error::ControllerError;

const BACKOFF_MIN_SECS: u64 = 1;
const BACKOFF_MAX_SECS: u64 = 300;

/// Drives registered controllers over the store's watch feed.
pub struct ControllerRuntime {
    store: Arc<dyn Store>,
    controllers: Vec<Arc<dyn QueuedController>>,
    /// Exclusive output type -> owning controller name
    exclusive_outputs: HashMap<String, String>,
}

impl ControllerRuntime {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            controllers: Vec::new(),
            exclusive_outputs: HashMap::new(),
        }
    }

    /// Registers a controller, validating that its exclusive outputs are not
    /// claimed by a previously registered controller.
    pub fn register(&mut self, controller: Arc<dyn QueuedController>) -> Result<(), ControllerError> {
        let settings = controller.settings();
        for output in &settings.outputs {
            if output.kind != OutputKind::Exclusive {
                continue;
            }
            if let Some(owner) = self
                .exclusive_outputs
                .insert(output.resource_type.clone(), controller.name().to_owned())
            {
                return Err(ControllerError::InvalidConfiguration(format!(
                    "output {} is already exclusively owned by {}",
                    output.resource_type, owner
                )));
            }
        }
        self.controllers.push(controller);
        Ok(())
    }

    /// Runs all dispatchers until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut tasks = JoinSet::new();
        for controller in self.controllers {
            let dispatcher = Dispatcher::new(Arc::clone(&self.store), controller);
            let shutdown = shutdown.clone();
            tasks.spawn(async move { dispatcher.run(shutdown).await });
        }
        while tasks.join_next().await.is_some() {}
    }
}

enum DispatchMsg {
    /// Deferred reconcile of a key (requeue timer fired).
    Wake(String),
    /// An in-flight reconcile finished.
    Done {
        id: String,
        result: Result<Action, ControllerError>,
    },
}

/// Per-key dispatch bookkeeping.
#[derive(Default)]
struct DispatchState {
    queue: VecDeque<String>,
    queued: HashSet<String>,
    running: HashSet<String>,
    /// Keys that received events while a reconcile was in flight.
    dirty: HashSet<String>,
    backoffs: HashMap<String, FibonacciBackoff>,
}

impl DispatchState {
    fn enqueue(&mut self, id: String) {
        if self.running.contains(&id) {
            self.dirty.insert(id);
            return;
        }
        if self.queued.insert(id.clone()) {
            self.queue.push_back(id);
        }
    }
}

struct Dispatcher {
    store: Arc<dyn Store>,
    controller: Arc<dyn QueuedController>,
    settings: ControllerSettings,
}

impl Dispatcher {
    fn new(store: Arc<dyn Store>, controller: Arc<dyn QueuedController>) -> Self {
        let settings = controller.settings();
        Self {
            store,
            controller,
            settings,
        }
    }

    async fn run(self, shutdown: CancellationToken) {
        let name = self.controller.name().to_owned();
        let concurrency = self.settings.concurrency.max(1);

        // subscribe before the initial listing so nothing is missed in
        // between; duplicates coalesce
        let mut events = self.store.watch();
        let (tx, mut rx) = mpsc::unbounded_channel::<DispatchMsg>();
        let mut state = DispatchState::default();

        if let Err(err) = self.initial_sync(&mut state).await {
            error!("{}: initial sync failed: {}", name, err);
        }

        loop {
            while state.running.len() < concurrency {
                let Some(id) = state.queue.pop_front() else {
                    break;
                };
                state.queued.remove(&id);
                state.running.insert(id.clone());
                let controller = Arc::clone(&self.controller);
                let tx = tx.clone();
                tokio::spawn(async move {
                    debug!("{}: reconciling {}", controller.name(), id);
                    let result = controller.reconcile(&id).await;
                    let _ = tx.send(DispatchMsg::Done { id, result });
                });
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(&event, &mut state),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("{}: watch feed lagged, {} events dropped", name, missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(msg) = rx.recv() => match msg {
                    DispatchMsg::Wake(id) => state.enqueue(id),
                    DispatchMsg::Done { id, result } => {
                        state.running.remove(&id);
                        self.handle_done(id, result, &mut state, &tx);
                    }
                },
            }
        }
    }

    /// Reconciles pre-existing resources: lists every input and feeds the
    /// results through the normal event path.
    async fn initial_sync(&self, state: &mut DispatchState) -> Result<(), ControllerError> {
        for input in &self.settings.inputs {
            let listed = self
                .store
                .list(&input.namespace, &input.resource_type, &LabelQuery::new())
                .await?;
            for resource in listed {
                if let Some(id) = &input.id {
                    if *id != resource.metadata.id {
                        continue;
                    }
                }
                let event = Event {
                    kind: EventKind::Created,
                    resource,
                };
                self.deliver(input, &event, state);
            }
        }
        Ok(())
    }

    fn handle_event(&self, event: &Event, state: &mut DispatchState) {
        let Some(input) = self.settings.inputs.iter().find(|input| input.matches(event)) else {
            return;
        };
        self.deliver(input, event, state);
    }

    fn deliver(&self, input: &Input, event: &Event, state: &mut DispatchState) {
        let metadata = &event.resource.metadata;
        match input.kind {
            InputKind::Primary => state.enqueue(metadata.id.clone()),
            InputKind::Mapped => self.map_and_enqueue(event, state),
            InputKind::MappedDestroyReady => {
                // hold back tearing-down resources until their finalizers
                // have drained; the finalizer removals re-notify
                if metadata.phase.is_tearing_down() && !metadata.finalizers.is_empty() {
                    return;
                }
                self.map_and_enqueue(event, state);
            }
        }
    }

    fn map_and_enqueue(&self, event: &Event, state: &mut DispatchState) {
        match self.controller.map_input(event) {
            Ok(ids) => {
                for id in ids {
                    state.enqueue(id);
                }
            }
            Err(err) => {
                error!(
                    "{}: mapping input event for {} failed: {}",
                    self.controller.name(),
                    event.resource.metadata.to_ref(),
                    err
                );
            }
        }
    }

    fn handle_done(
        &self,
        id: String,
        result: Result<Action, ControllerError>,
        state: &mut DispatchState,
        tx: &mpsc::UnboundedSender<DispatchMsg>,
    ) {
        match result {
            Ok(action) => {
                state.backoffs.remove(&id);
                if state.dirty.remove(&id) {
                    state.enqueue(id);
                } else if let Some(after) = action.requeue_after() {
                    Self::wake_later(tx.clone(), id, after);
                }
            }
            Err(err) => {
                error!(
                    "{}: reconciliation of {} failed: {}",
                    self.controller.name(),
                    id,
                    err
                );
                state.dirty.remove(&id);
                let delay = state
                    .backoffs
                    .entry(id.clone())
                    .or_insert_with(|| FibonacciBackoff::new(BACKOFF_MIN_SECS, BACKOFF_MAX_SECS))
                    .next_backoff();
                Self::wake_later(tx.clone(), id, delay);
            }
        }
    }

    fn wake_later(tx: mpsc::UnboundedSender<DispatchMsg>, id: String, after: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(DispatchMsg::Wake(id));
        });
    }
}
