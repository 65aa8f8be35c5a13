use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use flume::Receiver;
use log::{debug, error, trace, warn};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dep::{Cell, Slot};
use crate::{
    Command, CommandSnapshot, Compute, Dep, Error, EventChannel, Graph, Result, Schedulers, State,
    StateRuntime, StateSyncStatus, TaskHandle, TaskId, Updater,
};

type Watcher = Box<dyn FnMut(&dyn Any) -> bool + Send>;

/// Owns every cell of one screen.
///
/// All cell reads and writes happen on whichever context owns the `StateCtx`
/// (the presentation context). Commands run elsewhere and talk back through
/// [`Updater`]; their mutations land on the next [`StateCtx::sync_computes`].
pub struct StateCtx {
    cells: BTreeMap<TypeId, Cell>,
    commands: BTreeMap<TypeId, (&'static str, Arc<dyn Command>)>,
    graph: Graph<TypeId>,
    order: Option<Vec<TypeId>>,
    runtime: StateRuntime,
    watchers: BTreeMap<TypeId, Vec<Watcher>>,
    queued: VecDeque<TypeId>,
    tasks: JoinSet<()>,
    cancel: CancellationToken,
    schedulers: Option<Schedulers>,
}

impl Default for StateCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCtx {
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
            commands: BTreeMap::new(),
            graph: Graph::new(),
            order: None,
            runtime: StateRuntime::new(),
            watchers: BTreeMap::new(),
            queued: VecDeque::new(),
            tasks: JoinSet::new(),
            cancel: CancellationToken::new(),
            schedulers: None,
        }
    }

    /// Commands run on `schedulers.io()` instead of the ambient runtime.
    pub fn with_schedulers(schedulers: Schedulers) -> Self {
        let mut ctx = Self::new();
        ctx.schedulers = Some(schedulers);
        ctx
    }

    pub fn add_state<T: State>(&mut self, state: T) {
        let id = TypeId::of::<T>();
        self.graph.add_node(id);
        if self.cells.insert(id, Cell::state(state)).is_some() {
            warn!("State {} registered twice, keeping the latest", type_name::<T>());
        }
    }

    pub fn record_compute<T: Compute>(&mut self, compute: T) {
        let id = TypeId::of::<T>();
        self.graph.add_node(id);
        for dep in compute.deps() {
            self.graph.route_to(dep, id, ());
        }
        self.cells.insert(id, Cell::compute(compute));
        self.order = None;
    }

    pub fn record_command<C: Command>(&mut self, command: C) {
        self.commands
            .insert(TypeId::of::<C>(), (type_name::<C>(), Arc::new(command)));
    }

    /// Checks that every compute dependency is registered and the graph is acyclic.
    pub fn validate(&mut self) -> Result<()> {
        for cell in self.cells.values() {
            let Slot::Compute(compute) = &cell.slot else {
                continue;
            };
            let missing = compute
                .deps()
                .into_iter()
                .find(|dep| !self.cells.contains_key(dep));
            if let Some(missing) = missing {
                return Err(Error::Topology(format!(
                    "{} depends on an unregistered cell {missing:?}",
                    cell.name
                )));
            }
        }
        self.ensure_order().map(|_| ())
    }

    pub fn state<T: State>(&self) -> Option<&T> {
        self.cells
            .get(&TypeId::of::<T>())
            .and_then(|cell| cell.slot.as_any().downcast_ref::<T>())
    }

    /// Latest value of a compute.
    pub fn cached<T: Compute>(&self) -> Option<&T> {
        self.state::<T>()
    }

    pub fn updater(&self) -> Updater {
        self.runtime.updater(self.cancel.child_token())
    }

    /// Mutates a cell in place and recomputes everything downstream of it.
    pub fn update<T: State>(&mut self, f: impl FnOnce(&mut T)) -> Result<()> {
        let id = TypeId::of::<T>();
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or_else(|| Error::state_not_found(type_name::<T>()))?;

        if let Some(value) = cell.slot.as_any_mut().downcast_mut::<T>() {
            f(value);
        }
        if matches!(cell.slot, Slot::Compute(_)) {
            cell.status = StateSyncStatus::Clean;
        }

        self.propagate(vec![id]);
        Ok(())
    }

    pub fn set<T: State>(&mut self, value: T) -> Result<()> {
        self.update(move |state: &mut T| *state = value)
    }

    /// Attaches a fresh consumer to the `EventChannel<T>` cell.
    pub fn attach_events<T: Send + 'static>(&mut self) -> Result<Receiver<T>> {
        self.cells
            .get_mut(&TypeId::of::<EventChannel<T>>())
            .and_then(|cell| cell.slot.as_any_mut().downcast_mut::<EventChannel<T>>())
            .map(EventChannel::attach)
            .ok_or_else(|| Error::state_not_found(type_name::<EventChannel<T>>()))
    }

    /// Subscribes to a cell: yields the current value, then every distinct change.
    pub fn watch<T>(&mut self) -> Result<Receiver<T>>
    where
        T: State + Clone + PartialEq,
    {
        let current = self
            .state::<T>()
            .cloned()
            .ok_or_else(|| Error::state_not_found(type_name::<T>()))?;

        let (send, recv) = flume::unbounded();
        let mut last = current.clone();
        if send.send(current).is_err() {
            return Ok(recv);
        }

        self.watchers
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Box::new(move |any: &dyn Any| {
                let Some(value) = any.downcast_ref::<T>() else {
                    return true;
                };
                if *value == last {
                    return true;
                }
                last = value.clone();
                send.send(value.clone()).is_ok()
            }));

        Ok(recv)
    }

    /// Applies every pending update from commands, then recomputes.
    pub fn sync_computes(&mut self) {
        let envelopes: Vec<_> = self.runtime.drain().collect();

        let mut changed = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            if envelope.token.is_cancelled() {
                trace!("Discarding update of {} from a cancelled task", envelope.name);
                continue;
            }
            let Some(cell) = self.cells.get_mut(&envelope.id) else {
                warn!("Update for unregistered cell {}", envelope.name);
                continue;
            };
            (envelope.apply)(cell.slot.as_any_mut());
            if matches!(cell.slot, Slot::Compute(_)) {
                cell.status = StateSyncStatus::Clean;
            }
            changed.push(envelope.id);
        }

        self.propagate(changed);
    }

    /// Recomputes every compute that was never computed or has a changed upstream.
    pub fn run_computed(&mut self) -> Vec<TypeId> {
        let order = match self.ensure_order() {
            Ok(order) => order,
            Err(e) => {
                error!("Skipping computes: {e}");
                return Vec::new();
            }
        };

        let mut recomputed = Vec::new();
        for id in order {
            let needs_compute = self.cells.get(&id).is_some_and(|cell| {
                matches!(cell.slot, Slot::Compute(_)) && cell.status.needs_compute()
            });
            if !needs_compute {
                continue;
            }
            let Some(mut cell) = self.cells.remove(&id) else {
                continue;
            };
            if let Slot::Compute(compute) = &mut cell.slot {
                trace!("Computing {}", cell.name);
                compute.compute(Dep::new(&self.cells));
            }
            cell.status = StateSyncStatus::Clean;
            self.cells.insert(id, cell);
            recomputed.push(id);
        }
        recomputed
    }

    pub fn dispatch<C: Command>(&mut self) -> Result<TaskHandle> {
        self.dispatch_id(TypeId::of::<C>(), type_name::<C>())
    }

    pub fn enqueue_command<C: Command>(&mut self) {
        self.queued.push_back(TypeId::of::<C>());
    }

    /// Dispatches every queued command in FIFO order.
    pub fn flush_commands(&mut self) -> Vec<TaskHandle> {
        let mut handles = Vec::with_capacity(self.queued.len());
        while let Some(id) = self.queued.pop_front() {
            let name = self.commands.get(&id).map_or("<unrecorded>", |(name, _)| *name);
            match self.dispatch_id(id, name) {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("Failed to dispatch queued command: {e}"),
            }
        }
        handles
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task_set_mut(&mut self) -> &mut JoinSet<()> {
        &mut self.tasks
    }

    /// Flushes queued commands and waits for every task, syncing after each one.
    pub async fn flush_and_await(&mut self) {
        self.sync_computes();
        self.flush_commands();

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    error!("Command task failed: {e}");
                }
            }
            self.sync_computes();
        }

        self.sync_computes();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels every in-flight command. Nothing they produce is applied afterwards.
    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!("Closing state context with {} running tasks", self.tasks.len());
        self.cancel.cancel();
        self.tasks.abort_all();
        self.queued.clear();
        let discarded = self.runtime.drain().count();
        if discarded > 0 {
            trace!("Discarded {discarded} pending updates on close");
        }
    }

    /// Closes the context and waits for the aborted tasks to unwind.
    pub async fn shutdown(&mut self) {
        self.close();
        while self.tasks.join_next().await.is_some() {}
    }

    fn dispatch_id(&mut self, id: TypeId, name: &'static str) -> Result<TaskHandle> {
        if self.cancel.is_cancelled() {
            return Err(Error::Closed { name });
        }
        let command = self
            .commands
            .get(&id)
            .map(|(_, command)| Arc::clone(command))
            .ok_or_else(|| Error::command_not_found(name))?;
        let handle = self
            .schedulers
            .as_ref()
            .map(|schedulers| schedulers.io().clone())
            .or_else(|| Handle::try_current().ok())
            .ok_or(Error::NoRuntime { name })?;

        let token = self.cancel.child_token();
        let task = TaskHandle::new(TaskId::next(id), token.clone());
        let updater = self.runtime.updater(token.clone());

        debug!("Dispatching {name}");
        let future = command.run(self.snapshot(), updater, token.clone());
        // Updates pushed before the future was returned belong to the dispatch itself.
        self.sync_computes();

        self.tasks.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    () = token.cancelled() => trace!("{name} cancelled"),
                    () = future => trace!("{name} finished"),
                }
            },
            &handle,
        );

        Ok(task)
    }

    fn snapshot(&self) -> CommandSnapshot {
        let mut snap = CommandSnapshot::new();
        for (id, cell) in &self.cells {
            if let Some(copy) = cell.slot.snapshot() {
                snap.insert_cloned(*id, copy);
            }
        }
        snap
    }

    fn ensure_order(&mut self) -> Result<Vec<TypeId>> {
        if let Some(order) = &self.order {
            return Ok(order.clone());
        }
        let cells = &self.cells;
        let order = self.graph.topology_sort().map_err(|e| {
            Error::Topology(
                e.map(|id| cells.get(&id).map_or("<unregistered>", |cell| cell.name))
                    .to_string(),
            )
        })?;
        self.order = Some(order.clone());
        Ok(order)
    }

    fn propagate(&mut self, changed: Vec<TypeId>) {
        if changed.is_empty() && !self.has_stale_computes() {
            return;
        }

        for id in &changed {
            let dependents: Vec<TypeId> = self.graph.connected(*id).copied().collect();
            for dependent in dependents {
                if let Some(cell) = self.cells.get_mut(&dependent) {
                    cell.status = StateSyncStatus::Dirty;
                }
            }
        }

        let mut touched = changed;
        touched.extend(self.run_computed());
        touched.sort_unstable();
        touched.dedup();
        self.notify(&touched);
    }

    fn has_stale_computes(&self) -> bool {
        self.cells
            .values()
            .any(|cell| matches!(cell.slot, Slot::Compute(_)) && cell.status.needs_compute())
    }

    fn notify(&mut self, touched: &[TypeId]) {
        for id in touched {
            let (Some(watchers), Some(cell)) = (self.watchers.get_mut(id), self.cells.get(id))
            else {
                continue;
            };
            let value = cell.slot.as_any();
            watchers.retain_mut(|watcher| watcher(value));
        }
    }
}

impl Drop for StateCtx {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for StateCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cells: Vec<_> = self.cells.values().map(|cell| cell.name).collect();
        let commands: Vec<_> = self.commands.values().map(|(name, _)| *name).collect();
        f.debug_struct("StateCtx")
            .field("cells", &cells)
            .field("commands", &commands)
            .field("tasks", &self.tasks.len())
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}
