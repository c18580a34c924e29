//! Per-container asynchronous render orchestration.
//!
//! Every render gets a session-unique request id. An entry only accepts the completion of the
//! request it issued last, and only within the network epoch the request was made in; anything
//! else is a stale result and is dropped. Jobs are never cancelled.

use crate::Result;
use crate::executor::{PoolExecutor, RenderExecutor, catch_panic};
use crate::render::{
    DiagramDocument, DiagramRenderer, Generation, RenderError, RenderKey, RenderRequest,
    RenderResult, RenderScope,
};
use crate::store::ParameterSnapshot;
use diagview_core::{ContainerId, Network};
use indexmap::IndexMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Render worker threads used by [`RenderSession::new`].
    pub workers: usize,
    /// Quiet period before a parameter change re-renders. Zero re-renders immediately.
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            debounce: Duration::ZERO,
        }
    }
}

impl SessionConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Which pane a result belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Selected,
    Checked(ContainerId),
}

/// A result published for a slot, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub slot: Slot,
    pub container: ContainerId,
    pub result: RenderResult,
}

pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct Entry {
    container: ContainerId,
    key: Option<RenderKey>,
    request: Option<u64>,
    result: RenderResult,
}

impl Entry {
    fn new(container: ContainerId) -> Self {
        Self {
            container,
            key: None,
            request: None,
            result: RenderResult::Idle,
        }
    }

    /// Pending or ready for exactly this key, so another render would be redundant.
    fn is_current_for(&self, key: &RenderKey) -> bool {
        self.key.as_ref() == Some(key) && (self.result.is_pending() || self.result.is_ready())
    }
}

struct Completion {
    request: u64,
    epoch: u64,
    container: ContainerId,
    outcome: std::result::Result<DiagramDocument, RenderError>,
}

pub struct RenderSession<R: DiagramRenderer> {
    renderer: Arc<R>,
    executor: Arc<dyn RenderExecutor>,
    config: SessionConfig,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    waker: Option<Waker>,
    network: Option<Arc<Network>>,
    parameters: ParameterSnapshot,
    epoch: u64,
    revision: u64,
    issued: u64,
    in_flight: usize,
    refresh_at: Option<Instant>,
    selected: Option<Entry>,
    checked: IndexMap<ContainerId, Entry>,
    events: Vec<SessionEvent>,
}

impl<R: DiagramRenderer> RenderSession<R> {
    /// Creates a session rendering on a pool of `config.workers` threads.
    pub fn new(renderer: R, config: SessionConfig) -> Result<Self> {
        let executor = PoolExecutor::new(config.workers)?;
        Ok(Self::with_executor(renderer, Arc::new(executor), config))
    }

    pub fn with_executor(
        renderer: R,
        executor: Arc<dyn RenderExecutor>,
        config: SessionConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            renderer: Arc::new(renderer),
            executor,
            config,
            tx,
            rx,
            waker: None,
            network: None,
            parameters: ParameterSnapshot::default(),
            epoch: 0,
            revision: 0,
            issued: 0,
            in_flight: 0,
            refresh_at: None,
            selected: None,
            checked: IndexMap::new(),
            events: Vec::new(),
        }
    }

    /// Called from a worker thread after each completion, so a host event loop can schedule
    /// [`RenderSession::poll`].
    pub fn set_waker(&mut self, waker: impl Fn() + Send + Sync + 'static) {
        self.waker = Some(Arc::new(waker));
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn network(&self) -> Option<&Arc<Network>> {
        self.network.as_ref()
    }

    pub fn parameters(&self) -> &ParameterSnapshot {
        &self.parameters
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn generation(&self) -> Generation {
        Generation {
            epoch: self.epoch,
            parameters: self.parameters.version,
            revision: self.revision,
        }
    }

    /// Number of render jobs handed to the executor so far.
    pub fn requests_issued(&self) -> u64 {
        self.issued
    }

    /// Jobs submitted whose completion has not been received yet, stale ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.refresh_at.is_none()
    }

    /// Switches to another network (or none). Bumps the epoch and drops every entry.
    pub fn set_network(&mut self, network: Option<Arc<Network>>) -> u64 {
        self.epoch += 1;
        self.revision = 0;
        self.network = network;
        self.selected = None;
        self.checked.clear();
        self.refresh_at = None;
        self.events.clear();
        tracing::debug!(epoch = self.epoch, "render session reset for new network");
        self.epoch
    }

    /// The current network was mutated in place; `network` is the updated copy.
    pub fn network_mutated(&mut self, network: Arc<Network>) {
        self.network = Some(network);
        self.invalidate_all();
    }

    /// Re-renders every selected and checked container against a new network revision.
    pub fn invalidate_all(&mut self) {
        self.revision += 1;
        self.refresh_at = None;
        self.refresh_all_now();
    }

    pub fn set_parameters(&mut self, snapshot: ParameterSnapshot) {
        self.set_parameters_at(snapshot, Instant::now());
    }

    /// Like [`RenderSession::set_parameters`], with an explicit clock for the debounce window.
    pub fn set_parameters_at(&mut self, snapshot: ParameterSnapshot, now: Instant) {
        if snapshot.version == self.parameters.version {
            return;
        }
        self.parameters = snapshot;
        if self.config.debounce.is_zero() {
            self.refresh_all_now();
        } else {
            // Results of in-flight renders are already outdated; drop them on arrival.
            for entry in self.selected.iter_mut().chain(self.checked.values_mut()) {
                entry.request = None;
            }
            self.refresh_at = Some(now + self.config.debounce);
        }
    }

    pub fn select(&mut self, container: Option<ContainerId>) {
        let Some(container) = container else {
            if let Some(entry) = self.selected.take() {
                tracing::debug!(container = %entry.container, "selected entry dropped");
            }
            return;
        };
        let same = self
            .selected
            .as_ref()
            .is_some_and(|entry| entry.container == container);
        if !same {
            self.selected = Some(Entry::new(container));
        }
        self.trigger(Slot::Selected);
    }

    pub fn check(&mut self, container: ContainerId) {
        if self.checked.contains_key(&container) {
            return;
        }
        self.checked
            .insert(container.clone(), Entry::new(container.clone()));
        self.trigger(Slot::Checked(container));
    }

    /// Drops the checked entry; a late completion for it is discarded.
    pub fn uncheck(&mut self, container: &str) -> bool {
        self.checked.shift_remove(container).is_some()
    }

    pub fn selected(&self) -> Option<&ContainerId> {
        self.selected.as_ref().map(|entry| &entry.container)
    }

    pub fn selected_result(&self) -> Option<&RenderResult> {
        self.selected.as_ref().map(|entry| &entry.result)
    }

    pub fn checked_ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.checked.keys()
    }

    pub fn checked_result(&self, container: &str) -> Option<&RenderResult> {
        self.checked.get(container).map(|entry| &entry.result)
    }

    pub fn result(&self, slot: &Slot) -> Option<&RenderResult> {
        self.entry(slot).map(|entry| &entry.result)
    }

    /// Whether `container` has a selected or checked entry.
    pub fn has_entry(&self, container: &str) -> bool {
        self.checked.contains_key(container)
            || self
                .selected
                .as_ref()
                .is_some_and(|entry| entry.container.as_str() == container)
    }

    pub fn entry_count(&self) -> usize {
        self.checked.len() + usize::from(self.selected.is_some())
    }

    pub fn poll(&mut self) -> Vec<SessionEvent> {
        self.poll_at(Instant::now())
    }

    /// Runs a due debounced refresh, applies every received completion and returns the events
    /// produced since the previous poll.
    pub fn poll_at(&mut self, now: Instant) -> Vec<SessionEvent> {
        if self.refresh_at.is_some_and(|at| now >= at) {
            self.refresh_at = None;
            tracing::debug!(
                version = self.parameters.version,
                "debounced parameter refresh"
            );
            self.refresh_all_now();
        }
        loop {
            match self.rx.try_recv() {
                Ok(completion) => self.complete(completion),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        std::mem::take(&mut self.events)
    }

    /// Polls until the session is idle or `timeout` elapses, returning every event seen.
    pub fn poll_blocking(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        loop {
            let now = Instant::now();
            events.extend(self.poll_at(now));
            if self.is_idle() || now >= deadline {
                return events;
            }

            let mut wait = deadline - now;
            if let Some(at) = self.refresh_at {
                wait = wait.min(at.saturating_duration_since(now));
            }
            if self.in_flight == 0 {
                std::thread::sleep(wait);
                continue;
            }
            match self.rx.recv_timeout(wait) {
                Ok(completion) => self.complete(completion),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return events,
            }
        }
    }

    fn entry(&self, slot: &Slot) -> Option<&Entry> {
        match slot {
            Slot::Selected => self.selected.as_ref(),
            Slot::Checked(id) => self.checked.get(id),
        }
    }

    fn entry_mut(&mut self, slot: &Slot) -> Option<&mut Entry> {
        match slot {
            Slot::Selected => self.selected.as_mut(),
            Slot::Checked(id) => self.checked.get_mut(id),
        }
    }

    fn refresh_all_now(&mut self) {
        if self.selected.is_some() {
            self.trigger(Slot::Selected);
        }
        let checked: Vec<ContainerId> = self.checked.keys().cloned().collect();
        for container in checked {
            self.trigger(Slot::Checked(container));
        }
    }

    /// The other slot's request and result for the same container, if it is current for `key`.
    fn adoptable(
        &self,
        slot: &Slot,
        container: &ContainerId,
        key: &RenderKey,
    ) -> Option<(Option<u64>, RenderResult)> {
        let other = match slot {
            Slot::Selected => self.checked.get(container),
            Slot::Checked(_) => self
                .selected
                .as_ref()
                .filter(|entry| &entry.container == container),
        }?;
        other
            .is_current_for(key)
            .then(|| (other.request, other.result.clone()))
    }

    fn trigger(&mut self, slot: Slot) {
        let Some(network) = self.network.clone() else {
            return;
        };
        let Some(container) = self.entry(&slot).map(|entry| entry.container.clone()) else {
            return;
        };
        let Some(node) = network.container(container.as_str()) else {
            tracing::debug!(container = %container, "not rendering container missing from network");
            return;
        };
        let scope = RenderScope::for_container(&network, node, self.parameters.parameters.depth);
        let key = RenderKey {
            generation: self.generation(),
            scope,
        };
        let generation = key.generation;

        if self
            .entry(&slot)
            .is_some_and(|entry| entry.is_current_for(&key))
        {
            tracing::trace!(container = %container, "render already current");
            return;
        }

        if let Some((request, result)) = self.adoptable(&slot, &container, &key) {
            if let Some(entry) = self.entry_mut(&slot) {
                entry.key = Some(key);
                entry.request = request;
                entry.result = result.clone();
            }
            tracing::trace!(container = %container, "sharing render between panes");
            self.events.push(SessionEvent {
                slot,
                container,
                result,
            });
            return;
        }

        self.issued += 1;
        let request_id = self.issued;
        let pending = RenderResult::Pending { generation };
        if let Some(entry) = self.entry_mut(&slot) {
            entry.key = Some(key.clone());
            entry.request = Some(request_id);
            entry.result = pending.clone();
        }
        self.events.push(SessionEvent {
            slot,
            container: container.clone(),
            result: pending,
        });
        tracing::debug!(
            request = request_id,
            container = %container,
            epoch = generation.epoch,
            parameters = generation.parameters,
            revision = generation.revision,
            "render scheduled"
        );

        self.spawn(
            request_id,
            RenderRequest {
                network,
                container,
                scope: key.scope,
                parameters: Arc::clone(&self.parameters.parameters),
            },
        );
    }

    fn spawn(&mut self, request_id: u64, request: RenderRequest) {
        let renderer = Arc::clone(&self.renderer);
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        let epoch = self.epoch;
        self.in_flight += 1;
        self.executor.execute(Box::new(move || {
            let outcome = match catch_panic(|| renderer.render(&request)) {
                Ok(outcome) => outcome,
                Err(message) => {
                    tracing::error!(container = %request.container, %message, "renderer panicked");
                    Err(RenderError::Panicked { message })
                }
            };
            // Send fails only once the session is gone.
            let _ = tx.send(Completion {
                request: request_id,
                epoch,
                container: request.container,
                outcome,
            });
            if let Some(waker) = waker {
                waker();
            }
        }));
    }

    fn complete(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Completion {
            request,
            epoch,
            container,
            outcome,
        } = completion;

        if epoch != self.epoch {
            tracing::trace!(request, container = %container, epoch, "discarding result from previous network");
            return;
        }

        let mut targets = Vec::new();
        if self
            .selected
            .as_ref()
            .is_some_and(|entry| entry.request == Some(request))
        {
            targets.push(Slot::Selected);
        }
        if self
            .checked
            .get(&container)
            .is_some_and(|entry| entry.request == Some(request))
        {
            targets.push(Slot::Checked(container.clone()));
        }
        if targets.is_empty() {
            tracing::trace!(request, container = %container, "discarding stale render result");
            return;
        }

        let outcome = outcome.map(Arc::new);
        match &outcome {
            Ok(_) => tracing::debug!(request, container = %container, "render finished"),
            Err(error) => tracing::warn!(request, container = %container, %error, "render failed"),
        }

        for slot in targets {
            let Some(entry) = self.entry_mut(&slot) else {
                continue;
            };
            let generation = entry
                .key
                .as_ref()
                .map(|key| key.generation)
                .unwrap_or_default();
            let result = match &outcome {
                Ok(document) => RenderResult::Ready {
                    document: Arc::clone(document),
                    generation,
                },
                Err(error) => RenderResult::Failed {
                    error: error.clone(),
                    generation,
                },
            };
            entry.result = result.clone();
            self.events.push(SessionEvent {
                slot,
                container: container.clone(),
                result,
            });
        }
    }
}
