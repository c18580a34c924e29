//! The top-level session object owned by a viewer application.

use crate::binder::{BinderCommand, TabBinder};
use crate::executor::RenderExecutor;
use crate::listeners::ListenerId;
use crate::render::DiagramRenderer;
use crate::selection::{SelectionEvent, SelectionModel};
use crate::session::{RenderSession, SessionConfig, SessionEvent};
use crate::state::ViewerState;
use crate::store::{ParameterSnapshot, ParameterStore};
use crate::{Error, Result};
use diagview_core::{
    ContainerId, ContainerKind, DiagramEvent, Network, ParameterPatch, RenderParameters,
    TreeFilter, TreeItem,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Owns the network, selection, parameters, render session and tab binder of one viewer.
///
/// Changes flow one way: a mutation updates the selection or parameters, the render session
/// schedules work, and [`Viewer::poll`] hands finished results to the binder.
pub struct Viewer<R: DiagramRenderer> {
    network: Option<Arc<Network>>,
    case_path: Option<PathBuf>,
    selection: SelectionModel,
    parameters: ParameterStore,
    session: RenderSession<R>,
    binder: TabBinder,
}

impl<R: DiagramRenderer> Viewer<R> {
    pub fn new(renderer: R, config: SessionConfig) -> Result<Self> {
        Ok(Self::from_session(RenderSession::new(renderer, config)?))
    }

    pub fn with_executor(
        renderer: R,
        executor: Arc<dyn RenderExecutor>,
        config: SessionConfig,
    ) -> Self {
        Self::from_session(RenderSession::with_executor(renderer, executor, config))
    }

    fn from_session(session: RenderSession<R>) -> Self {
        Self {
            network: None,
            case_path: None,
            selection: SelectionModel::new(),
            parameters: ParameterStore::default(),
            session,
            binder: TabBinder::new(),
        }
    }

    /// Starts from `parameters` instead of the defaults.
    pub fn with_parameters(mut self, parameters: RenderParameters) -> Result<Self> {
        self.parameters.replace(parameters)?;
        self.parameters_changed();
        Ok(self)
    }

    pub fn set_waker(&mut self, waker: impl Fn() + Send + Sync + 'static) {
        self.session.set_waker(waker);
    }

    pub fn network(&self) -> Option<&Arc<Network>> {
        self.network.as_ref()
    }

    pub fn case_path(&self) -> Option<&Path> {
        self.case_path.as_deref()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn session(&self) -> &RenderSession<R> {
        &self.session
    }

    pub fn binder(&self) -> &TabBinder {
        &self.binder
    }

    pub fn set_active_tab(&mut self, container: &str) -> bool {
        self.binder.set_active(container)
    }

    pub fn tree(&self) -> Option<&TreeItem> {
        self.selection.tree()
    }

    pub fn load_network(&mut self, network: Network) {
        self.install(Some(Arc::new(network)));
        self.case_path = None;
    }

    /// Loads a case file. On failure every piece of session state is cleared.
    pub fn load_network_from_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match Network::from_path(path) {
            Ok(network) => {
                self.install(Some(Arc::new(network)));
                self.case_path = Some(path.to_path_buf());
                tracing::info!(path = %path.display(), "network loaded");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to load network");
                self.clear_network();
                Err(err.into())
            }
        }
    }

    pub fn clear_network(&mut self) {
        self.install(None);
        self.case_path = None;
    }

    fn install(&mut self, network: Option<Arc<Network>>) {
        self.session.set_network(network.clone());
        self.selection.set_network(network.clone());
        self.network = network;
        self.sync();
    }

    pub fn select(&mut self, container: Option<&str>) -> bool {
        let changed = self.selection.select_container(container);
        self.sync();
        changed
    }

    pub fn set_checked(&mut self, container: &str, checked: bool) -> bool {
        let changed = self.selection.set_checked(container, checked);
        self.sync();
        changed
    }

    pub fn apply_filter(&mut self, filter: TreeFilter) {
        self.selection.apply_filter(filter);
        self.sync();
    }

    pub fn update_parameters(&mut self, patch: &ParameterPatch) -> Result<u64> {
        let version = self.parameters.update(patch)?;
        self.parameters_changed();
        Ok(version)
    }

    pub fn update_parameters_with(
        &mut self,
        f: impl FnOnce(&mut RenderParameters),
    ) -> Result<u64> {
        let version = self.parameters.update_with(f)?;
        self.parameters_changed();
        Ok(version)
    }

    fn parameters_changed(&mut self) {
        let snapshot = self.parameters.current();
        let show_names = snapshot.parameters.show_names;
        self.session.set_parameters(snapshot);
        if self.selection.filter().show_names != show_names {
            let filter = TreeFilter {
                show_names,
                ..self.selection.filter().clone()
            };
            self.selection.apply_filter(filter);
            self.sync();
        }
    }

    /// Re-renders everything displayed, e.g. after a load flow changed the network state.
    pub fn refresh_all(&mut self) {
        self.session.invalidate_all();
    }

    /// Toggles a switch and re-renders every displayed container. Returns the new open state.
    pub fn operate_switch(&mut self, switch: &str) -> Result<bool> {
        let network = self.network.as_mut().ok_or(Error::NoNetwork)?;
        if network.switch(switch).is_none() {
            return Err(diagview_core::Error::UnknownSwitch {
                id: switch.to_string(),
            }
            .into());
        }
        let open = Arc::make_mut(network).operate_switch(switch)?;
        let network = Arc::clone(network);
        self.selection.replace_network(Arc::clone(&network));
        self.session.network_mutated(network);
        Ok(open)
    }

    /// A user closed a tab. Returns `false` if no tab was open for `container`.
    pub fn close_tab(&mut self, container: &str) -> Result<bool> {
        match self.binder.close_tab(container) {
            Some(command) => {
                self.execute(command)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn handle_diagram_event(&mut self, event: DiagramEvent) -> Result<()> {
        let command = self.binder.on_diagram_event(event);
        self.execute(command)
    }

    fn execute(&mut self, command: BinderCommand) -> Result<()> {
        match command {
            BinderCommand::Select(container) => {
                self.select(Some(container.as_str()));
            }
            BinderCommand::Uncheck(container) => {
                self.set_checked(container.as_str(), false);
            }
            BinderCommand::OperateSwitch(switch) => {
                self.operate_switch(&switch)?;
            }
        }
        Ok(())
    }

    pub fn poll(&mut self) -> Vec<SessionEvent> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Vec<SessionEvent> {
        let events = self.session.poll_at(now);
        self.bind(&events);
        events
    }

    pub fn poll_blocking(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let events = self.session.poll_blocking(timeout);
        self.bind(&events);
        events
    }

    fn bind(&mut self, events: &[SessionEvent]) {
        for event in events {
            self.binder.apply(event);
        }
    }

    pub fn state(&self) -> ViewerState {
        ViewerState {
            case_path: self.case_path.clone(),
            selected: self.selection.selected_id().cloned(),
            checked: self.selection.checked_ids().cloned().collect(),
        }
    }

    /// Reloads the case file (when it differs from the current one) and re-applies selection
    /// and checked containers. Ids missing from the network are skipped.
    pub fn restore(&mut self, state: &ViewerState) -> Result<()> {
        if let Some(path) = &state.case_path {
            if self.network.is_none() || self.case_path.as_deref() != Some(path.as_path()) {
                self.load_network_from_path(path)?;
            }
        }
        let Some(network) = self.network.clone() else {
            return Ok(());
        };
        for id in &state.checked {
            if network.contains(id.as_str()) {
                self.set_checked(id.as_str(), true);
            } else {
                tracing::debug!(container = %id, "skipping unknown checked container");
            }
        }
        if let Some(id) = &state.selected {
            if network.contains(id.as_str()) {
                self.select(Some(id.as_str()));
            } else {
                tracing::debug!(container = %id, "skipping unknown selected container");
            }
        }
        Ok(())
    }

    pub fn subscribe_selection(
        &mut self,
        listener: impl FnMut(&SelectionEvent) + Send + 'static,
    ) -> ListenerId {
        self.selection.subscribe(listener)
    }

    pub fn subscribe_parameters(
        &mut self,
        listener: impl FnMut(&ParameterSnapshot) + Send + 'static,
    ) -> ListenerId {
        self.parameters.subscribe(listener)
    }

    fn sync(&mut self) {
        for event in self.selection.drain_events() {
            match event {
                SelectionEvent::Selected { current, .. } => {
                    self.binder.on_selected(current.clone());
                    self.session.select(current);
                }
                SelectionEvent::Checked(container) => {
                    let (title, tooltip) = self.tab_labels(&container);
                    self.binder
                        .on_checked_added(container.clone(), title, tooltip);
                    self.session.check(container);
                }
                SelectionEvent::Unchecked(container) => {
                    self.binder.on_checked_removed(container.as_str());
                    self.session.uncheck(container.as_str());
                }
                SelectionEvent::Reset => self.binder.clear(),
                SelectionEvent::FilterChanged => {}
            }
        }
    }

    fn tab_labels(&self, id: &ContainerId) -> (String, String) {
        let Some(network) = self.network.as_ref() else {
            return (id.to_string(), id.to_string());
        };
        let Some(container) = network.container(id.as_str()) else {
            return (id.to_string(), id.to_string());
        };
        let title = self.selection.filter().label(container).to_string();
        let name = container.name_or_id();
        let tooltip = match container.kind() {
            ContainerKind::VoltageLevel => match network.nominal_v(id.as_str()) {
                Some(nominal_v) if nominal_v > 0.0 => format!("{name} ({nominal_v} kV)"),
                _ => name.to_string(),
            },
            ContainerKind::Substation => match network.country(id.as_str()) {
                Some(country) => format!("{name} ({country})"),
                None => name.to_string(),
            },
            ContainerKind::Network => name.to_string(),
        };
        (title, tooltip)
    }
}
