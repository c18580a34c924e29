//! Keeps the tab set and pane contents in step with selection and render results.
//!
//! The binder is a view: it never decides what is checked. User gestures that would change the
//! checked set or the selection come back out as [`BinderCommand`]s for the owner to apply.

use crate::render::{DiagramDocument, RenderResult};
use crate::session::{SessionEvent, Slot};
use diagview_core::{ContainerId, DiagramEvent};
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PaneContent {
    #[default]
    Empty,
    Loading,
    Diagram(Arc<DiagramDocument>),
    Error(String),
}

impl PaneContent {
    fn from_result(result: &RenderResult) -> Self {
        match result {
            RenderResult::Idle => Self::Empty,
            RenderResult::Pending { .. } => Self::Loading,
            RenderResult::Ready { document, .. } => Self::Diagram(Arc::clone(document)),
            RenderResult::Failed { error, .. } => Self::Error(error.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn document(&self) -> Option<&Arc<DiagramDocument>> {
        match self {
            Self::Diagram(document) => Some(document),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub container: ContainerId,
    pub title: String,
    pub tooltip: String,
    pub content: PaneContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderCommand {
    Select(ContainerId),
    Uncheck(ContainerId),
    OperateSwitch(String),
}

#[derive(Debug, Clone, Default)]
pub struct TabBinder {
    selected: Option<ContainerId>,
    selected_content: PaneContent,
    tabs: IndexMap<ContainerId, Tab>,
    active: Option<ContainerId>,
}

impl TabBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a tab for a newly checked container and makes it active.
    pub fn on_checked_added(
        &mut self,
        container: ContainerId,
        title: impl Into<String>,
        tooltip: impl Into<String>,
    ) {
        if !self.tabs.contains_key(&container) {
            self.tabs.insert(
                container.clone(),
                Tab {
                    container: container.clone(),
                    title: title.into(),
                    tooltip: tooltip.into(),
                    content: PaneContent::Loading,
                },
            );
        }
        self.active = Some(container);
    }

    pub fn on_checked_removed(&mut self, container: &str) -> bool {
        let Some(index) = self.tabs.get_index_of(container) else {
            return false;
        };
        self.tabs.shift_remove_index(index);
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.as_str() == container)
        {
            // Focus moves to the neighbouring tab, preferring the one that took its place.
            let next = index.min(self.tabs.len().saturating_sub(1));
            self.active = self.tabs.get_index(next).map(|(id, _)| id.clone());
        }
        true
    }

    pub fn on_selected(&mut self, container: Option<ContainerId>) {
        self.selected_content = if container.is_some() {
            PaneContent::Loading
        } else {
            PaneContent::Empty
        };
        self.selected = container;
    }

    /// Shows a render result in the pane it belongs to. Results for closed tabs are ignored.
    pub fn apply(&mut self, event: &SessionEvent) -> bool {
        let content = PaneContent::from_result(&event.result);
        match &event.slot {
            Slot::Selected => {
                if self.selected.as_ref() != Some(&event.container) {
                    return false;
                }
                self.selected_content = content;
                true
            }
            Slot::Checked(container) => match self.tabs.get_mut(container) {
                Some(tab) => {
                    tab.content = content;
                    true
                }
                None => false,
            },
        }
    }

    /// A user closed a tab; the owner must uncheck the container.
    pub fn close_tab(&self, container: &str) -> Option<BinderCommand> {
        self.tabs
            .get_key_value(container)
            .map(|(id, _)| BinderCommand::Uncheck(id.clone()))
    }

    pub fn on_diagram_event(&self, event: DiagramEvent) -> BinderCommand {
        match event {
            DiagramEvent::ContainerClicked { container } => BinderCommand::Select(container),
            DiagramEvent::SwitchClicked { switch } => BinderCommand::OperateSwitch(switch),
        }
    }

    pub fn set_active(&mut self, container: &str) -> bool {
        match self.tabs.get_key_value(container) {
            Some((id, _)) => {
                self.active = Some(id.clone());
                true
            }
            None => false,
        }
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.as_ref().and_then(|id| self.tabs.get(id))
    }

    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.values()
    }

    pub fn tab(&self, container: &str) -> Option<&Tab> {
        self.tabs.get(container)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn selected(&self) -> Option<&ContainerId> {
        self.selected.as_ref()
    }

    pub fn selected_content(&self) -> &PaneContent {
        &self.selected_content
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.selected_content = PaneContent::Empty;
        self.tabs.clear();
        self.active = None;
    }
}
