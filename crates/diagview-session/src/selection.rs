//! Selected / checked containers and the filtered container tree.

use crate::listeners::{ListenerId, Listeners};
use diagview_core::{ContainerId, Network, TreeFilter, TreeItem, build_tree};
use indexmap::IndexSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Selected {
        previous: Option<ContainerId>,
        current: Option<ContainerId>,
    },
    Checked(ContainerId),
    Unchecked(ContainerId),
    /// The network changed or was cleared; selection and checked set are empty.
    Reset,
    FilterChanged,
}

/// One exclusive selected container plus an insertion-ordered set of checked containers.
///
/// Operations naming containers that are not part of the current network are ignored.
#[derive(Default)]
pub struct SelectionModel {
    network: Option<Arc<Network>>,
    selected: Option<ContainerId>,
    checked: IndexSet<ContainerId>,
    filter: TreeFilter,
    tree: Option<TreeItem>,
    listeners: Listeners<SelectionEvent>,
    queue: Vec<SelectionEvent>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self) -> Option<&Arc<Network>> {
        self.network.as_ref()
    }

    /// Replaces the network and clears selection and checked set. The filter is kept.
    pub fn set_network(&mut self, network: Option<Arc<Network>>) {
        self.network = network;
        self.selected = None;
        self.checked.clear();
        self.rebuild_tree();
        self.emit(SelectionEvent::Reset);
    }

    /// Swaps in a mutated copy of the same network without touching selection state.
    pub(crate) fn replace_network(&mut self, network: Arc<Network>) {
        self.network = Some(network);
    }

    pub fn selected_id(&self) -> Option<&ContainerId> {
        self.selected.as_ref()
    }

    pub fn checked_ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.checked.iter()
    }

    pub fn checked_len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.checked.contains(id)
    }

    fn known(&self, id: &str) -> Option<ContainerId> {
        self.network
            .as_ref()?
            .container(id)
            .map(|c| c.id().clone())
    }

    /// Returns `true` if the selection changed.
    pub fn select_container(&mut self, id: Option<&str>) -> bool {
        let next = match id {
            Some(id) => match self.known(id) {
                Some(id) => Some(id),
                None => {
                    tracing::debug!(container = id, "ignoring selection of unknown container");
                    return false;
                }
            },
            None => None,
        };
        if next == self.selected {
            return false;
        }
        let previous = std::mem::replace(&mut self.selected, next.clone());
        self.emit(SelectionEvent::Selected {
            previous,
            current: next,
        });
        true
    }

    /// Returns `true` if the checked set changed.
    pub fn set_checked(&mut self, id: &str, checked: bool) -> bool {
        if checked {
            let Some(id) = self.known(id) else {
                tracing::debug!(container = id, "ignoring check of unknown container");
                return false;
            };
            if !self.checked.insert(id.clone()) {
                return false;
            }
            self.emit(SelectionEvent::Checked(id));
        } else {
            // Order of the remaining tabs is preserved.
            let Some(id) = self.checked.shift_take(id) else {
                return false;
            };
            self.emit(SelectionEvent::Unchecked(id));
        }
        true
    }

    pub fn filter(&self) -> &TreeFilter {
        &self.filter
    }

    /// Recomputes the visible tree. Selected and checked containers are left alone, even when
    /// they are no longer visible.
    pub fn apply_filter(&mut self, filter: TreeFilter) {
        if filter == self.filter && self.tree.is_some() {
            return;
        }
        self.filter = filter;
        self.rebuild_tree();
        self.emit(SelectionEvent::FilterChanged);
    }

    /// The visible container tree, or `None` without a network.
    pub fn tree(&self) -> Option<&TreeItem> {
        self.tree.as_ref()
    }

    fn rebuild_tree(&mut self) {
        self.tree = self
            .network
            .as_ref()
            .map(|network| build_tree(network, &self.filter));
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&SelectionEvent) + Send + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Events emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<SelectionEvent> {
        std::mem::take(&mut self.queue)
    }

    fn emit(&mut self, event: SelectionEvent) {
        self.listeners.emit(&event);
        self.queue.push(event);
    }
}
