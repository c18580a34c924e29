//! Container tree construction for the substation / voltage-level browser.

use crate::network::{Container, ContainerId, ContainerKind, Network};
use serde::{Deserialize, Serialize};

pub const FULL_NETWORK_LABEL: &str = "Full Network";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFilter {
    /// Case-insensitive substring matched against ids (or names when `show_names` is set).
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub show_names: bool,
    #[serde(default)]
    pub hide_substations: bool,
    #[serde(default)]
    pub hide_voltage_levels: bool,
}

impl TreeFilter {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn label<'a>(&self, container: &'a Container) -> &'a str {
        if self.show_names {
            container.name_or_id()
        } else {
            container.id().as_str()
        }
    }

    pub fn matches(&self, container: &Container) -> bool {
        let needle = self.text.trim();
        if needle.is_empty() {
            return true;
        }
        self.label(container)
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeItem {
    pub id: ContainerId,
    pub kind: ContainerKind,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    fn leaf(container: &Container, label: String) -> Self {
        Self {
            id: container.id().clone(),
            kind: container.kind(),
            label,
            children: Vec::new(),
        }
    }

    /// Depth-first list of every container id shown in this subtree, including `self`.
    pub fn visible_ids(&self) -> Vec<ContainerId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<ContainerId>) {
        out.push(self.id.clone());
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    pub fn find(&self, id: &str) -> Option<&TreeItem> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Builds the visible container tree for `network` under `filter`.
///
/// A substation is listed when it matches or one of its voltage levels matches (and substations
/// are not hidden); otherwise its matching voltage levels are attached to the root directly.
pub fn build_tree(network: &Network, filter: &TreeFilter) -> TreeItem {
    let mut root = TreeItem::leaf(network.root(), FULL_NETWORK_LABEL.to_string());

    for substation in network.substations() {
        let substation_ok = filter.matches(substation);
        let voltage_levels: Vec<&Container> = network
            .children(substation.id().as_str())
            .filter(|vl| substation_ok || filter.matches(vl))
            .collect();

        if (substation_ok || !voltage_levels.is_empty()) && !filter.hide_substations {
            let mut label = filter.label(substation).to_string();
            if filter.hide_voltage_levels {
                let count = network.children(substation.id().as_str()).count();
                label = format!("{label} [{count}]");
            }
            let mut item = TreeItem::leaf(substation, label);
            push_voltage_levels(&mut item, &voltage_levels, filter);
            root.children.push(item);
        } else {
            push_voltage_levels(&mut root, &voltage_levels, filter);
        }
    }

    let standalone: Vec<&Container> = network
        .standalone_voltage_levels()
        .filter(|vl| filter.matches(vl))
        .collect();
    push_voltage_levels(&mut root, &standalone, filter);

    root
}

fn push_voltage_levels(parent: &mut TreeItem, voltage_levels: &[&Container], filter: &TreeFilter) {
    if filter.hide_voltage_levels {
        return;
    }
    for vl in voltage_levels {
        parent
            .children
            .push(TreeItem::leaf(vl, filter.label(vl).to_string()));
    }
}
