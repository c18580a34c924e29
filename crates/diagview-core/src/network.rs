//! Network container model.
//!
//! A [`Network`] is built once from a [`NetworkCase`] and then treated as immutable, except for
//! switch positions which can be toggled through [`Network::operate_switch`]. Containers (the whole
//! network, substations and voltage levels) are addressed by [`ContainerId`].

use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ContainerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerKind {
    Network,
    Substation,
    VoltageLevel,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::Substation => "SUBSTATION",
            Self::VoltageLevel => "VOLTAGE_LEVEL",
        }
    }
}

/// A diagrammable element of the network: the network itself, a substation or a voltage level.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    id: ContainerId,
    name: Option<String>,
    kind: ContainerKind,
    parent: Option<ContainerId>,
    children: Vec<ContainerId>,
}

impl Container {
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display name, falling back to the identifier when the container is unnamed.
    pub fn name_or_id(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&ContainerId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[ContainerId] {
        &self.children
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchKind {
    Breaker,
    Disconnector,
    LoadBreakSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchKind {
    #[default]
    Line,
    Transformer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub id: String,
    pub name: Option<String>,
    pub kind: SwitchKind,
    pub open: bool,
    pub voltage_level: ContainerId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: String,
    pub name: Option<String>,
    pub kind: BranchKind,
    pub voltage_level1: ContainerId,
    pub voltage_level2: ContainerId,
}

/// Case-file representation of a network, as read from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkCase {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub substations: Vec<SubstationCase>,
    /// Voltage levels that do not belong to any substation.
    #[serde(default)]
    pub voltage_levels: Vec<VoltageLevelCase>,
    #[serde(default)]
    pub branches: Vec<BranchCase>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstationCase {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub voltage_levels: Vec<VoltageLevelCase>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoltageLevelCase {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nominal_v: f64,
    #[serde(default)]
    pub switches: Vec<SwitchCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: SwitchKind,
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCase {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: BranchKind,
    pub voltage_level1: String,
    pub voltage_level2: String,
}

#[derive(Debug, Clone, PartialEq)]
struct VoltageLevelInfo {
    nominal_v: f64,
    switches: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Network {
    root: ContainerId,
    containers: IndexMap<ContainerId, Container>,
    voltage_levels: IndexMap<ContainerId, VoltageLevelInfo>,
    countries: FxHashMap<ContainerId, String>,
    switches: IndexMap<String, Switch>,
    branches: Vec<Branch>,
    adjacency: FxHashMap<ContainerId, Vec<ContainerId>>,
}

impl Network {
    pub fn from_case(case: NetworkCase) -> Result<Self> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut claim = |id: &str| -> Result<()> {
            if seen.insert(id.to_string()) {
                Ok(())
            } else {
                Err(Error::DuplicateId { id: id.to_string() })
            }
        };

        let root = ContainerId::new(case.id.clone());
        claim(&case.id)?;

        let mut network = Self {
            root: root.clone(),
            containers: IndexMap::new(),
            voltage_levels: IndexMap::new(),
            countries: FxHashMap::default(),
            switches: IndexMap::new(),
            branches: Vec::new(),
            adjacency: FxHashMap::default(),
        };
        network.containers.insert(
            root.clone(),
            Container {
                id: root.clone(),
                name: case.name,
                kind: ContainerKind::Network,
                parent: None,
                children: Vec::new(),
            },
        );

        let mut root_children = Vec::new();
        for substation in case.substations {
            claim(&substation.id)?;
            let substation_id = ContainerId::new(substation.id);
            let mut children = Vec::with_capacity(substation.voltage_levels.len());
            for vl in substation.voltage_levels {
                claim(&vl.id)?;
                for sw in &vl.switches {
                    claim(&sw.id)?;
                }
                children.push(network.insert_voltage_level(vl, &substation_id));
            }
            if let Some(country) = substation.country {
                network.countries.insert(substation_id.clone(), country);
            }
            network.containers.insert(
                substation_id.clone(),
                Container {
                    id: substation_id.clone(),
                    name: substation.name,
                    kind: ContainerKind::Substation,
                    parent: Some(root.clone()),
                    children,
                },
            );
            root_children.push(substation_id);
        }

        for vl in case.voltage_levels {
            claim(&vl.id)?;
            for sw in &vl.switches {
                claim(&sw.id)?;
            }
            root_children.push(network.insert_voltage_level(vl, &root));
        }

        if let Some(root_container) = network.containers.get_mut(&root) {
            root_container.children = root_children;
        }

        for branch in case.branches {
            claim(&branch.id)?;
            for end in [&branch.voltage_level1, &branch.voltage_level2] {
                if !network.voltage_levels.contains_key(end.as_str()) {
                    return Err(Error::UnknownVoltageLevel {
                        branch: branch.id.clone(),
                        voltage_level: end.clone(),
                    });
                }
            }
            let vl1 = ContainerId::new(branch.voltage_level1);
            let vl2 = ContainerId::new(branch.voltage_level2);
            if vl1 != vl2 {
                network
                    .adjacency
                    .entry(vl1.clone())
                    .or_default()
                    .push(vl2.clone());
                network
                    .adjacency
                    .entry(vl2.clone())
                    .or_default()
                    .push(vl1.clone());
            }
            network.branches.push(Branch {
                id: branch.id,
                name: branch.name,
                kind: branch.kind,
                voltage_level1: vl1,
                voltage_level2: vl2,
            });
        }

        tracing::debug!(
            network = %network.root,
            containers = network.containers.len(),
            switches = network.switches.len(),
            branches = network.branches.len(),
            "network loaded"
        );
        Ok(network)
    }

    fn insert_voltage_level(&mut self, vl: VoltageLevelCase, parent: &ContainerId) -> ContainerId {
        let id = ContainerId::new(vl.id);
        let mut switch_ids = Vec::with_capacity(vl.switches.len());
        for sw in vl.switches {
            switch_ids.push(sw.id.clone());
            self.switches.insert(
                sw.id.clone(),
                Switch {
                    id: sw.id,
                    name: sw.name,
                    kind: sw.kind,
                    open: sw.open,
                    voltage_level: id.clone(),
                },
            );
        }
        self.voltage_levels.insert(
            id.clone(),
            VoltageLevelInfo {
                nominal_v: vl.nominal_v,
                switches: switch_ids,
            },
        );
        self.containers.insert(
            id.clone(),
            Container {
                id: id.clone(),
                name: vl.name,
                kind: ContainerKind::VoltageLevel,
                parent: Some(parent.clone()),
                children: Vec::new(),
            },
        );
        id
    }

    /// Parses a JSON case description. Every failure is reported as [`Error::Load`].
    pub fn from_json_str(source_name: &str, text: &str) -> Result<Self> {
        let case: NetworkCase =
            serde_json::from_str(text).map_err(|err| Error::load(source_name, err))?;
        Self::from_case(case).map_err(|err| Error::load(source_name, err))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|err| Error::load(&source_name, err))?;
        Self::from_json_str(&source_name, &text)
    }

    pub fn id(&self) -> &ContainerId {
        &self.root
    }

    pub fn root(&self) -> &Container {
        // The root container is inserted first by `from_case` and never removed.
        &self.containers[0]
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.containers.contains_key(id)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn children(&self, id: &str) -> impl Iterator<Item = &Container> {
        self.containers
            .get(id)
            .map(|c| c.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.containers.get(child))
    }

    pub fn parent(&self, id: &str) -> Option<&Container> {
        let parent = self.containers.get(id)?.parent.as_ref()?;
        self.containers.get(parent)
    }

    pub fn substations(&self) -> impl Iterator<Item = &Container> {
        self.containers
            .values()
            .filter(|c| c.kind == ContainerKind::Substation)
    }

    pub fn voltage_levels(&self) -> impl Iterator<Item = &Container> {
        self.voltage_levels
            .keys()
            .filter_map(|id| self.containers.get(id))
    }

    /// Voltage levels attached directly to the network (no substation).
    pub fn standalone_voltage_levels(&self) -> impl Iterator<Item = &Container> {
        self.voltage_levels()
            .filter(|vl| vl.parent.as_ref() == Some(&self.root))
    }

    pub fn nominal_v(&self, voltage_level: &str) -> Option<f64> {
        self.voltage_levels.get(voltage_level).map(|vl| vl.nominal_v)
    }

    /// Sorted, de-duplicated list of substation countries.
    pub fn countries(&self) -> Vec<String> {
        let mut out: Vec<String> = self.countries.values().cloned().collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn country(&self, substation: &str) -> Option<&str> {
        self.countries.get(substation).map(String::as_str)
    }

    pub fn switch(&self, id: &str) -> Option<&Switch> {
        self.switches.get(id)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    pub fn switches_of(&self, voltage_level: &str) -> impl Iterator<Item = &Switch> {
        self.voltage_levels
            .get(voltage_level)
            .map(|vl| vl.switches.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.switches.get(id))
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Toggles a switch and returns its new `open` state.
    pub fn operate_switch(&mut self, id: &str) -> Result<bool> {
        let Some(sw) = self.switches.get_mut(id) else {
            return Err(Error::UnknownSwitch { id: id.to_string() });
        };
        sw.open = !sw.open;
        tracing::debug!(switch = id, open = sw.open, "switch operated");
        Ok(sw.open)
    }

    /// Voltage levels reachable from `seeds` in at most `depth` branch hops, in BFS order.
    ///
    /// Seeds that are not voltage levels of this network are ignored.
    pub fn voltage_levels_within_depth(
        &self,
        seeds: &[ContainerId],
        depth: u32,
    ) -> IndexSet<ContainerId> {
        let mut visited: IndexSet<ContainerId> = IndexSet::new();
        let mut queue: VecDeque<(ContainerId, u32)> = VecDeque::new();
        for seed in seeds {
            if self.voltage_levels.contains_key(seed) && visited.insert(seed.clone()) {
                queue.push_back((seed.clone(), 0));
            }
        }
        while let Some((vl, hops)) = queue.pop_front() {
            if hops >= depth {
                continue;
            }
            let Some(neighbors) = self.adjacency.get(&vl) else {
                continue;
            };
            for next in neighbors {
                if visited.insert(next.clone()) {
                    queue.push_back((next.clone(), hops + 1));
                }
            }
        }
        visited
    }
}
