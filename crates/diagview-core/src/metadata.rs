//! Diagram metadata produced next to the SVG, and click resolution against it.

use crate::Result;
use crate::network::ContainerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataNodeKind {
    Switch,
    Feeder,
    Bus,
    VoltageLevel,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataNode {
    /// SVG element id.
    pub id: String,
    #[serde(default)]
    pub kind: MetadataNodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    /// Voltage level a feeder leads to, when the diagram allows navigating there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_voltage_level_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramMetadata {
    #[serde(default)]
    pub nodes: Vec<MetadataNode>,
}

/// A click on a rendered diagram, already mapped to network identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramEvent {
    ContainerClicked { container: ContainerId },
    SwitchClicked { switch: String },
}

impl DiagramMetadata {
    pub fn from_json_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn node(&self, svg_id: &str) -> Option<&MetadataNode> {
        self.nodes.iter().find(|n| n.id == svg_id)
    }

    /// Maps a clicked SVG element to the event it stands for.
    ///
    /// Navigation wins over switching when a node carries both.
    pub fn resolve(&self, svg_id: &str) -> Option<DiagramEvent> {
        let node = self.node(svg_id)?;
        if let Some(next) = node.next_voltage_level_id.as_deref() {
            return Some(DiagramEvent::ContainerClicked {
                container: ContainerId::from(next),
            });
        }
        match (node.kind, node.equipment_id.as_deref()) {
            (MetadataNodeKind::Switch, Some(equipment)) => Some(DiagramEvent::SwitchClicked {
                switch: equipment.to_string(),
            }),
            _ => None,
        }
    }
}
