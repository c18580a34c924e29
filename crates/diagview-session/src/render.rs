//! Renderer contract and cached render results.

use diagview_core::{Container, ContainerId, ContainerKind, Network, RenderParameters};
use serde::Serialize;
use std::sync::Arc;

/// Produces a diagram for one container.
///
/// Implementations are called from worker threads, possibly concurrently for different
/// containers, and must not rely on shared mutable state.
pub trait DiagramRenderer: Send + Sync + 'static {
    fn render(&self, request: &RenderRequest) -> Result<DiagramDocument, RenderError>;
}

impl<F> DiagramRenderer for F
where
    F: Fn(&RenderRequest) -> Result<DiagramDocument, RenderError> + Send + Sync + 'static,
{
    fn render(&self, request: &RenderRequest) -> Result<DiagramDocument, RenderError> {
        self(request)
    }
}

/// Rendered artifacts for one container: SVG content, metadata JSON and auxiliary graph JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagramDocument {
    pub svg: String,
    pub metadata: String,
    pub graph: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("diagram rendering failed: {message}")]
    Failed { message: String },

    #[error("{} diagrams are not supported by this renderer", .kind.as_str())]
    Unsupported { kind: ContainerKind },

    #[error("renderer panicked: {message}")]
    Panicked { message: String },
}

impl RenderError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: err.to_string(),
        }
    }
}

/// The part of a render key that depends on the container itself.
///
/// Substations are keyed by their member voltage levels, voltage levels by their own id; both
/// also carry the traversal depth. Whole-network diagrams ignore depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RenderScope {
    pub kind: ContainerKind,
    pub voltage_levels: Vec<ContainerId>,
    pub depth: u32,
}

impl RenderScope {
    pub fn for_container(network: &Network, container: &Container, depth: u32) -> Self {
        match container.kind() {
            ContainerKind::Network => Self {
                kind: ContainerKind::Network,
                voltage_levels: Vec::new(),
                depth: 0,
            },
            ContainerKind::Substation => Self {
                kind: ContainerKind::Substation,
                voltage_levels: network
                    .children(container.id().as_str())
                    .map(|vl| vl.id().clone())
                    .collect(),
                depth,
            },
            ContainerKind::VoltageLevel => Self {
                kind: ContainerKind::VoltageLevel,
                voltage_levels: vec![container.id().clone()],
                depth,
            },
        }
    }
}

/// Network and parameter state a render was requested at.
///
/// `epoch` changes on network (re)load, `parameters` is the parameter store version and
/// `revision` counts in-place network mutations (switch operations, load flow).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation {
    pub epoch: u64,
    pub parameters: u64,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub generation: Generation,
    pub scope: RenderScope,
}

/// Everything a renderer needs for one job.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub network: Arc<Network>,
    pub container: ContainerId,
    pub scope: RenderScope,
    pub parameters: Arc<RenderParameters>,
}

impl RenderRequest {
    /// Voltage levels the diagram should show: every one for the whole network, otherwise the
    /// scope's voltage levels expanded by `depth` branch hops.
    pub fn voltage_levels_in_view(&self) -> Vec<ContainerId> {
        match self.scope.kind {
            ContainerKind::Network => self
                .network
                .voltage_levels()
                .map(|vl| vl.id().clone())
                .collect(),
            _ => self
                .network
                .voltage_levels_within_depth(&self.scope.voltage_levels, self.scope.depth)
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RenderResult {
    #[default]
    Idle,
    Pending {
        generation: Generation,
    },
    Ready {
        document: Arc<DiagramDocument>,
        generation: Generation,
    },
    Failed {
        error: RenderError,
        generation: Generation,
    },
}

impl RenderResult {
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::Idle => None,
            Self::Pending { generation }
            | Self::Ready { generation, .. }
            | Self::Failed { generation, .. } => Some(*generation),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn document(&self) -> Option<&Arc<DiagramDocument>> {
        match self {
            Self::Ready { document, .. } => Some(document),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RenderError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
