#![forbid(unsafe_code)]

//! Network container model, tree filtering and render parameters (headless).
//!
//! This crate holds the plain data side of a diagram viewer:
//! - [`Network`]: substations, voltage levels, switches and branches loaded from a JSON case
//! - [`filter::build_tree`]: the browsable container tree under a [`TreeFilter`]
//! - [`RenderParameters`] and [`ParameterPatch`]: immutable parameters plus deep-merge patches
//! - [`DiagramMetadata`]: maps clicked SVG elements back to network ids

pub mod error;
pub mod filter;
pub mod metadata;
pub mod network;
pub mod params;

pub use error::{Error, Result};
pub use filter::{FULL_NETWORK_LABEL, TreeFilter, TreeItem, build_tree};
pub use metadata::{DiagramEvent, DiagramMetadata, MetadataNode, MetadataNodeKind};
pub use network::{
    Branch, BranchCase, BranchKind, Container, ContainerId, ContainerKind, Network, NetworkCase,
    SubstationCase, Switch, SwitchCase, SwitchKind, VoltageLevelCase,
};
pub use params::{ParameterPatch, RenderParameters, SizeConstraint, SvgSize};

#[cfg(test)]
mod tests;
