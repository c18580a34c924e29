#![forbid(unsafe_code)]

//! Diagram render session (headless).
//!
//! - [`SelectionModel`]: selected / checked containers and the filtered tree
//! - [`ParameterStore`]: versioned [`diagview_core::RenderParameters`] snapshots
//! - [`RenderSession`]: per-container asynchronous rendering with staleness checks
//! - [`TabBinder`]: tab set and pane contents derived from the above
//! - [`Viewer`]: owns all of them and wires them together
//!
//! No global state is used; any number of viewers can coexist.

pub mod binder;
pub mod error;
pub mod executor;
mod listeners;
pub mod render;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;
pub mod viewer;

pub use binder::{BinderCommand, PaneContent, Tab, TabBinder};
pub use error::{Error, Result};
pub use executor::{InlineExecutor, ManualExecutor, PoolExecutor, RenderExecutor, RenderJob};
pub use listeners::ListenerId;
pub use render::{
    DiagramDocument, DiagramRenderer, Generation, RenderError, RenderKey, RenderRequest,
    RenderResult, RenderScope,
};
pub use selection::{SelectionEvent, SelectionModel};
pub use session::{RenderSession, SessionConfig, SessionEvent, Slot, Waker};
pub use state::ViewerState;
pub use store::{ParameterSnapshot, ParameterStore};
pub use viewer::Viewer;

#[cfg(test)]
mod tests;
