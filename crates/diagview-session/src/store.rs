//! Versioned render parameters.

use crate::listeners::{ListenerId, Listeners};
use diagview_core::{ParameterPatch, RenderParameters, Result};
use std::sync::Arc;

/// The current parameters together with the version they were published at.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSnapshot {
    pub version: u64,
    pub parameters: Arc<RenderParameters>,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            parameters: Arc::new(RenderParameters::default()),
        }
    }
}

/// Holds the current [`RenderParameters`] as an immutable snapshot.
///
/// Every accepted change replaces the snapshot, bumps the version and notifies subscribers
/// before returning.
#[derive(Default)]
pub struct ParameterStore {
    current: ParameterSnapshot,
    listeners: Listeners<ParameterSnapshot>,
}

impl ParameterStore {
    pub fn new(parameters: RenderParameters) -> Result<Self> {
        parameters.validate()?;
        Ok(Self {
            current: ParameterSnapshot {
                version: 0,
                parameters: Arc::new(parameters),
            },
            listeners: Listeners::default(),
        })
    }

    pub fn current(&self) -> ParameterSnapshot {
        self.current.clone()
    }

    pub fn version(&self) -> u64 {
        self.current.version
    }

    pub fn parameters(&self) -> &RenderParameters {
        &self.current.parameters
    }

    /// Deep-merges `patch` onto the current parameters and returns the resulting version.
    ///
    /// A rejected patch leaves parameters and version untouched.
    pub fn update(&mut self, patch: &ParameterPatch) -> Result<u64> {
        let next = self.current.parameters.merged(patch)?;
        Ok(self.publish(next))
    }

    pub fn update_with(&mut self, f: impl FnOnce(&mut RenderParameters)) -> Result<u64> {
        let mut next = RenderParameters::clone(&self.current.parameters);
        f(&mut next);
        next.validate()?;
        Ok(self.publish(next))
    }

    pub fn replace(&mut self, parameters: RenderParameters) -> Result<u64> {
        parameters.validate()?;
        Ok(self.publish(parameters))
    }

    fn publish(&mut self, next: RenderParameters) -> u64 {
        if next == *self.current.parameters {
            return self.current.version;
        }
        self.current = ParameterSnapshot {
            version: self.current.version + 1,
            parameters: Arc::new(next),
        };
        tracing::debug!(version = self.current.version, "render parameters updated");
        self.listeners.emit(&self.current);
        self.current.version
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&ParameterSnapshot) + Send + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
