mod binder;
mod executor;
mod store;

use crate::*;
use diagview_core::Network;
use rustc_hash::FxHashSet;
use std::sync::{Arc, Mutex};

pub(crate) const SAMPLE_CASE: &str = include_str!("../../../../fixtures/networks/sample.json");

pub(crate) fn sample_network() -> Network {
    Network::from_json_str("sample.json", SAMPLE_CASE).unwrap()
}

/// Renderer whose outcome per container is scripted by the test.
#[derive(Clone, Default)]
pub(crate) struct FakeRenderer {
    calls: Arc<Mutex<Vec<RenderRequest>>>,
    failing: Arc<Mutex<FxHashSet<String>>>,
    panicking: Arc<Mutex<FxHashSet<String>>>,
}

impl FakeRenderer {
    pub(crate) fn fail(&self, container: &str, fail: bool) {
        let mut failing = self.failing.lock().unwrap();
        if fail {
            failing.insert(container.to_string());
        } else {
            failing.remove(container);
        }
    }

    pub(crate) fn panic_on(&self, container: &str) {
        self.panicking.lock().unwrap().insert(container.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<RenderRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DiagramRenderer for FakeRenderer {
    fn render(
        &self,
        request: &RenderRequest,
    ) -> std::result::Result<DiagramDocument, RenderError> {
        self.calls.lock().unwrap().push(request.clone());
        let id = request.container.as_str();
        if self.panicking.lock().unwrap().contains(id) {
            panic!("layout exploded for {id}");
        }
        if self.failing.lock().unwrap().contains(id) {
            return Err(RenderError::failed(format!("cannot lay out {id}")));
        }
        let in_view: Vec<String> = request
            .voltage_levels_in_view()
            .iter()
            .map(|vl| vl.to_string())
            .collect();
        Ok(DiagramDocument {
            svg: format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" data-container="{id}" data-depth="{}"/>"#,
                request.scope.depth
            ),
            metadata: r#"{"nodes":[]}"#.to_string(),
            graph: serde_json::json!({ "voltage_levels": in_view }).to_string(),
        })
    }
}

pub(crate) fn readies(events: &[SessionEvent]) -> Vec<&SessionEvent> {
    events.iter().filter(|e| e.result.is_ready()).collect()
}
