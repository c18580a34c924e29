use crate::*;
use diagview_core::{ParameterPatch, RenderParameters};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[test]
fn update_merges_patch_and_bumps_version() {
    let mut store = ParameterStore::default();
    let before = store.current();

    let patch = ParameterPatch::empty_object().with("layout.spring_repulsion_factor", json!(0.4));
    assert_eq!(store.update(&patch).unwrap(), 1);

    let after = store.current();
    assert_eq!(after.version, 1);
    assert_eq!(after.parameters.layout.spring_repulsion_factor, 0.4);
    // The previous snapshot is untouched.
    assert_eq!(before.parameters.layout.spring_repulsion_factor, 0.0);
}

#[test]
fn identical_update_keeps_version() {
    let mut store = ParameterStore::default();
    let patch = ParameterPatch::empty_object().with("depth", json!(1));
    assert_eq!(store.update(&patch).unwrap(), 0);
    assert_eq!(store.update_with(|_| {}).unwrap(), 0);
}

#[test]
fn invalid_update_is_rejected_without_bump() {
    let mut store = ParameterStore::default();
    let patch = ParameterPatch::empty_object().with("svg.fixed_scale", json!(-1.0));
    assert!(store.update(&patch).is_err());
    assert!(store.update_with(|p| p.layout.cell_width = 0.0).is_err());
    assert_eq!(store.version(), 0);
    assert_eq!(*store.parameters(), RenderParameters::default());
}

#[test]
fn subscribers_are_notified_synchronously() {
    let mut store = ParameterStore::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.version));

    store.update_with(|p| p.show_names = true).unwrap();
    store.update_with(|p| p.show_names = true).unwrap();
    store.update_with(|p| p.depth = 3).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn store_rejects_invalid_initial_parameters() {
    let mut parameters = RenderParameters::default();
    parameters.layout.scale_factor = f64::NAN;
    assert!(ParameterStore::new(parameters).is_err());
}

#[test]
fn non_finite_update_leaves_store_usable() {
    let mut store = ParameterStore::default();
    assert!(store.update_with(|p| p.layout.stack_height = f64::NAN).is_err());
    assert!(
        store
            .update_with(|p| p.style.animation_threshold2 = f64::INFINITY)
            .is_err()
    );
    assert_eq!(store.version(), 0);

    assert_eq!(store.update_with(|_| {}).unwrap(), 0);
    let patch = ParameterPatch::empty_object().with("depth", json!(3));
    assert_eq!(store.update(&patch).unwrap(), 1);
    assert_eq!(store.parameters().depth, 3);
}
