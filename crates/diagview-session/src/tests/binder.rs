use crate::*;
use diagview_core::{ContainerId, DiagramEvent};
use std::sync::Arc;

fn id(s: &str) -> ContainerId {
    ContainerId::from(s)
}

fn ready(slot: Slot, container: &str) -> SessionEvent {
    SessionEvent {
        slot,
        container: id(container),
        result: RenderResult::Ready {
            document: Arc::new(DiagramDocument {
                svg: format!("<svg id=\"{container}\"/>"),
                ..DiagramDocument::default()
            }),
            generation: Generation::default(),
        },
    }
}

#[test]
fn new_tabs_show_loading_and_become_active() {
    let mut binder = TabBinder::new();
    binder.on_checked_added(id("VL1"), "VL1", "North 400 (400 kV)");
    binder.on_checked_added(id("VL2"), "VL2", "VL2");

    assert_eq!(binder.tab_count(), 2);
    assert!(binder.tab("VL1").unwrap().content.is_loading());
    assert_eq!(binder.active_tab().unwrap().container, id("VL2"));
    assert_eq!(binder.tab("VL1").unwrap().tooltip, "North 400 (400 kV)");
}

#[test]
fn apply_routes_results_to_the_right_pane() {
    let mut binder = TabBinder::new();
    binder.on_selected(Some(id("S1")));
    binder.on_checked_added(id("VL1"), "VL1", "VL1");

    assert!(binder.apply(&ready(Slot::Checked(id("VL1")), "VL1")));
    assert!(binder.apply(&ready(Slot::Selected, "S1")));
    // A result for a container that is no longer selected.
    assert!(!binder.apply(&ready(Slot::Selected, "S2")));

    let tab = binder.tab("VL1").unwrap();
    assert_eq!(tab.content.document().unwrap().svg, "<svg id=\"VL1\"/>");
    assert_eq!(
        binder.selected_content().document().unwrap().svg,
        "<svg id=\"S1\"/>"
    );
}

#[test]
fn failures_show_error_text() {
    let mut binder = TabBinder::new();
    binder.on_checked_added(id("VL1"), "VL1", "VL1");
    binder.apply(&SessionEvent {
        slot: Slot::Checked(id("VL1")),
        container: id("VL1"),
        result: RenderResult::Failed {
            error: RenderError::failed("no layout"),
            generation: Generation::default(),
        },
    });
    assert_eq!(
        binder.tab("VL1").unwrap().content,
        PaneContent::Error("diagram rendering failed: no layout".to_string())
    );
}

#[test]
fn results_for_closed_tabs_are_ignored() {
    let mut binder = TabBinder::new();
    binder.on_checked_added(id("VL1"), "VL1", "VL1");
    assert!(binder.on_checked_removed("VL1"));
    assert!(!binder.on_checked_removed("VL1"));
    assert!(!binder.apply(&ready(Slot::Checked(id("VL1")), "VL1")));
    assert_eq!(binder.tab_count(), 0);
    assert!(binder.active_tab().is_none());
}

#[test]
fn closing_active_tab_moves_focus_to_neighbour() {
    let mut binder = TabBinder::new();
    for c in ["VL1", "VL2", "VL3"] {
        binder.on_checked_added(id(c), c, c);
    }
    assert!(binder.set_active("VL2"));
    binder.on_checked_removed("VL2");
    assert_eq!(binder.active_tab().unwrap().container, id("VL3"));

    binder.on_checked_removed("VL3");
    assert_eq!(binder.active_tab().unwrap().container, id("VL1"));
}

#[test]
fn close_tab_and_clicks_become_commands() {
    let mut binder = TabBinder::new();
    binder.on_checked_added(id("VL1"), "VL1", "VL1");

    assert_eq!(
        binder.close_tab("VL1"),
        Some(BinderCommand::Uncheck(id("VL1")))
    );
    assert_eq!(binder.close_tab("VL9"), None);
    // Closing is only a request; the tab stays until the container is unchecked.
    assert_eq!(binder.tab_count(), 1);

    assert_eq!(
        binder.on_diagram_event(DiagramEvent::ContainerClicked {
            container: id("VL3")
        }),
        BinderCommand::Select(id("VL3"))
    );
    assert_eq!(
        binder.on_diagram_event(DiagramEvent::SwitchClicked {
            switch: "BK1".to_string()
        }),
        BinderCommand::OperateSwitch("BK1".to_string())
    );
}
