use super::sample_network;
use crate::*;

fn labels(item: &TreeItem) -> Vec<&str> {
    item.children.iter().map(|c| c.label.as_str()).collect()
}

#[test]
fn tree_without_filter_lists_every_container() {
    let network = sample_network();
    let tree = build_tree(&network, &TreeFilter::default());

    assert_eq!(tree.label, FULL_NETWORK_LABEL);
    assert_eq!(tree.kind, ContainerKind::Network);
    assert_eq!(labels(&tree), vec!["S1", "S2", "VL4"]);
    assert_eq!(labels(tree.find("S1").unwrap()), vec!["VL1", "VL2"]);

    let all: Vec<String> = tree.visible_ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(all, vec!["grid", "S1", "VL1", "VL2", "S2", "VL3", "VL4"]);
}

#[test]
fn tree_filter_matches_ids_case_insensitively() {
    let network = sample_network();
    let tree = build_tree(&network, &TreeFilter::with_text("  vl3 "));

    assert_eq!(labels(&tree), vec!["S2"]);
    assert_eq!(labels(tree.find("S2").unwrap()), vec!["VL3"]);
    assert!(tree.find("VL1").is_none());
}

#[test]
fn tree_filter_on_names_keeps_whole_matching_substation() {
    let network = sample_network();
    let filter = TreeFilter {
        text: "north".to_string(),
        show_names: true,
        ..TreeFilter::default()
    };
    let tree = build_tree(&network, &filter);

    assert_eq!(labels(&tree), vec!["North"]);
    // VL2 has no name and falls back to its id.
    assert_eq!(labels(tree.find("S1").unwrap()), vec!["North 400", "VL2"]);
}

#[test]
fn tree_hiding_substations_attaches_voltage_levels_to_root() {
    let network = sample_network();
    let filter = TreeFilter {
        hide_substations: true,
        ..TreeFilter::default()
    };
    let tree = build_tree(&network, &filter);
    assert_eq!(labels(&tree), vec!["VL1", "VL2", "VL3", "VL4"]);
}

#[test]
fn tree_hiding_voltage_levels_counts_them_on_substations() {
    let network = sample_network();
    let filter = TreeFilter {
        hide_voltage_levels: true,
        ..TreeFilter::default()
    };
    let tree = build_tree(&network, &filter);
    assert_eq!(labels(&tree), vec!["S1 [2]", "S2 [1]"]);
    assert!(tree.children.iter().all(|c| c.children.is_empty()));
}

#[test]
fn tree_filter_without_match_leaves_only_root() {
    let network = sample_network();
    let tree = build_tree(&network, &TreeFilter::with_text("zzz"));
    assert!(tree.children.is_empty());
    assert_eq!(tree.visible_ids().len(), 1);
}
