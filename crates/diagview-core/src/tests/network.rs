use super::sample_network;
use crate::*;

fn ids<'a>(it: impl Iterator<Item = &'a Container>) -> Vec<&'a str> {
    it.map(|c| c.id().as_str()).collect()
}

#[test]
fn network_case_builds_container_hierarchy() {
    let network = sample_network();
    assert_eq!(network.id().as_str(), "grid");
    assert_eq!(network.root().kind(), ContainerKind::Network);
    assert_eq!(network.root().name(), Some("Test grid"));

    assert_eq!(ids(network.substations()), vec!["S1", "S2"]);
    assert_eq!(ids(network.voltage_levels()), vec!["VL1", "VL2", "VL3", "VL4"]);
    assert_eq!(ids(network.children("S1")), vec!["VL1", "VL2"]);
    assert_eq!(ids(network.children("grid")), vec!["S1", "S2", "VL4"]);
    assert_eq!(ids(network.standalone_voltage_levels()), vec!["VL4"]);

    assert_eq!(network.parent("VL3").map(|c| c.id().as_str()), Some("S2"));
    assert_eq!(network.parent("VL4").map(|c| c.id().as_str()), Some("grid"));
    assert!(network.parent("grid").is_none());

    let vl2 = network.container("VL2").unwrap();
    assert_eq!(vl2.name(), None);
    assert_eq!(vl2.name_or_id(), "VL2");
    assert_eq!(network.nominal_v("VL1"), Some(400.0));
}

#[test]
fn network_countries_are_sorted_and_deduplicated() {
    let network = sample_network();
    assert_eq!(network.countries(), vec!["BE".to_string(), "FR".to_string()]);
    assert_eq!(network.country("S1"), Some("FR"));
    assert_eq!(network.country("VL4"), None);
}

#[test]
fn network_rejects_duplicate_ids() {
    let text = r#"{
      "id": "g",
      "voltage_levels": [ { "id": "A" }, { "id": "A" } ]
    }"#;
    let err = Network::from_json_str("dup.json", text).unwrap_err();
    assert!(err.is_load_error());
    assert!(err.to_string().contains("duplicate identifier in network: A"));
}

#[test]
fn network_rejects_branch_to_unknown_voltage_level() {
    let text = r#"{
      "id": "g",
      "voltage_levels": [ { "id": "A" } ],
      "branches": [ { "id": "L", "voltage_level1": "A", "voltage_level2": "B" } ]
    }"#;
    let err = Network::from_json_str("branch.json", text).unwrap_err();
    assert!(err.is_load_error());
    assert!(err.to_string().contains("unknown voltage level B"));
}

#[test]
fn network_from_json_str_maps_syntax_errors_to_load_errors() {
    let err = Network::from_json_str("broken.json", "{ not json").unwrap_err();
    assert!(matches!(err, Error::Load { ref source_name, .. } if source_name == "broken.json"));
}

#[test]
fn network_from_path_reports_missing_files_as_load_errors() {
    let err = Network::from_path("/definitely/not/here/case.json").unwrap_err();
    assert!(err.is_load_error());
}

#[test]
fn network_operate_switch_toggles_state() {
    let mut network = sample_network();
    assert!(!network.switch("BK1").unwrap().open);
    assert!(network.operate_switch("BK1").unwrap());
    assert!(network.switch("BK1").unwrap().open);
    assert!(!network.operate_switch("BK1").unwrap());

    let err = network.operate_switch("nope").unwrap_err();
    assert!(matches!(err, Error::UnknownSwitch { ref id } if id == "nope"));
}

#[test]
fn network_switches_of_voltage_level_keep_case_order() {
    let network = sample_network();
    let ids: Vec<&str> = network.switches_of("VL1").map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["BK1", "DS1"]);
    assert_eq!(network.switches_of("VL2").count(), 0);
    assert_eq!(network.switch("DS1").unwrap().voltage_level.as_str(), "VL1");
}

#[test]
fn network_depth_traversal_follows_branches() {
    let network = sample_network();
    let seeds = [ContainerId::from("VL2")];

    let depth0_set = network.voltage_levels_within_depth(&seeds, 0);
    let depth0: Vec<&str> = depth0_set
        .iter()
        .map(ContainerId::as_str)
        .collect::<Vec<_>>();
    assert_eq!(depth0, vec!["VL2"]);

    let depth1 = network.voltage_levels_within_depth(&seeds, 1);
    assert_eq!(depth1.len(), 2);
    assert!(depth1.contains("VL1"));

    let depth3: Vec<String> = network
        .voltage_levels_within_depth(&seeds, 3)
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(depth3, vec!["VL2", "VL1", "VL3", "VL4"]);
}

#[test]
fn network_depth_traversal_ignores_unknown_seeds() {
    let network = sample_network();
    let seeds = [ContainerId::from("S1"), ContainerId::from("ghost")];
    assert!(network.voltage_levels_within_depth(&seeds, 2).is_empty());
}
