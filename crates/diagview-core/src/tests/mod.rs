mod filter;
mod network;
mod params;

use crate::Network;

pub(crate) const SAMPLE_CASE: &str = include_str!("../../../../fixtures/networks/sample.json");

pub(crate) fn sample_network() -> Network {
    Network::from_json_str("sample.json", SAMPLE_CASE).unwrap()
}
