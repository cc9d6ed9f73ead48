//! Clustering engine: reconciles one logical item observed redundantly
//! across multiple cluster nodes.
//!
//! Ungrouped items evaluate on every node; the node with the largest
//! outbound traffic wins, as that node is most likely the active one. This
//! heuristic can misclassify for one cycle during a failover transition;
//! the behavior is kept deliberately. Grouped items pool the matching
//! members of all nodes into one aggregation, and a per-node timestamp
//! ledger flags nodes that stopped delivering or rebooted.

use crate::check::{check_multiple, rename_metrics_to_legacy, to_epoch};
use crate::config::CheckParams;
use crate::iface::InterfaceSnapshot;
use crate::store::ValueStore;
use crate::Forecaster;
use chrono::{DateTime, Utc};
use ifmon_common::types::{CheckOutput, CheckResult, Severity};
use std::collections::BTreeMap;

/// Snapshot of one cluster node: its reporting timestamp and the
/// interfaces it observed.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSection {
    pub timestamp: DateTime<Utc>,
    pub interfaces: Vec<InterfaceSnapshot>,
}

/// Runs one check cycle for `item` against the observations of all cluster
/// nodes. Interfaces are tagged with their node before evaluation, so that
/// counter baselines of different nodes never collide.
pub fn cluster_check(
    item: &str,
    params: &CheckParams,
    sections: &BTreeMap<String, NodeSection>,
    store: &mut dyn ValueStore,
    forecaster: Option<&dyn Forecaster>,
) -> Vec<CheckOutput> {
    let tagged: Vec<(InterfaceSnapshot, f64)> = sections
        .iter()
        .flat_map(|(node, node_section)| {
            let timestamp = to_epoch(node_section.timestamp);
            node_section.interfaces.iter().map(move |snapshot| {
                let mut snapshot = snapshot.clone();
                snapshot.attributes.node = Some(node.clone());
                (snapshot, timestamp)
            })
        })
        .collect();
    let section: Vec<(&InterfaceSnapshot, f64)> = tagged
        .iter()
        .map(|(snapshot, timestamp)| (snapshot, *timestamp))
        .collect();

    let mut outputs = check_multiple(item, params, &section, store, forecaster);

    if params.aggregate.is_some() {
        outputs.extend(node_timestamp_notices(store, sections));
    }

    rename_metrics_to_legacy(outputs)
}

// Flags nodes whose reporting timestamp did not advance (no new data) or
// went backwards (reboot, counter wrap) since the previous cycle.
fn node_timestamp_notices(
    store: &mut dyn ValueStore,
    sections: &BTreeMap<String, NodeSection>,
) -> Vec<CheckOutput> {
    let mut notices = Vec::new();
    for (node, node_section) in sections {
        let timestamp = to_epoch(node_section.timestamp);
        let key = format!("node_ts.{node}");
        match store.get(&key) {
            Some((previous, _)) if timestamp == previous => {
                tracing::debug!(node = %node, "node reported no new data");
                notices.push(CheckOutput::Result(CheckResult::notice(
                    Severity::Ok,
                    format!("No new data from node {node} since last check"),
                )));
            }
            Some((previous, _)) if timestamp < previous => {
                tracing::debug!(node = %node, "node timestamp went backwards");
                notices.push(CheckOutput::Result(CheckResult::notice(
                    Severity::Ok,
                    format!("Time on node {node} went backwards, expect counter reinitialization"),
                )));
            }
            _ => {}
        }
        store.set(&key, timestamp, 0.0);
    }
    notices
}
