//! Discovery engine: decides which interfaces of a snapshot become
//! individually monitored items, how they are named, and which are grouped.
//!
//! Rules are evaluated most-specific-first; the first rule carrying
//! per-interface discovery settings whose matching conditions hold wins.
//! Never mutates its input.

use crate::config::{
    DiscoveryRuleset, GroupConfig, GroupConfigSpec, GroupingSpec, ItemAppearance,
    SingleDiscoverySpec,
};
use crate::iface::{Attributes, InterfaceSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Baseline parameters recorded at discovery time, persisted by the
/// scheduler and merged into the check parameters of later cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveredParams {
    pub item_appearance: Option<ItemAppearance>,
    pub discovered_oper_status: Option<Vec<String>>,
    pub discovered_admin_status: Option<Vec<String>>,
    pub discovered_speed: Option<f64>,
    /// Present on grouped items; defines the member set.
    pub aggregate: Option<GroupConfigSpec>,
}

/// One discovered service item: a stable name, its discovered baseline
/// parameters and optional service labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub item: String,
    pub parameters: DiscoveredParams,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

struct PreItem {
    item: String,
    parameters: DiscoveredParams,
    index: i64,
    index_as_item: bool,
    labels: BTreeMap<String, String>,
}

struct DiscoveredGroup {
    spec: GroupConfigSpec,
    compiled: GroupConfig,
    labels: BTreeMap<String, String>,
}

/// Runs discovery over one snapshot. Single interfaces come first in
/// section order, groups follow in name order.
pub fn discover_interfaces(
    ruleset: &DiscoveryRuleset,
    section: &[InterfaceSnapshot],
) -> Vec<ServiceItem> {
    if section.is_empty() {
        return Vec::new();
    }

    let digits = index_padding(section.iter().map(|s| s.attributes.index.as_str()));

    let mut pre_inventory: Vec<PreItem> = Vec::new();
    let mut seen_indices: HashSet<&str> = HashSet::new();
    let mut n_times_item_seen: HashMap<String, u32> = HashMap::new();
    let mut interface_groups: BTreeMap<String, DiscoveredGroup> = BTreeMap::new();

    for snapshot in section {
        let attributes = &snapshot.attributes;

        // Most specific rule with single-interface settings wins; with no
        // match the interface stays undiscovered but still contributes to
        // the collision bookkeeping below.
        let matched = ruleset.rules().iter().find_map(|rule| match &rule.discovery_single {
            Some(single) if rule.matching_conditions.matches(attributes) => Some(single.clone()),
            _ => None,
        });
        let (discover, settings) = match matched {
            Some(single) => (single.discover, single),
            None => (false, SingleDiscoverySpec::default()),
        };
        let pad = settings.pad_portnumbers.then_some(digits);

        // Count every way this interface could be named, so that duplicate
        // names get disambiguated no matter which appearance is configured.
        let mut appearances = vec![ItemAppearance::Index, ItemAppearance::Descr];
        if attributes.descr != attributes.alias {
            appearances.push(ItemAppearance::Alias);
        }
        for appearance in appearances {
            let (_, name) = compute_item(appearance, attributes, pad);
            *n_times_item_seen.entry(name).or_default() += 1;
        }

        let (used_appearance, item) = compute_item(settings.item_appearance, attributes, pad);

        if discover && !seen_indices.contains(attributes.index.as_str()) {
            let index_as_item = match (item.parse::<i64>(), attributes.index.parse::<i64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            };
            pre_inventory.push(PreItem {
                item,
                parameters: DiscoveredParams {
                    item_appearance: Some(used_appearance),
                    discovered_oper_status: Some(vec![attributes.oper_status.clone()]),
                    discovered_admin_status: attributes
                        .admin_status
                        .as_ref()
                        .map(|a| vec![a.clone()]),
                    discovered_speed: Some(attributes.speed),
                    aggregate: None,
                },
                index: attributes.index.parse().unwrap_or(0),
                index_as_item,
                labels: settings.labels.clone(),
            });
            seen_indices.insert(attributes.index.as_str());
        }

        // Source-tagged group: matched by tag, not by conditions.
        if let Some(group) = &attributes.group {
            interface_groups
                .entry(group.clone())
                .or_insert_with(|| DiscoveredGroup {
                    spec: GroupConfigSpec {
                        member_appearance: Some(settings.item_appearance),
                        ..GroupConfigSpec::default()
                    },
                    compiled: GroupConfig {
                        member_appearance: Some(settings.item_appearance),
                        inclusion_condition: None,
                        exclusion_conditions: Vec::new(),
                    },
                    labels: BTreeMap::new(),
                });
        }
    }

    // Rule-defined groups override source-tagged groups of the same name.
    interface_groups.extend(groups_from_rules(ruleset));

    for (group_name, group) in &interface_groups {
        let mut has_members = false;
        let mut group_oper_status = Attributes::OPER_STATUS_DOWN;
        let mut group_speed = 0.0;

        for snapshot in section {
            if group.compiled.matches(&snapshot.attributes, group_name) {
                has_members = true;
                if snapshot.attributes.is_up() {
                    group_oper_status = Attributes::OPER_STATUS_UP;
                }
                group_speed += snapshot.attributes.speed;
            }
        }

        if has_members {
            tracing::debug!(group = %group_name, "discovered interface group");
            pre_inventory.push(PreItem {
                item: group_name.clone(),
                parameters: DiscoveredParams {
                    item_appearance: None,
                    discovered_oper_status: Some(vec![group_oper_status.to_string()]),
                    discovered_admin_status: None,
                    discovered_speed: Some(group_speed),
                    aggregate: Some(group.spec.clone()),
                },
                // Group items always use interface index 1.
                index: 1,
                index_as_item: false,
                labels: group.labels.clone(),
            });
        }
    }

    pre_inventory
        .into_iter()
        .map(|pre| {
            let colliding = !pre.index_as_item
                && n_times_item_seen.get(&pre.item).copied().unwrap_or(0) > 1;
            ServiceItem {
                item: if colliding {
                    format!("{} {}", pre.item, pre.index)
                } else {
                    pre.item
                },
                parameters: pre.parameters,
                labels: pre.labels,
            }
        })
        .collect()
}

// Groups defined in rules: the most specific rule defining a group name
// wins; exclusion conditions ("do not group") apply to a group only when
// they come from a more specific rule than the group's inclusion.
fn groups_from_rules(ruleset: &DiscoveryRuleset) -> BTreeMap<String, DiscoveredGroup> {
    let mut groups: BTreeMap<String, DiscoveredGroup> = BTreeMap::new();
    let mut inclusion_importances: HashMap<String, usize> = HashMap::new();
    let mut exclusions: Vec<(usize, &crate::config::MatchingConditions)> = Vec::new();

    // Iterate least-specific-first so more specific rules overwrite.
    for (importance, rule) in ruleset.rules().iter().rev().enumerate() {
        match &rule.grouping {
            Some(GroupingSpec::Create { group_items, labels }) => {
                for group_item in group_items {
                    groups.insert(
                        group_item.group_name.clone(),
                        DiscoveredGroup {
                            spec: GroupConfigSpec {
                                member_appearance: Some(group_item.member_appearance),
                                inclusion_condition: Some(rule.matching_conditions.spec().clone()),
                                exclusion_conditions: Vec::new(),
                                labels: BTreeMap::new(),
                            },
                            compiled: GroupConfig {
                                member_appearance: Some(group_item.member_appearance),
                                inclusion_condition: Some(rule.matching_conditions.clone()),
                                exclusion_conditions: Vec::new(),
                            },
                            labels: labels.clone(),
                        },
                    );
                    inclusion_importances.insert(group_item.group_name.clone(), importance);
                }
            }
            Some(GroupingSpec::DoNotGroup) => {
                exclusions.push((importance, &rule.matching_conditions));
            }
            None => {}
        }
    }

    for (group_name, group) in &mut groups {
        let inclusion_importance = inclusion_importances.get(group_name).copied().unwrap_or(0);
        for (exclusion_importance, conditions) in &exclusions {
            if *exclusion_importance > inclusion_importance {
                group.spec.exclusion_conditions.push(conditions.spec().clone());
                group.compiled.exclusion_conditions.push((*conditions).clone());
            }
        }
    }

    groups
}

/// Width of the zero-padding that makes padded indices of this section sort
/// lexicographically: the digit count of the largest numeric index.
pub(crate) fn index_padding<'a>(indices: impl Iterator<Item = &'a str>) -> usize {
    indices
        .filter_map(|i| i.parse::<u64>().ok())
        .max()
        .map_or(1, |max| max.to_string().len())
}

/// Computes the item name of one interface under the given appearance
/// policy, falling back to the (optionally padded) index when the preferred
/// field is empty. Returns the appearance actually used.
pub(crate) fn compute_item(
    appearance: ItemAppearance,
    attributes: &Attributes,
    pad_digits: Option<usize>,
) -> (ItemAppearance, String) {
    match appearance {
        ItemAppearance::Descr if !attributes.descr.is_empty() => {
            (ItemAppearance::Descr, attributes.descr.clone())
        }
        ItemAppearance::Alias if !attributes.alias.is_empty() => {
            (ItemAppearance::Alias, attributes.alias.clone())
        }
        _ => (
            ItemAppearance::Index,
            pad_index(&attributes.index, pad_digits),
        ),
    }
}

fn pad_index(index: &str, pad_digits: Option<usize>) -> String {
    match (pad_digits, index.parse::<u64>()) {
        (Some(digits), Ok(numeric)) => format!("{numeric:0digits$}"),
        _ => index.to_string(),
    }
}
