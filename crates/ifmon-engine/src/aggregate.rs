//! Aggregation engine: folds the member interfaces of one group into a
//! single synthetic interface.

use crate::config::{GroupConfig, ItemAppearance};
use crate::discovery::{compute_item, index_padding};
use crate::iface::{Attributes, InterfaceSnapshot};
use std::collections::BTreeMap;

/// Display information of one group member, keyed by cluster node.
pub type GroupMembers = BTreeMap<Option<String>, Vec<MemberInfo>>;

/// Name and status of one group member, retained for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub oper_status_name: String,
    pub admin_status_name: Option<String>,
}

impl std::fmt::Display for MemberInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.admin_status_name {
            None => write!(f, "{} ({})", self.name, self.oper_status_name),
            Some(admin) => write!(
                f,
                "{} (op. state: {}, admin state: {admin})",
                self.name, self.oper_status_name
            ),
        }
    }
}

/// Folds the attributes of the matched members into the synthetic group
/// interface: UP if all members are up, DEGRADED if some are, DOWN if none;
/// speed and queue length accumulate over up members only.
pub fn accumulate_attributes(matching_attributes: &[&Attributes], item: &str) -> Attributes {
    let mut accumulated = Attributes {
        index: item.to_string(),
        descr: item.to_string(),
        out_qlen: Some(0.0),
        ..Attributes::default()
    };

    let mut num_up = 0;
    let mut nodes: Vec<Option<String>> = Vec::new();

    for attributes in matching_attributes {
        if !nodes.contains(&attributes.node) {
            nodes.push(attributes.node.clone());
        }
        if attributes.is_up() {
            num_up += 1;
            accumulated.speed += attributes.speed;
            accumulated.out_qlen = match (accumulated.out_qlen, attributes.out_qlen) {
                (Some(total), Some(qlen)) => Some(total + qlen),
                _ => None,
            };
        }
        accumulated.port_type = attributes.port_type.clone();
    }

    accumulated.oper_status = if num_up == matching_attributes.len() && num_up > 0 {
        Attributes::OPER_STATUS_UP
    } else if num_up > 0 {
        Attributes::OPER_STATUS_DEGRADED
    } else {
        accumulated.out_qlen = None;
        Attributes::OPER_STATUS_DOWN
    }
    .to_string();

    let mut alias_info = Vec::new();
    if nodes.len() > 1 {
        alias_info.push(format!(
            "nodes: {}",
            nodes
                .iter()
                .map(|n| n.clone().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    alias_info.push(format!("{} grouped interfaces", matching_attributes.len()));
    accumulated.alias = alias_info.join(", ");

    accumulated
}

/// Per-member display info for the group-members line. Member names follow
/// the group's member appearance; padding is enabled when the group item
/// itself carries a leading zero.
pub fn group_members(
    matching_attributes: &[&Attributes],
    group_config: &GroupConfig,
    section: &[InterfaceSnapshot],
    item: &str,
) -> GroupMembers {
    let pad = item
        .starts_with('0')
        .then(|| index_padding(section.iter().map(|s| s.attributes.index.as_str())));
    let appearance = group_config
        .member_appearance
        .unwrap_or(ItemAppearance::Index);

    let mut members: GroupMembers = BTreeMap::new();
    for attributes in matching_attributes {
        let (_, name) = compute_item(appearance, attributes, pad);
        members
            .entry(attributes.node.clone())
            .or_default()
            .push(MemberInfo {
                name,
                oper_status_name: attributes.oper_status_name().to_string(),
                admin_status_name: attributes.admin_status_name().map(str::to_string),
            });
    }
    members
}
