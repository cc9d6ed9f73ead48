//! Check-cycle evaluation: assembles rates and averages for the matched
//! interfaces, applies thresholds and state mappings and composes the final
//! ordered output sequence.

use crate::aggregate::{accumulate_attributes, group_members, GroupMembers};
use crate::average::{backlog_average, Average};
use crate::config::{
    BandwidthUnit, CheckParams, GroupConfig, ItemAppearance, InfotextFormat, PacketLevel,
};
use crate::iface::{render_mac_address, Attributes, InterfaceSnapshot};
use crate::levels::{bandwidth_levels, check_levels, BandwidthLevels, DirectionLevels};
use crate::rate::{counter_rate, OnDecrease, RateError};
use crate::render;
use crate::store::ValueStore;
use crate::Forecaster;
use chrono::{DateTime, Utc};
use ifmon_common::types::{CheckOutput, CheckResult, Metric, Severity};
use std::collections::BTreeMap;

const GROUP_NAME: &str = "Interface group";

/// One rate with its optional smoothed companion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RateAverage {
    pub rate: f64,
    pub average: Option<Average>,
}

impl RateAverage {
    fn plain(rate: f64) -> Self {
        Self {
            rate,
            average: None,
        }
    }

    /// The value thresholds apply to: the smoothed series when averaging is
    /// configured, the raw rate otherwise.
    fn filtered(&self) -> f64 {
        self.average.map_or(self.rate, |a| a.value)
    }

    fn add(self, other: RateAverage) -> RateAverage {
        RateAverage {
            rate: self.rate + other.rate,
            average: match (self.average, other.average) {
                (Some(a), Some(b)) => a.checked_add(b),
                _ => None,
            },
        }
    }
}

fn add_opt(a: Option<RateAverage>, b: Option<RateAverage>) -> Option<RateAverage> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.add(b)),
        _ => None,
    }
}

/// Per-counter rates of one (possibly synthetic) interface. Absent rates
/// mean the source does not supply the counter or no rate is available yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TrafficRates {
    pub in_octets: Option<RateAverage>,
    pub in_ucast: Option<RateAverage>,
    pub in_mcast: Option<RateAverage>,
    pub in_bcast: Option<RateAverage>,
    pub in_nucast: Option<RateAverage>,
    pub in_disc: Option<RateAverage>,
    pub in_err: Option<RateAverage>,
    pub out_octets: Option<RateAverage>,
    pub out_ucast: Option<RateAverage>,
    pub out_mcast: Option<RateAverage>,
    pub out_bcast: Option<RateAverage>,
    pub out_nucast: Option<RateAverage>,
    pub out_disc: Option<RateAverage>,
    pub out_err: Option<RateAverage>,
    pub total_octets: Option<RateAverage>,
}

impl TrafficRates {
    fn add(self, other: TrafficRates) -> TrafficRates {
        TrafficRates {
            in_octets: add_opt(self.in_octets, other.in_octets),
            in_ucast: add_opt(self.in_ucast, other.in_ucast),
            in_mcast: add_opt(self.in_mcast, other.in_mcast),
            in_bcast: add_opt(self.in_bcast, other.in_bcast),
            in_nucast: add_opt(self.in_nucast, other.in_nucast),
            in_disc: add_opt(self.in_disc, other.in_disc),
            in_err: add_opt(self.in_err, other.in_err),
            out_octets: add_opt(self.out_octets, other.out_octets),
            out_ucast: add_opt(self.out_ucast, other.out_ucast),
            out_mcast: add_opt(self.out_mcast, other.out_mcast),
            out_bcast: add_opt(self.out_bcast, other.out_bcast),
            out_nucast: add_opt(self.out_nucast, other.out_nucast),
            out_disc: add_opt(self.out_disc, other.out_disc),
            out_err: add_opt(self.out_err, other.out_err),
            total_octets: add_opt(self.total_octets, other.total_octets),
        }
    }
}

/// One interface with its rates computed for this cycle.
#[derive(Debug, Clone)]
pub(crate) struct EvaluatedInterface {
    pub attributes: Attributes,
    pub rates: TrafficRates,
    pub rate_errors: Vec<(&'static str, RateError)>,
}

impl EvaluatedInterface {
    pub(crate) fn from_snapshot(
        snapshot: &InterfaceSnapshot,
        timestamp: f64,
        params: &CheckParams,
        store: &mut dyn ValueStore,
    ) -> Self {
        let id = snapshot.attributes.store_id();
        let c = &snapshot.counters;
        let mut errors = Vec::new();

        let in_octets = raw_rate(store, &id, "in_octets", c.in_octets, timestamp, &mut errors);
        let in_ucast = raw_rate(store, &id, "in_ucast", c.in_ucast, timestamp, &mut errors);
        let in_mcast = raw_rate(store, &id, "in_mcast", c.in_mcast, timestamp, &mut errors);
        let in_bcast = raw_rate(store, &id, "in_bcast", c.in_bcast, timestamp, &mut errors);
        let in_nucast = raw_rate(store, &id, "in_nucast", c.in_nucast, timestamp, &mut errors);
        let in_disc = raw_rate(store, &id, "in_disc", c.in_disc, timestamp, &mut errors);
        let in_err = raw_rate(store, &id, "in_err", c.in_err, timestamp, &mut errors);
        let out_octets = raw_rate(store, &id, "out_octets", c.out_octets, timestamp, &mut errors);
        let out_ucast = raw_rate(store, &id, "out_ucast", c.out_ucast, timestamp, &mut errors);
        let out_mcast = raw_rate(store, &id, "out_mcast", c.out_mcast, timestamp, &mut errors);
        let out_bcast = raw_rate(store, &id, "out_bcast", c.out_bcast, timestamp, &mut errors);
        let out_nucast = raw_rate(store, &id, "out_nucast", c.out_nucast, timestamp, &mut errors);
        let out_disc = raw_rate(store, &id, "out_disc", c.out_disc, timestamp, &mut errors);
        let out_err = raw_rate(store, &id, "out_err", c.out_err, timestamp, &mut errors);

        let in_octets = with_average(store, &id, "in_octets", in_octets, params.average, timestamp);
        let out_octets =
            with_average(store, &id, "out_octets", out_octets, params.average, timestamp);
        let in_mcast =
            with_average(store, &id, "in_mcast", in_mcast, params.average_bm, timestamp);
        let out_mcast =
            with_average(store, &id, "out_mcast", out_mcast, params.average_bm, timestamp);
        let in_bcast =
            with_average(store, &id, "in_bcast", in_bcast, params.average_bm, timestamp);
        let out_bcast =
            with_average(store, &id, "out_bcast", out_bcast, params.average_bm, timestamp);

        // Sources without a non-unicast counter get it derived from the
        // multicast and broadcast rates.
        let in_nucast = in_nucast
            .map(RateAverage::plain)
            .or_else(|| add_opt(in_mcast, in_bcast));
        let out_nucast = out_nucast
            .map(RateAverage::plain)
            .or_else(|| add_opt(out_mcast, out_bcast));

        let total_octets = add_opt(in_octets, out_octets);

        Self {
            attributes: snapshot.attributes.clone(),
            rates: TrafficRates {
                in_octets,
                in_ucast: in_ucast.map(RateAverage::plain),
                in_mcast,
                in_bcast,
                in_nucast,
                in_disc: in_disc.map(RateAverage::plain),
                in_err: in_err.map(RateAverage::plain),
                out_octets,
                out_ucast: out_ucast.map(RateAverage::plain),
                out_mcast,
                out_bcast,
                out_nucast,
                out_disc: out_disc.map(RateAverage::plain),
                out_err: out_err.map(RateAverage::plain),
                total_octets,
            },
            rate_errors: errors,
        }
    }
}

fn raw_rate(
    store: &mut dyn ValueStore,
    id: &str,
    name: &'static str,
    counter: Option<u64>,
    timestamp: f64,
    errors: &mut Vec<(&'static str, RateError)>,
) -> Option<f64> {
    let counter = counter?;
    let key = format!("{name}.{id}");
    match counter_rate(store, &key, timestamp, counter as f64, OnDecrease::RaiseReset) {
        Ok(rate) => Some(rate),
        Err(error) => {
            errors.push((name, error));
            None
        }
    }
}

// The backlog is part of the key: series of different configurations must
// never collide.
fn with_average(
    store: &mut dyn ValueStore,
    id: &str,
    name: &str,
    rate: Option<f64>,
    backlog_minutes: Option<u32>,
    timestamp: f64,
) -> Option<RateAverage> {
    let rate = rate?;
    Some(match backlog_minutes {
        None => RateAverage::plain(rate),
        Some(backlog) => {
            let key = format!("{name}.{id}.avg{backlog}");
            RateAverage {
                rate,
                average: Some(Average {
                    value: backlog_average(store, &key, timestamp, rate, backlog),
                    backlog_minutes: backlog,
                }),
            }
        }
    })
}

pub(crate) fn to_epoch(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / 1000.0
}

/// Runs one check cycle for `item` against a single-host snapshot.
///
/// The output is the ordered result/metric sequence of the composer; metric
/// names are translated to their legacy spellings at this boundary so that
/// historic time series keep their names.
pub fn check_interfaces(
    item: &str,
    params: &CheckParams,
    section: &[InterfaceSnapshot],
    timestamp: DateTime<Utc>,
    store: &mut dyn ValueStore,
    forecaster: Option<&dyn Forecaster>,
) -> Vec<CheckOutput> {
    let ts = to_epoch(timestamp);
    let tagged: Vec<(&InterfaceSnapshot, f64)> = section.iter().map(|s| (s, ts)).collect();
    rename_metrics_to_legacy(check_multiple(item, params, &tagged, store, forecaster))
}

pub(crate) fn check_multiple(
    item: &str,
    params: &CheckParams,
    section: &[(&InterfaceSnapshot, f64)],
    store: &mut dyn ValueStore,
    forecaster: Option<&dyn Forecaster>,
) -> Vec<CheckOutput> {
    match &params.aggregate {
        Some(group_config) => {
            check_grouped(item, params, group_config, section, store, forecaster)
        }
        None => check_ungrouped(item, params, section, store, forecaster),
    }
}

// Check one or more ungrouped interfaces. On a single host exactly one
// interface matches the item. On a cluster every node may contribute one
// match; only the result set of the interface with the highest outbound
// traffic is reported, since that node is likely the active one.
fn check_ungrouped(
    item: &str,
    params: &CheckParams,
    section: &[(&InterfaceSnapshot, f64)],
    store: &mut dyn ValueStore,
    forecaster: Option<&dyn Forecaster>,
) -> Vec<CheckOutput> {
    let mut last_results: Option<Vec<CheckOutput>> = None;
    let mut best_results: Option<Vec<CheckOutput>> = None;
    let mut max_out_traffic = -1.0;

    for (snapshot, timestamp) in matching_interfaces_for_item(item, section, params.item_appearance)
    {
        let evaluated = EvaluatedInterface::from_snapshot(snapshot, timestamp, params, store);
        let use_discovered = snapshot.attributes.node.is_none();
        let results =
            check_single_interface(item, params, &evaluated, None, use_discovered, forecaster);

        for output in &results {
            if let CheckOutput::Metric(metric) = output {
                if metric.name == "out" && metric.value > max_out_traffic {
                    max_out_traffic = metric.value;
                    best_results = Some(results.clone());
                }
            }
        }
        last_results = Some(results);
    }

    // A result set without an outbound-traffic metric falls back to the
    // last evaluated node untouched.
    best_results.or(last_results).unwrap_or_default()
}

// Grouped interfaces fold into one synthetic interface which then runs the
// ordinary single-interface check.
fn check_grouped(
    item: &str,
    params: &CheckParams,
    group_config: &GroupConfig,
    section: &[(&InterfaceSnapshot, f64)],
    store: &mut dyn ValueStore,
    forecaster: Option<&dyn Forecaster>,
) -> Vec<CheckOutput> {
    let members: Vec<EvaluatedInterface> = section
        .iter()
        .filter(|(snapshot, _)| group_config.matches(&snapshot.attributes, item))
        .map(|(snapshot, timestamp)| {
            EvaluatedInterface::from_snapshot(snapshot, *timestamp, params, store)
        })
        .collect();

    let member_attributes: Vec<&Attributes> = members.iter().map(|m| &m.attributes).collect();
    let accumulated_rates = members
        .iter()
        .filter(|m| m.attributes.is_up())
        .map(|m| m.rates)
        .reduce(TrafficRates::add)
        .unwrap_or_default();
    let rate_errors = members
        .iter()
        .filter(|m| m.attributes.is_up())
        .flat_map(|m| m.rate_errors.iter().copied())
        .collect();

    let snapshots: Vec<InterfaceSnapshot> = section
        .iter()
        .map(|(snapshot, _)| (*snapshot).clone())
        .collect();
    let members_display = group_members(&member_attributes, group_config, &snapshots, item);

    let synthetic = EvaluatedInterface {
        attributes: accumulate_attributes(&member_attributes, item),
        rates: accumulated_rates,
        rate_errors,
    };

    // Discovered state and speed belong to a single node; unusable for
    // groups spanning cluster nodes.
    let use_discovered = section
        .first()
        .map_or(true, |(snapshot, _)| snapshot.attributes.node.is_none());

    check_single_interface(
        item,
        params,
        &synthetic,
        Some(&members_display),
        use_discovered,
        forecaster,
    )
}

fn saveint(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

pub(crate) fn matching_interfaces_for_item<'a>(
    item: &str,
    section: &[(&'a InterfaceSnapshot, f64)],
    appearance: Option<ItemAppearance>,
) -> Vec<(&'a InterfaceSnapshot, f64)> {
    let Some((first, _)) = section.first() else {
        return Vec::new();
    };

    if first.attributes.node.is_some() {
        let mut by_node: BTreeMap<String, Vec<(&InterfaceSnapshot, f64)>> = BTreeMap::new();
        for (snapshot, timestamp) in section {
            by_node
                .entry(snapshot.attributes.node.clone().unwrap_or_default())
                .or_default()
                .push((snapshot, *timestamp));
        }
        by_node
            .values()
            .filter_map(|node_section| matching_unclustered(item, node_section, appearance))
            .collect()
    } else {
        matching_unclustered(item, section, appearance)
            .into_iter()
            .collect()
    }
}

fn matching_unclustered<'a>(
    item: &str,
    ifaces: &[(&'a InterfaceSnapshot, f64)],
    appearance: Option<ItemAppearance>,
) -> Option<(&'a InterfaceSnapshot, f64)> {
    matching_simple(item, ifaces, appearance).or_else(|| matching_compound(item, ifaces, appearance))
}

fn matching_simple<'a>(
    item: &str,
    ifaces: &[(&'a InterfaceSnapshot, f64)],
    appearance: Option<ItemAppearance>,
) -> Option<(&'a InterfaceSnapshot, f64)> {
    // Services discovered before the appearance was recorded match on any
    // field.
    let any = appearance.is_none();
    ifaces
        .iter()
        .find(|(snapshot, _)| {
            let a = &snapshot.attributes;
            ((appearance == Some(ItemAppearance::Index) || any)
                && (item.trim_start_matches('0') == a.index
                    || (!item.is_empty()
                        && item.chars().all(|c| c == '0')
                        && saveint(&a.index) == 0)))
                || ((appearance == Some(ItemAppearance::Alias) || any) && item == a.alias)
                || ((appearance == Some(ItemAppearance::Descr) || any) && item == a.descr)
        })
        .copied()
}

fn matching_compound<'a>(
    item: &str,
    ifaces: &[(&'a InterfaceSnapshot, f64)],
    appearance: Option<ItemAppearance>,
) -> Option<(&'a InterfaceSnapshot, f64)> {
    let any = appearance.is_none();
    ifaces
        .iter()
        .find(|(snapshot, _)| {
            let a = &snapshot.attributes;
            ((appearance == Some(ItemAppearance::Alias) || any)
                && item == format!("{} {}", a.alias, a.index))
                || ((appearance == Some(ItemAppearance::Descr) || any)
                    && item == format!("{} {}", a.descr, a.index))
        })
        .copied()
}

pub(crate) fn check_single_interface(
    item: &str,
    params: &CheckParams,
    iface: &EvaluatedInterface,
    members: Option<&GroupMembers>,
    use_discovered: bool,
    forecaster: Option<&dyn Forecaster>,
) -> Vec<CheckOutput> {
    let attributes = &iface.attributes;
    let mut outputs = Vec::new();

    if let Some(result) = interface_name(members.is_some(), item, params, attributes) {
        outputs.push(CheckOutput::Result(result));
    }

    let target_oper_states = if use_discovered {
        params
            .target_oper_states
            .as_deref()
            .or(params.discovered_oper_status.as_deref())
    } else {
        params.target_oper_states.as_deref()
    };
    let target_admin_states = if use_discovered {
        params
            .target_admin_states
            .as_deref()
            .or(params.discovered_admin_status.as_deref())
    } else {
        params.target_admin_states.as_deref()
    };
    outputs.extend(
        crate::state_map::check_oper_and_admin_state(
            attributes,
            &params.state_mappings,
            target_oper_states,
            target_admin_states,
        )
        .into_iter()
        .map(CheckOutput::Result),
    );

    if let Some(extra_info) = &attributes.extra_info {
        outputs.push(CheckOutput::Result(CheckResult::ok(extra_info.clone())));
    }

    if let Some(phys_address) = &attributes.phys_address {
        outputs.push(CheckOutput::Result(CheckResult::ok(format!(
            "MAC: {}",
            render_mac_address(phys_address)
        ))));
    }

    if let Some(members) = members {
        outputs.push(CheckOutput::Result(members_line(members)));
    }

    let target_speed = params.target_speed.map(|s| s as f64).or(if use_discovered {
        params.discovered_speed
    } else {
        None
    });
    outputs.push(CheckOutput::Result(check_speed(attributes, target_speed)));

    // Reference speed in bytes for relative bandwidth usage.
    let ref_speed = if attributes.speed > 0.0 {
        Some(attributes.speed / 8.0)
    } else {
        target_speed.filter(|s| *s > 0.0).map(|s| s / 8.0)
    };
    let speed_b_in = params
        .assumed_speed_in
        .map(|s| s as f64 / 8.0)
        .or(ref_speed);
    let speed_b_out = params
        .assumed_speed_out
        .map(|s| s as f64 / 8.0)
        .or(ref_speed);
    let speed_b_total = match (speed_b_in, speed_b_out) {
        (Some(i), Some(o)) => Some(i + o),
        _ => None,
    };

    let bw_levels = bandwidth_levels(params, speed_b_in, speed_b_out, speed_b_total);

    // Down interfaces keep reporting stale or bogus counters on some
    // devices; skip all performance counters for them.
    if attributes.oper_status == Attributes::OPER_STATUS_DOWN {
        tracing::debug!(item, "interface down, skipping counter evaluation");
        return outputs;
    }

    if let Some(out_qlen) = attributes.out_qlen {
        outputs.push(CheckOutput::Metric(Metric::new("outqlen", out_qlen)));
    }

    output_bandwidth_rates(
        &mut outputs,
        params,
        &iface.rates,
        speed_b_in,
        speed_b_out,
        speed_b_total,
        &bw_levels,
        forecaster,
    );

    output_packet_rates(&mut outputs, params, &iface.rates);

    if !iface.rate_errors.is_empty() {
        let detail = iface
            .rate_errors
            .iter()
            .map(|(counter, error)| format!("{counter}: {error}"))
            .collect::<Vec<_>>()
            .join("\n");
        outputs.push(CheckOutput::Result(CheckResult::notice(
            Severity::Ok,
            format!("Could not compute rates for the following counter(s):\n{detail}"),
        )));
    }

    outputs
}

fn interface_name(
    grouped: bool,
    item: &str,
    params: &CheckParams,
    attributes: &Attributes,
) -> Option<CheckResult> {
    if grouped {
        // Detailed member info follows in its own line.
        return Some(CheckResult::ok(GROUP_NAME));
    }

    let info = match params.infotext_format {
        Some(format) => {
            let bracket = match format {
                InfotextFormat::Alias => attributes.alias.clone(),
                InfotextFormat::Description => attributes.descr.clone(),
                InfotextFormat::AliasAndDescription => [&attributes.alias, &attributes.descr]
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                InfotextFormat::AliasOrDescription => {
                    if attributes.alias.is_empty() {
                        attributes.descr.clone()
                    } else {
                        attributes.alias.clone()
                    }
                }
                InfotextFormat::DescriptionOrAlias => {
                    if attributes.descr.is_empty() {
                        attributes.alias.clone()
                    } else {
                        attributes.descr.clone()
                    }
                }
            };
            if bracket.is_empty() {
                String::new()
            } else {
                format!("[{bracket}]")
            }
        }
        None => {
            let index = &attributes.index;
            let alias = &attributes.alias;
            let descr = &attributes.descr;
            if (item == index || item.trim_start_matches('0') == index)
                && (alias == item || alias.is_empty())
                && (descr == item || descr.is_empty())
            {
                // Name is trivial, the item says it all.
                String::new()
            } else if item == format!("{alias} {index}") && !descr.is_empty() {
                // Non-unique alias.
                format!("[{alias}/{descr}]")
            } else if alias != item && !alias.is_empty() {
                format!("[{alias}]")
            } else if descr != item && !descr.is_empty() {
                format!("[{descr}]")
            } else {
                format!("[{index}]")
            }
        }
    };

    let info = match (&attributes.node, info.is_empty()) {
        (Some(node), false) => format!("{info} on {node}"),
        (Some(node), true) => format!("On {node}"),
        (None, _) => info,
    };

    if info.is_empty() {
        None
    } else {
        Some(CheckResult::ok(info))
    }
}

fn members_line(members: &GroupMembers) -> CheckResult {
    let mut groups = Vec::new();
    for (node, node_members) in members {
        let member_info = node_members
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let node_info = match node {
            Some(node) if members.len() > 1 => format!(" on node {node}"),
            _ => String::new(),
        };
        groups.push(format!("[{member_info}{node_info}]"));
    }
    CheckResult::ok(format!("Members: {}", groups.join(" ")))
}

// Speed information is not always available; an expected-speed mismatch
// warns, since it usually means a renegotiated link.
fn check_speed(attributes: &Attributes, target_speed: Option<f64>) -> CheckResult {
    if attributes.speed > 0.0 {
        let actual = render::nicspeed(attributes.speed / 8.0);
        let expected = match target_speed {
            Some(target) if target != attributes.speed => {
                format!(" (expected: {})", render::nicspeed(target / 8.0))
            }
            _ => String::new(),
        };
        let severity = if expected.is_empty() {
            Severity::Ok
        } else {
            Severity::Warn
        };
        return CheckResult::new(severity, format!("Speed: {actual}{expected}"));
    }

    if let Some(target) = target_speed.filter(|t| *t > 0.0) {
        return CheckResult::ok(format!("Speed: {} (assumed)", render::nicspeed(target / 8.0)));
    }

    CheckResult::ok(format!(
        "Speed: {}",
        attributes.speed_as_text.as_deref().unwrap_or("unknown")
    ))
}

#[allow(clippy::too_many_arguments)]
fn output_bandwidth_rates(
    outputs: &mut Vec<CheckOutput>,
    params: &CheckParams,
    rates: &TrafficRates,
    speed_b_in: Option<f64>,
    speed_b_out: Option<f64>,
    speed_b_total: Option<f64>,
    levels: &BandwidthLevels,
    forecaster: Option<&dyn Forecaster>,
) {
    let mut directions = vec![
        ("in", "In", rates.in_octets, speed_b_in, &levels.input),
        ("out", "Out", rates.out_octets, speed_b_out, &levels.output),
    ];
    if params.total_traffic.is_some() {
        directions.push((
            "total",
            "Total",
            rates.total_octets,
            speed_b_total,
            &levels.total,
        ));
    }

    let assumed = params.assumed_speed_in.is_some() || params.assumed_speed_out.is_some();
    let renderer: fn(f64) -> String = match params.unit {
        BandwidthUnit::Bit => render::nicspeed,
        BandwidthUnit::Byte => render::iobandwidth,
    };

    for (direction, title, traffic, speed, direction_levels) in directions {
        let Some(traffic) = traffic else {
            continue;
        };

        let (filtered, label) = match traffic.average {
            Some(average) => (
                average.value,
                format!("{title} average {}min", average.backlog_minutes),
            ),
            None => (traffic.rate, title.to_string()),
        };

        match direction_levels {
            DirectionLevels::Predictive(spec) => {
                let metric_name = match traffic.average {
                    Some(average) => format!("{direction}_avg_{}", average.backlog_minutes),
                    None => direction.to_string(),
                };
                match forecaster {
                    Some(forecaster) => outputs
                        .extend(forecaster.check_predictive(spec, &metric_name, filtered, &label)),
                    None => outputs.push(CheckOutput::Result(check_levels(
                        filtered, None, None, &label, &renderer, false,
                    ))),
                }
            }
            DirectionLevels::Fixed { upper, lower } => {
                let mut result = check_levels(filtered, *upper, *lower, &label, &renderer, false);
                if let Some(speed) = speed {
                    let mut perc_info = render::percent(100.0 * filtered / speed);
                    if assumed {
                        perc_info = format!("{perc_info}/{}", renderer(speed));
                    }
                    result.summary = format!("{} ({perc_info})", result.summary);
                }
                outputs.push(CheckOutput::Result(result));
            }
        }

        // Metrics always carry the raw rate; graphs show the unaveraged
        // series.
        outputs.push(CheckOutput::Metric(
            Metric::new(direction, traffic.rate)
                .with_levels(direction_levels.upper())
                .with_boundaries((0.0, speed)),
        ));
    }
}

fn sum_rates(rates: &[Option<RateAverage>]) -> Option<f64> {
    let mut sum = 0.0;
    for rate in rates {
        sum += rate.as_ref()?.rate;
    }
    Some(sum)
}

fn output_packet_rates(outputs: &mut Vec<CheckOutput>, params: &CheckParams, rates: &TrafficRates) {
    let levels = &params.packet_levels;
    for (direction, ucast, nucast, mcast, bcast, disc, err) in [
        (
            "in",
            rates.in_ucast,
            rates.in_nucast,
            rates.in_mcast,
            rates.in_bcast,
            rates.in_disc,
            rates.in_err,
        ),
        (
            "out",
            rates.out_ucast,
            rates.out_nucast,
            rates.out_mcast,
            rates.out_bcast,
            rates.out_disc,
            rates.out_err,
        ),
    ] {
        let input = direction == "in";
        let pick = |per: &crate::config::PerDirection<Option<PacketLevel>>| {
            if input {
                per.input
            } else {
                per.output
            }
        };

        // Errors and discards are judged against everything the interface
        // tried to handle; the delivered classes against what got through.
        let attempted = sum_rates(&[ucast, nucast, err]);
        let delivered = sum_rates(&[ucast, nucast]);
        let with_discards = sum_rates(&[ucast, nucast, disc]);

        for (packets, level, display_name, metric_name, reference) in [
            (err, pick(&levels.errors), "Errors", "errors", attempted),
            (
                disc,
                pick(&levels.discards),
                "Discards",
                "discards",
                with_discards,
            ),
            (
                mcast,
                pick(&levels.multicast),
                "Multicast",
                "mcast",
                delivered,
            ),
            (
                bcast,
                pick(&levels.broadcast),
                "Broadcast",
                "bcast",
                delivered,
            ),
            (
                ucast,
                pick(&levels.unicast),
                "Unicast",
                "unicast",
                delivered,
            ),
        ] {
            let Some(packets) = packets else {
                continue;
            };
            output_single_packet_rate(
                outputs,
                &packets,
                direction,
                level,
                display_name,
                metric_name,
                reference,
            );
        }

        if let Some(nucast) = nucast {
            outputs.push(CheckOutput::Result(check_levels(
                nucast.rate,
                params.nucast_levels,
                None,
                &format!("Non-unicast {direction}"),
                &render::packet_rate,
                true,
            )));
            outputs.push(CheckOutput::Metric(
                Metric::new(format!("if_{direction}_non_unicast"), nucast.rate)
                    .with_levels(params.nucast_levels),
            ));
        }
    }
}

fn output_single_packet_rate(
    outputs: &mut Vec<CheckOutput>,
    packets: &RateAverage,
    direction: &str,
    level: Option<PacketLevel>,
    display_name: &str,
    metric_name: &str,
    reference_rate: Option<f64>,
) {
    let label = match packets.average {
        Some(average) => format!(
            "{display_name} {direction} average {}min",
            average.backlog_minutes
        ),
        None => format!("{display_name} {direction}"),
    };
    let value = packets.filtered();

    let merged_levels = match level {
        Some(PacketLevel::Perc { warn, crit }) => {
            let Some(reference) = reference_rate else {
                return;
            };
            // A rate of 0% for a reference of 0 is mathematically off, but
            // it reads best for the "no packets" case.
            let perc_value = if reference == 0.0 {
                0.0
            } else {
                value * 100.0 / reference
            };
            outputs.push(CheckOutput::Result(check_levels(
                perc_value,
                Some((warn, crit)),
                None,
                &label,
                &|v| render::floating_point(v, 3, "%"),
                true,
            )));
            (reference > 0.0).then(|| (warn / 100.0 * reference, crit / 100.0 * reference))
        }
        Some(PacketLevel::Abs { warn, crit }) => {
            outputs.push(CheckOutput::Result(check_levels(
                value,
                Some((warn, crit)),
                None,
                &label,
                &render::packet_rate,
                true,
            )));
            Some((warn, crit))
        }
        None => {
            outputs.push(CheckOutput::Result(check_levels(
                value,
                None,
                None,
                &label,
                &render::packet_rate,
                true,
            )));
            None
        }
    };

    outputs.push(CheckOutput::Metric(
        Metric::new(format!("if_{direction}_{metric_name}"), packets.rate)
            .with_levels(merged_levels),
    ));
}

// Historic time series keep their original names; rename at the boundary
// only.
fn legacy_metric_name(name: &str) -> &str {
    match name {
        "if_in_discards" => "indisc",
        "if_in_errors" => "inerr",
        "if_out_discards" => "outdisc",
        "if_out_errors" => "outerr",
        "if_in_mcast" => "inmcast",
        "if_in_bcast" => "inbcast",
        "if_out_mcast" => "outmcast",
        "if_out_bcast" => "outbcast",
        "if_in_unicast" => "inucast",
        "if_in_non_unicast" => "innucast",
        "if_out_unicast" => "outucast",
        "if_out_non_unicast" => "outnucast",
        other => other,
    }
}

pub(crate) fn rename_metrics_to_legacy(outputs: Vec<CheckOutput>) -> Vec<CheckOutput> {
    outputs
        .into_iter()
        .map(|output| match output {
            CheckOutput::Metric(mut metric) => {
                metric.name = legacy_metric_name(&metric.name).to_string();
                CheckOutput::Metric(metric)
            }
            result => result,
        })
        .collect()
}
