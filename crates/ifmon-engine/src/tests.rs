use crate::aggregate::accumulate_attributes;
use crate::average::{backlog_average, Average};
use crate::check::check_interfaces;
use crate::cluster::{cluster_check, NodeSection};
use crate::config::{
    Bound, CheckParams, CheckParamsSpec, DiscoveryRuleSpec, DiscoveryRuleset, GroupConfigSpec,
    GroupItemSpec, GroupingSpec, ItemAppearance, LevelsSpec, MatchingConditionsSpec, PacketLevel,
    PacketClassSpec, SingleDiscoverySpec, TrafficDirection, TrafficLevelsSpec,
};
use crate::discovery::discover_interfaces;
use crate::iface::{Attributes, Counters, InterfaceSnapshot, PhysAddress};
use crate::rate::{counter_rate, OnDecrease, RateError};
use crate::state_map::{check_oper_and_admin_state, StateMappings};
use crate::store::MemoryValueStore;
use chrono::{DateTime, TimeZone, Utc};
use ifmon_common::types::{CheckOutput, Severity};
use std::collections::BTreeMap;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn make_attributes(index: &str, descr: &str, alias: &str) -> Attributes {
    Attributes {
        index: index.to_string(),
        descr: descr.to_string(),
        alias: alias.to_string(),
        port_type: "6".to_string(),
        speed: 100_000_000.0,
        oper_status: "1".to_string(),
        ..Attributes::default()
    }
}

fn make_snapshot(index: &str, descr: &str, alias: &str) -> InterfaceSnapshot {
    InterfaceSnapshot {
        attributes: make_attributes(index, descr, alias),
        counters: Counters::default(),
    }
}

fn results(outputs: &[CheckOutput]) -> Vec<&ifmon_common::types::CheckResult> {
    outputs
        .iter()
        .filter_map(|o| match o {
            CheckOutput::Result(r) => Some(r),
            CheckOutput::Metric(_) => None,
        })
        .collect()
}

fn metric<'a>(outputs: &'a [CheckOutput], name: &str) -> Option<&'a ifmon_common::types::Metric> {
    outputs.iter().find_map(|o| match o {
        CheckOutput::Metric(m) if m.name == name => Some(m),
        _ => None,
    })
}

// ---- canonical model ----

#[test]
fn finalize_cleans_names_and_clamps_bogus_speed() {
    let attributes = Attributes {
        descr: "eth\u{0}0".to_string(),
        alias: "up\nlink ".to_string(),
        speed: 100_000_000_000_000.0,
        ..Attributes::default()
    }
    .finalize();
    assert_eq!(attributes.descr, "eth0");
    assert_eq!(attributes.alias, "up link");
    assert_eq!(attributes.speed, 10_000_000_000.0);
}

// ---- rate engine ----

#[test]
fn rate_is_delta_over_elapsed_time() {
    let mut store = MemoryValueStore::new();
    assert_eq!(
        counter_rate(&mut store, "k", 0.0, 100.0, OnDecrease::RaiseReset),
        Err(RateError::NotYetAvailable)
    );
    assert_eq!(
        counter_rate(&mut store, "k", 60.0, 160.0, OnDecrease::RaiseReset),
        Ok(1.0)
    );
}

#[test]
fn rate_is_idempotent_per_timestamp() {
    let mut store = MemoryValueStore::new();
    let _ = counter_rate(&mut store, "k", 0.0, 100.0, OnDecrease::RaiseReset);
    let first = counter_rate(&mut store, "k", 60.0, 160.0, OnDecrease::RaiseReset);
    let replay = counter_rate(&mut store, "k", 60.0, 160.0, OnDecrease::RaiseReset);
    assert_eq!(first, Ok(1.0));
    assert_eq!(replay, Ok(1.0));
}

#[test]
fn counter_reset_is_never_negative() {
    let mut store = MemoryValueStore::new();
    let _ = counter_rate(&mut store, "k", 0.0, 1000.0, OnDecrease::RaiseReset);
    assert_eq!(
        counter_rate(&mut store, "k", 30.0, 500.0, OnDecrease::RaiseReset),
        Err(RateError::CounterReset)
    );
    // Baseline was reinitialized from the reset sample.
    assert_eq!(
        counter_rate(&mut store, "k", 60.0, 800.0, OnDecrease::RaiseReset),
        Ok(10.0)
    );

    let mut store = MemoryValueStore::new();
    let _ = counter_rate(&mut store, "c", 0.0, 1000.0, OnDecrease::ClampToZero);
    assert_eq!(
        counter_rate(&mut store, "c", 30.0, 500.0, OnDecrease::ClampToZero),
        Ok(0.0)
    );
}

// ---- averaging engine ----

#[test]
fn average_seeds_then_smooths() {
    let mut store = MemoryValueStore::new();
    assert_eq!(backlog_average(&mut store, "a", 0.0, 10.0, 5), 10.0);
    // Half the backlog window elapsed: weight 0.5.
    assert_eq!(backlog_average(&mut store, "a", 150.0, 20.0, 5), 15.0);
    // Beyond the window the weight caps at 1.
    assert_eq!(backlog_average(&mut store, "a", 600.0, 40.0, 5), 40.0);
}

#[test]
fn averages_of_different_backlogs_never_combine() {
    let five = Average {
        value: 10.0,
        backlog_minutes: 5,
    };
    let fifteen = Average {
        value: 10.0,
        backlog_minutes: 15,
    };
    assert!(five.checked_add(fifteen).is_none());
    assert_eq!(
        five.checked_add(five),
        Some(Average {
            value: 20.0,
            backlog_minutes: 5
        })
    );
}

// ---- discovery ----

#[test]
fn discovery_pads_indices_for_lexicographic_order() {
    let section: Vec<InterfaceSnapshot> = (1..=10)
        .map(|i| make_snapshot(&i.to_string(), "", ""))
        .collect();
    let ruleset = DiscoveryRuleset::with_defaults(&[]).unwrap();
    let items = discover_interfaces(&ruleset, &section);
    assert_eq!(items.len(), 10);
    assert_eq!(items[0].item, "01");
    assert_eq!(items[9].item, "10");
    assert_eq!(
        items[0].parameters.item_appearance,
        Some(ItemAppearance::Index)
    );
    assert_eq!(items[0].parameters.discovered_speed, Some(100_000_000.0));
    assert_eq!(
        items[0].parameters.discovered_oper_status,
        Some(vec!["1".to_string()])
    );
}

#[test]
fn discovery_appends_index_suffix_on_alias_collision() {
    let section = vec![
        make_snapshot("1", "", "uplink"),
        make_snapshot("2", "", "uplink"),
    ];
    let rules = vec![DiscoveryRuleSpec {
        discovery_single: Some(SingleDiscoverySpec {
            item_appearance: ItemAppearance::Alias,
            ..SingleDiscoverySpec::default()
        }),
        ..DiscoveryRuleSpec::default()
    }];
    let ruleset = DiscoveryRuleset::with_defaults(&rules).unwrap();
    let items = discover_interfaces(&ruleset, &section);
    let names: Vec<&str> = items.iter().map(|i| i.item.as_str()).collect();
    assert_eq!(names, vec!["uplink 1", "uplink 2"]);
}

#[test]
fn discovery_falls_back_to_index_when_alias_is_empty() {
    let section = vec![make_snapshot("3", "", "")];
    let rules = vec![DiscoveryRuleSpec {
        discovery_single: Some(SingleDiscoverySpec {
            item_appearance: ItemAppearance::Alias,
            ..SingleDiscoverySpec::default()
        }),
        ..DiscoveryRuleSpec::default()
    }];
    let ruleset = DiscoveryRuleset::with_defaults(&rules).unwrap();
    let items = discover_interfaces(&ruleset, &section);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item, "3");
    assert_eq!(
        items[0].parameters.item_appearance,
        Some(ItemAppearance::Index)
    );
}

#[test]
fn discovery_ignores_interfaces_matching_no_rule() {
    let mut down = make_snapshot("1", "", "");
    down.attributes.oper_status = "2".to_string();
    let ruleset = DiscoveryRuleset::with_defaults(&[]).unwrap();
    assert!(discover_interfaces(&ruleset, &[down]).is_empty());
}

#[test]
fn grouping_exclusion_from_more_specific_rule_wins() {
    let mut fast = make_snapshot("1", "", "");
    fast.attributes.speed = 1000.0;
    let mut slow = make_snapshot("2", "", "");
    slow.attributes.speed = 500.0;

    // Most specific first: the exclusion outranks the inclusion below it.
    let rules = vec![
        DiscoveryRuleSpec {
            matching_conditions: MatchingConditionsSpec {
                match_index: Some(vec!["1$".to_string()]),
                ..MatchingConditionsSpec::default()
            },
            grouping: Some(GroupingSpec::DoNotGroup),
            ..DiscoveryRuleSpec::default()
        },
        DiscoveryRuleSpec {
            grouping: Some(GroupingSpec::Create {
                group_items: vec![GroupItemSpec {
                    group_name: "uplinks".to_string(),
                    member_appearance: ItemAppearance::Index,
                }],
                labels: BTreeMap::new(),
            }),
            ..DiscoveryRuleSpec::default()
        },
    ];
    let ruleset = DiscoveryRuleset::with_defaults(&rules).unwrap();
    let items = discover_interfaces(&ruleset, &[fast, slow]);

    let group = items.iter().find(|i| i.item == "uplinks").unwrap();
    let aggregate = group.parameters.aggregate.as_ref().unwrap();
    assert_eq!(aggregate.exclusion_conditions.len(), 1);
    // Only the non-excluded member contributes.
    assert_eq!(group.parameters.discovered_speed, Some(500.0));
}

#[test]
fn agent_supplied_group_tag_discovers_group() {
    let mut tagged = make_snapshot("1", "", "");
    tagged.attributes.group = Some("wan".to_string());
    let ruleset = DiscoveryRuleset::with_defaults(&[]).unwrap();
    let items = discover_interfaces(&ruleset, &[tagged]);

    let group = items.iter().find(|i| i.item == "wan").unwrap();
    let aggregate = group.parameters.aggregate.as_ref().unwrap();
    assert!(aggregate.inclusion_condition.is_none());
}

// ---- aggregation ----

#[test]
fn aggregation_of_partially_up_members_is_degraded() {
    let up_a = make_attributes("1", "", "");
    let up_b = make_attributes("2", "", "");
    let mut down = make_attributes("3", "", "");
    down.oper_status = "2".to_string();

    let degraded = accumulate_attributes(&[&up_a, &up_b, &down], "grp");
    assert_eq!(degraded.oper_status, "8");
    assert_eq!(degraded.speed, 200_000_000.0);

    let all_up = accumulate_attributes(&[&up_a, &up_b], "grp");
    assert_eq!(all_up.oper_status, "1");

    let mut down_b = make_attributes("4", "", "");
    down_b.oper_status = "2".to_string();
    let all_down = accumulate_attributes(&[&down, &down_b], "grp");
    assert_eq!(all_down.oper_status, "2");
    assert!(all_down.out_qlen.is_none());
}

#[test]
fn aggregation_alias_documents_nodes_and_member_count() {
    let mut on_a = make_attributes("1", "", "");
    on_a.node = Some("node-a".to_string());
    let mut on_b = make_attributes("1", "", "");
    on_b.node = Some("node-b".to_string());

    let accumulated = accumulate_attributes(&[&on_a, &on_b], "grp");
    assert!(accumulated.alias.contains("nodes: node-a, node-b"));
    assert!(accumulated.alias.contains("2 grouped interfaces"));
}

// ---- state mapper ----

#[test]
fn combined_state_mapping_first_match_wins() {
    let mut attributes = make_attributes("1", "", "");
    attributes.admin_status = Some("2".to_string());
    let mappings = StateMappings::Combined(vec![
        ("1".to_string(), "2".to_string(), Severity::Warn),
        ("1".to_string(), "2".to_string(), Severity::Crit),
    ]);
    let lines = check_oper_and_admin_state(&attributes, &mappings, None, None);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].severity, Severity::Warn);
    assert_eq!(lines[0].summary, "(op. state: up, admin state: down)");
}

#[test]
fn combined_mapping_without_match_falls_back_to_independent() {
    let mut attributes = make_attributes("1", "", "");
    attributes.admin_status = Some("1".to_string());
    let mappings = StateMappings::Combined(vec![(
        "2".to_string(),
        "2".to_string(),
        Severity::Crit,
    )]);
    let lines = check_oper_and_admin_state(&attributes, &mappings, None, None);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].summary, "(up)");
    assert_eq!(lines[0].severity, Severity::Ok);
    assert_eq!(lines[1].summary, "Admin state: up");
}

#[test]
fn oper_state_outside_allow_list_is_critical() {
    let mut attributes = make_attributes("1", "", "");
    attributes.oper_status = "2".to_string();
    let targets = vec!["1".to_string()];
    let lines = check_oper_and_admin_state(
        &attributes,
        &StateMappings::default(),
        Some(&targets),
        None,
    );
    assert_eq!(lines[0].severity, Severity::Crit);
    assert_eq!(lines[0].summary, "(down)");
}

// ---- configuration ----

#[test]
fn invalid_regex_fails_at_configuration_load() {
    let rules = vec![DiscoveryRuleSpec {
        matching_conditions: MatchingConditionsSpec {
            match_alias: Some(vec!["[".to_string()]),
            ..MatchingConditionsSpec::default()
        },
        ..DiscoveryRuleSpec::default()
    }];
    assert!(DiscoveryRuleset::compile(&rules).is_err());
}

#[test]
fn unordered_levels_fail_at_configuration_load() {
    let spec = CheckParamsSpec {
        traffic: vec![TrafficLevelsSpec {
            direction: TrafficDirection::In,
            levels: LevelsSpec::Abs {
                bound: Bound::Upper,
                warn: 100.0,
                crit: 50.0,
            },
        }],
        ..CheckParamsSpec::default()
    };
    assert!(spec.compile().is_err());
}

#[test]
fn check_params_load_from_json() {
    let params = CheckParams::from_json(&serde_json::json!({
        "unit": "bit",
        "average": 5,
        "traffic": [
            {"direction": "in", "levels": {"type": "perc", "bound": "upper", "warn": 5.0, "crit": 80.0}}
        ],
        "state": ["1"],
    }))
    .unwrap();
    assert_eq!(params.average, Some(5));
    assert_eq!(params.target_oper_states, Some(vec!["1".to_string()]));
}

// ---- single-interface check ----

fn perc_in_params(warn: f64, crit: f64) -> CheckParams {
    CheckParamsSpec {
        traffic: vec![TrafficLevelsSpec {
            direction: TrafficDirection::In,
            levels: LevelsSpec::Perc {
                bound: Bound::Upper,
                warn,
                crit,
            },
        }],
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap()
}

#[test]
fn bandwidth_percentage_levels_warn_with_percent_annotation() {
    // 10 byte/s reference speed; 1 byte/s measured -> 10.0%.
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.attributes.speed = 80.0;
    snapshot.counters.in_octets = Some(100);

    let params = perc_in_params(5.0, 80.0);
    let mut store = MemoryValueStore::new();

    let first = check_interfaces("1", &params, &[snapshot.clone()], ts(0), &mut store, None);
    assert!(metric(&first, "in").is_none());
    assert!(results(&first)
        .iter()
        .any(|r| r.summary.contains("Could not compute rates")));

    snapshot.counters.in_octets = Some(160);
    let second = check_interfaces("1", &params, &[snapshot], ts(60), &mut store, None);

    let in_line = results(&second)
        .into_iter()
        .find(|r| r.summary.starts_with("In:"))
        .unwrap();
    assert_eq!(in_line.severity, Severity::Warn);
    assert!(in_line.summary.contains("(10.0%)"), "{}", in_line.summary);

    let in_metric = metric(&second, "in").unwrap();
    assert_eq!(in_metric.value, 1.0);
    assert_eq!(in_metric.levels, Some((0.5, 8.0)));
    assert_eq!(in_metric.boundaries, Some((0.0, Some(10.0))));
    assert_eq!(CheckOutput::worst_severity(&second), Severity::Warn);
}

#[test]
fn percentage_levels_without_reference_speed_are_skipped() {
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.attributes.speed = 0.0;
    snapshot.counters.in_octets = Some(0);

    let params = perc_in_params(5.0, 80.0);
    let mut store = MemoryValueStore::new();
    let _ = check_interfaces("1", &params, &[snapshot.clone()], ts(0), &mut store, None);
    snapshot.counters.in_octets = Some(60000);
    let outputs = check_interfaces("1", &params, &[snapshot], ts(60), &mut store, None);

    let in_line = results(&outputs)
        .into_iter()
        .find(|r| r.summary.starts_with("In:"))
        .unwrap();
    assert_eq!(in_line.severity, Severity::Ok);
    assert_eq!(metric(&outputs, "in").unwrap().levels, None);
}

#[test]
fn down_interface_skips_counter_evaluation() {
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.attributes.oper_status = "2".to_string();
    snapshot.counters.in_octets = Some(100);
    snapshot.counters.in_err = Some(5);

    let params = CheckParamsSpec::default_check().compile().unwrap();
    let mut store = MemoryValueStore::new();
    let _ = check_interfaces("1", &params, &[snapshot.clone()], ts(0), &mut store, None);
    snapshot.counters.in_octets = Some(10_000_000);
    snapshot.counters.in_err = Some(5_000);
    let outputs = check_interfaces("1", &params, &[snapshot], ts(60), &mut store, None);

    assert!(outputs
        .iter()
        .all(|o| matches!(o, CheckOutput::Result(_))));
    assert!(results(&outputs)
        .iter()
        .all(|r| !r.summary.starts_with("In:") && !r.summary.starts_with("Errors")));
}

#[test]
fn packet_percentage_with_zero_reference_rate_is_zero() {
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.counters.in_ucast = Some(0);
    snapshot.counters.in_nucast = Some(0);

    let params = CheckParamsSpec {
        unicast: Some(PacketClassSpec {
            both: Some(PacketLevel::Perc {
                warn: 10.0,
                crit: 20.0,
            }),
            ..PacketClassSpec::default()
        }),
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap();

    let mut store = MemoryValueStore::new();
    let _ = check_interfaces("1", &params, &[snapshot.clone()], ts(0), &mut store, None);
    let outputs = check_interfaces("1", &params, &[snapshot], ts(60), &mut store, None);

    let unicast_line = results(&outputs)
        .into_iter()
        .find(|r| r.summary.starts_with("Unicast in"))
        .unwrap();
    assert_eq!(unicast_line.severity, Severity::Ok);
    assert_eq!(unicast_line.summary, "Unicast in: 0%");

    let unicast_metric = metric(&outputs, "inucast").unwrap();
    assert_eq!(unicast_metric.value, 0.0);
    assert_eq!(unicast_metric.levels, None);
}

#[test]
fn error_metrics_keep_legacy_names() {
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.counters.in_ucast = Some(0);
    snapshot.counters.in_nucast = Some(0);
    snapshot.counters.in_err = Some(0);

    let params = CheckParamsSpec {
        errors: Some(PacketClassSpec {
            both: Some(PacketLevel::Abs {
                warn: 0.5,
                crit: 2.0,
            }),
            ..PacketClassSpec::default()
        }),
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap();

    let mut store = MemoryValueStore::new();
    let _ = check_interfaces("1", &params, &[snapshot.clone()], ts(0), &mut store, None);
    snapshot.counters.in_err = Some(60);
    let outputs = check_interfaces("1", &params, &[snapshot], ts(60), &mut store, None);

    let errors_line = results(&outputs)
        .into_iter()
        .find(|r| r.summary.starts_with("Errors in"))
        .unwrap();
    assert_eq!(errors_line.severity, Severity::Warn);
    assert!(errors_line.notice);

    assert!(metric(&outputs, "if_in_errors").is_none());
    assert_eq!(metric(&outputs, "inerr").unwrap().value, 1.0);
}

#[test]
fn composer_emits_identity_mac_and_speed_lines() {
    let mut snapshot = make_snapshot("1", "eth0", "uplink");
    snapshot.attributes.speed = 1_000_000_000.0;
    snapshot.attributes.phys_address =
        Some(PhysAddress::Bytes(vec![0x2e, 0x27, 0x06, 0xb8, 0x41, 0x04]));

    let params = CheckParamsSpec::default().compile().unwrap();
    let mut store = MemoryValueStore::new();
    let outputs = check_interfaces("1", &params, &[snapshot], ts(0), &mut store, None);
    let lines = results(&outputs);

    assert_eq!(lines[0].summary, "[uplink]");
    assert!(lines.iter().any(|r| r.summary == "MAC: 2E:27:06:B8:41:04"));
    assert!(lines.iter().any(|r| r.summary == "Speed: 1 GBit/s"));
}

#[test]
fn expected_speed_mismatch_warns() {
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.attributes.speed = 100_000_000.0;

    let params = CheckParamsSpec {
        speed: Some(1_000_000_000),
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap();
    let mut store = MemoryValueStore::new();
    let outputs = check_interfaces("1", &params, &[snapshot], ts(0), &mut store, None);

    let speed_line = results(&outputs)
        .into_iter()
        .find(|r| r.summary.starts_with("Speed:"))
        .unwrap();
    assert_eq!(speed_line.severity, Severity::Warn);
    assert_eq!(
        speed_line.summary,
        "Speed: 100 MBit/s (expected: 1 GBit/s)"
    );
}

#[test]
fn averaged_traffic_uses_backlog_title() {
    let mut snapshot = make_snapshot("1", "", "");
    snapshot.counters.in_octets = Some(0);

    let params = CheckParamsSpec {
        average: Some(5),
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap();
    let mut store = MemoryValueStore::new();
    let _ = check_interfaces("1", &params, &[snapshot.clone()], ts(0), &mut store, None);
    snapshot.counters.in_octets = Some(600);
    let outputs = check_interfaces("1", &params, &[snapshot], ts(60), &mut store, None);

    assert!(results(&outputs)
        .iter()
        .any(|r| r.summary.starts_with("In average 5min:")));
    // Metrics always carry the unaveraged rate.
    assert_eq!(metric(&outputs, "in").unwrap().value, 10.0);
}

// ---- grouped check ----

#[test]
fn grouped_check_aggregates_members() {
    let mut member_a = make_snapshot("1", "", "");
    member_a.attributes.speed = 1_000_000_000.0;
    let mut member_b = make_snapshot("2", "", "");
    member_b.attributes.speed = 1_000_000_000.0;
    member_b.attributes.oper_status = "2".to_string();

    let params = CheckParamsSpec {
        aggregate: Some(GroupConfigSpec {
            member_appearance: Some(ItemAppearance::Index),
            inclusion_condition: Some(MatchingConditionsSpec::default()),
            ..GroupConfigSpec::default()
        }),
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap();

    let mut store = MemoryValueStore::new();
    let outputs = check_interfaces(
        "uplinks",
        &params,
        &[member_a, member_b],
        ts(0),
        &mut store,
        None,
    );
    let lines = results(&outputs);

    assert_eq!(lines[0].summary, "Interface group");
    // One member down: the group runs degraded at half speed.
    assert_eq!(lines[1].summary, "(degraded)");
    assert!(lines
        .iter()
        .any(|r| r.summary == "Members: [1 (up), 2 (down)]"));
    assert!(lines.iter().any(|r| r.summary == "Speed: 1 GBit/s"));
}

// ---- clustering ----

fn cluster_sections(
    time_a: i64,
    time_b: i64,
    octets_a: u64,
    octets_b: u64,
) -> BTreeMap<String, NodeSection> {
    let mut snapshot_a = make_snapshot("1", "", "");
    snapshot_a.counters.out_octets = Some(octets_a);
    let mut snapshot_b = make_snapshot("1", "", "");
    snapshot_b.counters.out_octets = Some(octets_b);

    let mut sections = BTreeMap::new();
    sections.insert(
        "node-a".to_string(),
        NodeSection {
            timestamp: ts(time_a),
            interfaces: vec![snapshot_a],
        },
    );
    sections.insert(
        "node-b".to_string(),
        NodeSection {
            timestamp: ts(time_b),
            interfaces: vec![snapshot_b],
        },
    );
    sections
}

#[test]
fn cluster_reports_node_with_highest_outbound_traffic() {
    let params = CheckParamsSpec::default().compile().unwrap();
    let mut store = MemoryValueStore::new();

    let _ = cluster_check(
        "1",
        &params,
        &cluster_sections(0, 0, 0, 0),
        &mut store,
        None,
    );
    let outputs = cluster_check(
        "1",
        &params,
        &cluster_sections(60, 60, 6000, 3000),
        &mut store,
        None,
    );

    // Node A produced the higher outbound rate and wins the report.
    assert!(results(&outputs).iter().any(|r| r.summary == "On node-a"));
    assert!(results(&outputs).iter().all(|r| r.summary != "On node-b"));
    assert_eq!(metric(&outputs, "out").unwrap().value, 100.0);
}

#[test]
fn cluster_flags_nodes_without_new_data() {
    let params = CheckParamsSpec {
        aggregate: Some(GroupConfigSpec {
            member_appearance: Some(ItemAppearance::Index),
            inclusion_condition: Some(MatchingConditionsSpec::default()),
            ..GroupConfigSpec::default()
        }),
        ..CheckParamsSpec::default()
    }
    .compile()
    .unwrap();
    let mut store = MemoryValueStore::new();

    let _ = cluster_check(
        "grp",
        &params,
        &cluster_sections(0, 0, 0, 0),
        &mut store,
        None,
    );
    // Node B stalls at its previous timestamp.
    let outputs = cluster_check(
        "grp",
        &params,
        &cluster_sections(60, 0, 600, 0),
        &mut store,
        None,
    );

    assert!(results(&outputs)
        .iter()
        .any(|r| r.summary == "No new data from node node-b since last check"));
}
