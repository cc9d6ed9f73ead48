//! Check and discovery configuration.
//!
//! Configuration enters as serde-friendly "spec" structs (the shape the
//! scheduler persists, e.g. as JSON) and is compiled into runtime types
//! before any evaluation: regexes are built, warn/crit pairs ordered,
//! group definitions resolved. Compilation is the only place the engine
//! fails hard; per-cycle evaluation never throws into the caller.

use crate::iface::Attributes;
use crate::state_map::{IndependentMapping, StateMappings};
use ifmon_common::types::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structural configuration errors, surfaced to the operator at load time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config: invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("config: {what}: warn/crit pair ({warn}, {crit}) is not ordered")]
    UnorderedLevels {
        what: &'static str,
        warn: f64,
        crit: f64,
    },

    #[error("config: group name must not be empty")]
    EmptyGroupName,

    #[error("config: averaging backlog must be positive")]
    ZeroBacklog,

    #[error("config: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unit absolute bandwidth thresholds are configured in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthUnit {
    #[default]
    Byte,
    Bit,
}

impl BandwidthUnit {
    /// Divisor turning a configured absolute value into bytes.
    pub fn divisor(self) -> f64 {
        match self {
            BandwidthUnit::Byte => 1.0,
            BandwidthUnit::Bit => 8.0,
        }
    }
}

/// Which interface field names a discovered item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAppearance {
    #[default]
    Index,
    Descr,
    Alias,
}

/// Format of the bracketed identity info on the first check line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfotextFormat {
    Alias,
    Description,
    AliasAndDescription,
    AliasOrDescription,
    DescriptionOrAlias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficDirection {
    In,
    Out,
    Both,
}

/// One bandwidth threshold specification: an absolute pair (in the
/// configured unit), a percentage pair (resolved against the reference
/// speed) or a predictive spec handed to the forecasting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LevelsSpec {
    Abs { bound: Bound, warn: f64, crit: f64 },
    Perc { bound: Bound, warn: f64, crit: f64 },
    Predictive { config: serde_json::Value },
}

impl LevelsSpec {
    fn validate(&self, what: &'static str) -> Result<(), ConfigError> {
        match self {
            LevelsSpec::Abs { bound, warn, crit } | LevelsSpec::Perc { bound, warn, crit } => {
                let ordered = match bound {
                    Bound::Upper => warn <= crit,
                    Bound::Lower => warn >= crit,
                };
                if ordered {
                    Ok(())
                } else {
                    Err(ConfigError::UnorderedLevels {
                        what,
                        warn: *warn,
                        crit: *crit,
                    })
                }
            }
            LevelsSpec::Predictive { .. } => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLevelsSpec {
    pub direction: TrafficDirection,
    pub levels: LevelsSpec,
}

/// Presence enables monitoring of the summed in+out traffic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalTrafficSpec {
    #[serde(default)]
    pub levels: Vec<LevelsSpec>,
}

/// Threshold on one packet class in one direction. Percentages resolve
/// against the class-specific reference packet rate at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PacketLevel {
    Abs { warn: f64, crit: f64 },
    Perc { warn: f64, crit: f64 },
}

impl PacketLevel {
    fn validate(&self, what: &'static str) -> Result<(), ConfigError> {
        let (warn, crit) = match self {
            PacketLevel::Abs { warn, crit } | PacketLevel::Perc { warn, crit } => (*warn, *crit),
        };
        if warn <= crit {
            Ok(())
        } else {
            Err(ConfigError::UnorderedLevels { what, warn, crit })
        }
    }
}

/// Per-direction levels of one packet class; `both` applies to whichever
/// direction has no explicit entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketClassSpec {
    #[serde(rename = "in")]
    pub input: Option<PacketLevel>,
    pub out: Option<PacketLevel>,
    pub both: Option<PacketLevel>,
}

impl PacketClassSpec {
    fn resolve(&self) -> PerDirection<Option<PacketLevel>> {
        PerDirection {
            input: self.input.or(self.both),
            output: self.out.or(self.both),
        }
    }

    fn validate(&self, what: &'static str) -> Result<(), ConfigError> {
        for level in [self.input, self.out, self.both].into_iter().flatten() {
            level.validate(what)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerDirection<T> {
    pub input: T,
    pub output: T,
}

/// Resolved per-class packet levels, one slot per direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacketLevelsConfig {
    pub errors: PerDirection<Option<PacketLevel>>,
    pub discards: PerDirection<Option<PacketLevel>>,
    pub multicast: PerDirection<Option<PacketLevel>>,
    pub broadcast: PerDirection<Option<PacketLevel>>,
    pub unicast: PerDirection<Option<PacketLevel>>,
}

/// Matching conditions of one discovery rule, as persisted. All absent
/// fields match; regexes match anchored at the start of the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConditionsSpec {
    pub match_index: Option<Vec<String>>,
    pub match_alias: Option<Vec<String>>,
    pub match_desc: Option<Vec<String>>,
    pub porttypes: Option<Vec<String>>,
    pub portstates: Option<Vec<String>>,
    pub admin_states: Option<Vec<String>>,
}

/// Compiled matching conditions; retains its spec for re-serialization
/// into discovered parameters.
#[derive(Debug, Clone)]
pub struct MatchingConditions {
    spec: MatchingConditionsSpec,
    match_index: Option<Vec<Regex>>,
    match_alias: Option<Vec<Regex>>,
    match_desc: Option<Vec<Regex>>,
}

impl MatchingConditions {
    pub fn compile(spec: &MatchingConditionsSpec) -> Result<Self, ConfigError> {
        Ok(Self {
            spec: spec.clone(),
            match_index: compile_patterns(&spec.match_index)?,
            match_alias: compile_patterns(&spec.match_alias)?,
            match_desc: compile_patterns(&spec.match_desc)?,
        })
    }

    pub fn spec(&self) -> &MatchingConditionsSpec {
        &self.spec
    }

    pub fn matches(&self, attributes: &Attributes) -> bool {
        regex_conditions_hold(&self.match_index, &attributes.index)
            && regex_conditions_hold(&self.match_alias, &attributes.alias)
            && regex_conditions_hold(&self.match_desc, &attributes.descr)
            && self.porttype_matches(&attributes.port_type)
            && self
                .spec
                .portstates
                .as_ref()
                .map_or(true, |states| states.contains(&attributes.oper_status))
            && match (&self.spec.admin_states, &attributes.admin_status) {
                (Some(states), Some(admin)) => states.contains(admin),
                _ => true,
            }
    }

    fn porttype_matches(&self, port_type: &str) -> bool {
        match &self.spec.porttypes {
            // An empty port type always passes; some sources set none.
            Some(types) => port_type.is_empty() || types.iter().any(|t| t == port_type),
            None => true,
        }
    }
}

fn compile_patterns(patterns: &Option<Vec<String>>) -> Result<Option<Vec<Regex>>, ConfigError> {
    patterns
        .as_ref()
        .map(|ps| {
            ps.iter()
                .map(|p| {
                    // Anchor at the start, like a prefix match on the field.
                    Regex::new(&format!("^(?:{p})")).map_err(|source| ConfigError::InvalidRegex {
                        pattern: p.clone(),
                        source,
                    })
                })
                .collect()
        })
        .transpose()
}

fn regex_conditions_hold(patterns: &Option<Vec<Regex>>, value: &str) -> bool {
    match patterns {
        Some(rs) => rs.iter().any(|r| r.is_match(value)),
        None => true,
    }
}

/// Per-interface discovery settings of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleDiscoverySpec {
    pub discover: bool,
    pub item_appearance: ItemAppearance,
    pub pad_portnumbers: bool,
    pub labels: BTreeMap<String, String>,
}

impl Default for SingleDiscoverySpec {
    fn default() -> Self {
        Self {
            discover: true,
            item_appearance: ItemAppearance::Index,
            pad_portnumbers: true,
            labels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupItemSpec {
    pub group_name: String,
    pub member_appearance: ItemAppearance,
}

/// Grouping directive of one rule: create the listed groups from matching
/// interfaces, or exclude matching interfaces from grouping altogether.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GroupingSpec {
    Create {
        group_items: Vec<GroupItemSpec>,
        #[serde(default)]
        labels: BTreeMap<String, String>,
    },
    DoNotGroup,
}

/// One entry of the ordered, most-specific-first discovery ruleset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryRuleSpec {
    pub matching_conditions: MatchingConditionsSpec,
    pub discovery_single: Option<SingleDiscoverySpec>,
    pub grouping: Option<GroupingSpec>,
}

#[derive(Debug, Clone)]
pub struct DiscoveryRule {
    pub matching_conditions: MatchingConditions,
    pub discovery_single: Option<SingleDiscoverySpec>,
    pub grouping: Option<GroupingSpec>,
}

/// Compiled discovery ruleset, ordered most-specific-first.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRuleset {
    rules: Vec<DiscoveryRule>,
}

impl DiscoveryRuleset {
    pub fn compile(specs: &[DiscoveryRuleSpec]) -> Result<Self, ConfigError> {
        let rules = specs
            .iter()
            .map(|spec| {
                if let Some(GroupingSpec::Create { group_items, .. }) = &spec.grouping {
                    if group_items.iter().any(|g| g.group_name.is_empty()) {
                        return Err(ConfigError::EmptyGroupName);
                    }
                }
                Ok(DiscoveryRule {
                    matching_conditions: MatchingConditions::compile(&spec.matching_conditions)?,
                    discovery_single: spec.discovery_single.clone(),
                    grouping: spec.grouping.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Compiles the user ruleset with the builtin fallback rule appended as
    /// the least specific entry.
    pub fn with_defaults(specs: &[DiscoveryRuleSpec]) -> Result<Self, ConfigError> {
        let mut all = specs.to_vec();
        all.push(default_discovery_rule());
        Self::compile(&all)
    }

    pub fn rules(&self) -> &[DiscoveryRule] {
        &self.rules
    }
}

/// The builtin least-specific discovery rule: discover ethernet-like port
/// types that are operationally up, named by padded index.
pub fn default_discovery_rule() -> DiscoveryRuleSpec {
    DiscoveryRuleSpec {
        matching_conditions: MatchingConditionsSpec {
            porttypes: Some(
                [
                    "6", "32", "62", "117", "127", "128", "129", "180", "181", "182", "205", "229",
                ]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            ),
            portstates: Some(vec!["1".to_string()]),
            ..MatchingConditionsSpec::default()
        },
        discovery_single: Some(SingleDiscoverySpec::default()),
        grouping: None,
    }
}

/// Group definition as persisted in discovered parameters. An absent
/// inclusion condition marks an agent-tagged group, matched by the group
/// tag on the interface itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfigSpec {
    pub member_appearance: Option<ItemAppearance>,
    pub inclusion_condition: Option<MatchingConditionsSpec>,
    pub exclusion_conditions: Vec<MatchingConditionsSpec>,
    pub labels: BTreeMap<String, String>,
}

/// Compiled group definition used at evaluation time.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub member_appearance: Option<ItemAppearance>,
    pub inclusion_condition: Option<MatchingConditions>,
    pub exclusion_conditions: Vec<MatchingConditions>,
}

impl GroupConfig {
    pub fn compile(spec: &GroupConfigSpec) -> Result<Self, ConfigError> {
        Ok(Self {
            member_appearance: spec.member_appearance,
            inclusion_condition: spec
                .inclusion_condition
                .as_ref()
                .map(MatchingConditions::compile)
                .transpose()?,
            exclusion_conditions: spec
                .exclusion_conditions
                .iter()
                .map(MatchingConditions::compile)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    /// Whether `attributes` belongs to the group named `group_name`.
    pub fn matches(&self, attributes: &Attributes, group_name: &str) -> bool {
        match &self.inclusion_condition {
            None => attributes.group.as_deref() == Some(group_name),
            Some(inclusion) => {
                inclusion.matches(attributes)
                    && !self
                        .exclusion_conditions
                        .iter()
                        .any(|exclusion| exclusion.matches(attributes))
            }
        }
    }
}

/// State-mapping configuration as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMappingsSpec {
    IndependentMappings {
        #[serde(default)]
        map_operstates: Vec<(Vec<String>, Severity)>,
        #[serde(default)]
        map_admin_states: Vec<(Vec<String>, Severity)>,
    },
    CombinedMappings(Vec<(String, String, Severity)>),
}

impl StateMappingsSpec {
    fn compile(&self) -> StateMappings {
        match self {
            StateMappingsSpec::IndependentMappings {
                map_operstates,
                map_admin_states,
            } => StateMappings::Independent(IndependentMapping {
                map_operstates: map_operstates.clone(),
                map_admin_states: map_admin_states.clone(),
            }),
            StateMappingsSpec::CombinedMappings(rows) => StateMappings::Combined(rows.clone()),
        }
    }
}

/// Check parameters as persisted by the scheduler: the merge of configured
/// rule values and the parameters recorded at discovery time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckParamsSpec {
    pub item_appearance: Option<ItemAppearance>,
    /// Allowed operational states; observed states outside go critical.
    pub state: Option<Vec<String>>,
    /// Allowed administrative states.
    pub admin_state: Option<Vec<String>>,
    pub discovered_oper_status: Option<Vec<String>>,
    pub discovered_admin_status: Option<Vec<String>>,
    pub discovered_speed: Option<f64>,
    /// Expected speed in bits per second; mismatch warns.
    pub speed: Option<u64>,
    /// Assumed speeds in bits per second, overriding the reference speed.
    pub assumed_speed_in: Option<u64>,
    pub assumed_speed_out: Option<u64>,
    pub unit: BandwidthUnit,
    pub infotext_format: Option<InfotextFormat>,
    pub traffic: Vec<TrafficLevelsSpec>,
    pub total_traffic: Option<TotalTrafficSpec>,
    pub errors: Option<PacketClassSpec>,
    pub discards: Option<PacketClassSpec>,
    pub multicast: Option<PacketClassSpec>,
    pub broadcast: Option<PacketClassSpec>,
    pub unicast: Option<PacketClassSpec>,
    /// Absolute upper levels on non-unicast packet rates.
    pub nucasts: Option<(f64, f64)>,
    /// Backlog minutes for averaging octet rates.
    pub average: Option<u32>,
    /// Backlog minutes for averaging multicast/broadcast rates.
    pub average_bm: Option<u32>,
    pub state_mappings: Option<StateMappingsSpec>,
    /// Present on grouped items; defines the member set.
    pub aggregate: Option<GroupConfigSpec>,
}

impl CheckParamsSpec {
    /// The builtin check defaults: error rates above 0.01%/0.1% of the
    /// attempted packet rate warn/crit in both directions.
    pub fn default_check() -> Self {
        Self {
            errors: Some(PacketClassSpec {
                both: Some(PacketLevel::Perc {
                    warn: 0.01,
                    crit: 0.1,
                }),
                ..PacketClassSpec::default()
            }),
            ..Self::default()
        }
    }

    pub fn compile(&self) -> Result<CheckParams, ConfigError> {
        for entry in &self.traffic {
            entry.levels.validate("traffic")?;
        }
        if let Some(total) = &self.total_traffic {
            for levels in &total.levels {
                levels.validate("total_traffic")?;
            }
        }
        for (spec, what) in [
            (self.errors, "errors"),
            (self.discards, "discards"),
            (self.multicast, "multicast"),
            (self.broadcast, "broadcast"),
            (self.unicast, "unicast"),
        ] {
            if let Some(spec) = spec {
                spec.validate(what)?;
            }
        }
        if let Some((warn, crit)) = self.nucasts {
            if warn > crit {
                return Err(ConfigError::UnorderedLevels {
                    what: "nucasts",
                    warn,
                    crit,
                });
            }
        }
        if self.average == Some(0) || self.average_bm == Some(0) {
            return Err(ConfigError::ZeroBacklog);
        }

        Ok(CheckParams {
            item_appearance: self.item_appearance,
            target_oper_states: self.state.clone(),
            target_admin_states: self.admin_state.clone(),
            discovered_oper_status: self.discovered_oper_status.clone(),
            discovered_admin_status: self.discovered_admin_status.clone(),
            discovered_speed: self.discovered_speed,
            target_speed: self.speed,
            assumed_speed_in: self.assumed_speed_in,
            assumed_speed_out: self.assumed_speed_out,
            unit: self.unit,
            infotext_format: self.infotext_format,
            traffic: self.traffic.clone(),
            total_traffic: self.total_traffic.clone(),
            packet_levels: PacketLevelsConfig {
                errors: self.errors.unwrap_or_default().resolve(),
                discards: self.discards.unwrap_or_default().resolve(),
                multicast: self.multicast.unwrap_or_default().resolve(),
                broadcast: self.broadcast.unwrap_or_default().resolve(),
                unicast: self.unicast.unwrap_or_default().resolve(),
            },
            nucast_levels: self.nucasts,
            average: self.average,
            average_bm: self.average_bm,
            state_mappings: self
                .state_mappings
                .as_ref()
                .map(StateMappingsSpec::compile)
                .unwrap_or_default(),
            aggregate: self
                .aggregate
                .as_ref()
                .map(GroupConfig::compile)
                .transpose()?,
        })
    }
}

/// Compiled check parameters driving one check cycle.
#[derive(Debug, Clone, Default)]
pub struct CheckParams {
    pub item_appearance: Option<ItemAppearance>,
    pub target_oper_states: Option<Vec<String>>,
    pub target_admin_states: Option<Vec<String>>,
    pub discovered_oper_status: Option<Vec<String>>,
    pub discovered_admin_status: Option<Vec<String>>,
    pub discovered_speed: Option<f64>,
    pub target_speed: Option<u64>,
    pub assumed_speed_in: Option<u64>,
    pub assumed_speed_out: Option<u64>,
    pub unit: BandwidthUnit,
    pub infotext_format: Option<InfotextFormat>,
    pub traffic: Vec<TrafficLevelsSpec>,
    pub total_traffic: Option<TotalTrafficSpec>,
    pub packet_levels: PacketLevelsConfig,
    pub nucast_levels: Option<(f64, f64)>,
    pub average: Option<u32>,
    pub average_bm: Option<u32>,
    pub state_mappings: StateMappings,
    pub aggregate: Option<GroupConfig>,
}

impl CheckParams {
    /// Loads and compiles parameters from their persisted JSON form.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let spec: CheckParamsSpec = serde_json::from_value(value.clone())?;
        spec.compile()
    }
}
