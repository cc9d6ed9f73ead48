//! State mapper: raw operational/administrative status codes to a
//! monitoring severity, under either independent or combined mapping.

use crate::iface::{if_state_name, Attributes};
use ifmon_common::types::{CheckResult, Severity};

/// Separate lookup tables for operational and administrative state codes.
/// Codes without a table entry default to OK unless they fall outside the
/// caller-supplied allow-list, which makes them critical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndependentMapping {
    pub map_operstates: Vec<(Vec<String>, Severity)>,
    pub map_admin_states: Vec<(Vec<String>, Severity)>,
}

impl IndependentMapping {
    fn oper_severity(&self, code: &str) -> Option<Severity> {
        lookup(&self.map_operstates, code)
    }

    fn admin_severity(&self, code: &str) -> Option<Severity> {
        lookup(&self.map_admin_states, code)
    }
}

fn lookup(rows: &[(Vec<String>, Severity)], code: &str) -> Option<Severity> {
    rows.iter()
        .find(|(codes, _)| codes.iter().any(|c| c == code))
        .map(|(_, severity)| *severity)
}

/// Status-to-severity mapping policy; the two variants are mutually
/// exclusive per item.
#[derive(Debug, Clone, PartialEq)]
pub enum StateMappings {
    Independent(IndependentMapping),
    /// Ordered `(oper_code, admin_code, severity)` rows, first match wins.
    /// Falls back to independent behavior when no row matches.
    Combined(Vec<(String, String, Severity)>),
}

impl Default for StateMappings {
    fn default() -> Self {
        StateMappings::Independent(IndependentMapping::default())
    }
}

/// Produces the operational/administrative state line(s) for one interface.
pub fn check_oper_and_admin_state(
    attributes: &Attributes,
    mappings: &StateMappings,
    target_oper_states: Option<&[String]>,
    target_admin_states: Option<&[String]>,
) -> Vec<CheckResult> {
    if let StateMappings::Combined(rows) = mappings {
        if let Some(admin_status) = &attributes.admin_status {
            let combined = rows
                .iter()
                .find(|(oper, admin, _)| {
                    *oper == attributes.oper_status && admin == admin_status
                })
                .map(|(_, _, severity)| *severity);
            if let Some(severity) = combined {
                let oper_name = attributes.oper_status_name();
                let admin_name = if_state_name(admin_status);
                return vec![CheckResult::new(
                    severity,
                    format!("(op. state: {oper_name}, admin state: {admin_name})"),
                )
                .with_details(format!(
                    "Operational state: {oper_name}, Admin state: {admin_name}"
                ))];
            }
        }
    }

    let mapping = match mappings {
        StateMappings::Independent(mapping) => mapping.clone(),
        StateMappings::Combined(_) => IndependentMapping::default(),
    };

    let mut results = Vec::new();

    let oper_severity = status_severity(
        &attributes.oper_status,
        target_oper_states,
        mapping.oper_severity(&attributes.oper_status),
    );
    results.push(
        CheckResult::new(oper_severity, format!("({})", attributes.oper_status_name()))
            .with_details(format!(
                "Operational state: {}",
                attributes.oper_status_name()
            )),
    );

    if let Some(admin_status) = &attributes.admin_status {
        let admin_severity = status_severity(
            admin_status,
            target_admin_states,
            mapping.admin_severity(admin_status),
        );
        results.push(CheckResult::new(
            admin_severity,
            format!("Admin state: {}", if_state_name(admin_status)),
        ));
    }

    results
}

// Default is OK; a code outside the expected-code allow-list is critical;
// a mapping table entry overrides both.
fn status_severity(
    code: &str,
    target_states: Option<&[String]>,
    mapped: Option<Severity>,
) -> Severity {
    if let Some(severity) = mapped {
        return severity;
    }
    match target_states {
        Some(targets) if !targets.iter().any(|t| t == code) => Severity::Crit,
        _ => Severity::Ok,
    }
}
