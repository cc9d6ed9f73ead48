use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monitoring severity of a single check line, ordered from best to worst.
///
/// The ordering is the classic "worst wins" merge order: a critical line
/// outranks an unknown one, which outranks a warning.
///
/// # Examples
///
/// ```
/// use ifmon_common::types::Severity;
///
/// let sev: Severity = "warn".parse().unwrap();
/// assert_eq!(sev, Severity::Warn);
/// assert_eq!(sev.to_string(), "warn");
/// assert!(Severity::Crit > Severity::Unknown);
/// assert_eq!(Severity::Warn.max(Severity::Ok), Severity::Warn);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Warn,
    Unknown,
    Crit,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Ok => write!(f, "ok"),
            Severity::Warn => write!(f, "warn"),
            Severity::Unknown => write!(f, "unknown"),
            Severity::Crit => write!(f, "crit"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(Severity::Ok),
            "warn" | "warning" => Ok(Severity::Warn),
            "unknown" => Ok(Severity::Unknown),
            "crit" | "critical" => Ok(Severity::Crit),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// One time-series sample emitted by a check.
///
/// `levels` carries the resolved warn/crit pair the value was compared
/// against, if any; `boundaries` the known value range (e.g. `(0, speed)`
/// for a traffic metric on an interface with a known speed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub levels: Option<(f64, f64)>,
    pub boundaries: Option<(f64, Option<f64>)>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            levels: None,
            boundaries: None,
        }
    }

    pub fn with_levels(mut self, levels: Option<(f64, f64)>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_boundaries(mut self, boundaries: (f64, Option<f64>)) -> Self {
        self.boundaries = Some(boundaries);
        self
    }
}

/// One human-readable check line.
///
/// `notice` lines are informational: they only surface in the summary when
/// their severity is not [`Severity::Ok`], otherwise they stay in the long
/// output. This mirrors how packet-class lines behave on an interface check:
/// silent while healthy, loud once a threshold fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub notice: bool,
}

impl CheckResult {
    pub fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            details: None,
            notice: false,
        }
    }

    pub fn ok(summary: impl Into<String>) -> Self {
        Self::new(Severity::Ok, summary)
    }

    pub fn notice(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            details: None,
            notice: true,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// One element of the ordered output sequence of a check cycle.
///
/// A [`Metric`] always follows the [`CheckResult`] line it belongs to;
/// stand-alone metrics (no associated line) are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutput {
    Result(CheckResult),
    Metric(Metric),
}

impl CheckOutput {
    /// The overall severity of an output sequence: worst line wins.
    pub fn worst_severity(outputs: &[CheckOutput]) -> Severity {
        outputs
            .iter()
            .filter_map(|o| match o {
                CheckOutput::Result(r) => Some(r.severity),
                CheckOutput::Metric(_) => None,
            })
            .max()
            .unwrap_or(Severity::Ok)
    }
}

/// Format a label map into a stable human-readable string.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use ifmon_common::types::format_labels;
///
/// let mut labels = BTreeMap::new();
/// labels.insert("site".to_string(), "fra1".to_string());
/// labels.insert("tenant".to_string(), "core".to_string());
/// assert_eq!(format_labels(&labels), "site=fra1, tenant=core");
/// ```
pub fn format_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
