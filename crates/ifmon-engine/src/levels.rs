//! Threshold evaluation: generic warn/crit level checks and the merge of
//! configured bandwidth threshold specifications into concrete per-direction
//! levels.

use crate::config::{BandwidthUnit, CheckParams, LevelsSpec, TrafficDirection};
use crate::PredictiveSpec;
use ifmon_common::types::{CheckResult, Severity};

/// Evaluates one quantity against optional upper and lower warn/crit pairs.
///
/// The summary reads `"{label}: {rendered value}"` and gains the violated
/// levels when the severity is not OK. `notice_only` marks lines that stay
/// in the long output while healthy.
pub fn check_levels(
    value: f64,
    levels_upper: Option<(f64, f64)>,
    levels_lower: Option<(f64, f64)>,
    label: &str,
    render: &dyn Fn(f64) -> String,
    notice_only: bool,
) -> CheckResult {
    let mut severity = Severity::Ok;
    let mut levels_text = String::new();

    if let Some((warn, crit)) = levels_upper {
        let upper_severity = if value >= crit {
            Severity::Crit
        } else if value >= warn {
            Severity::Warn
        } else {
            Severity::Ok
        };
        if upper_severity > Severity::Ok {
            severity = severity.max(upper_severity);
            levels_text = format!(" (warn/crit at {}/{})", render(warn), render(crit));
        }
    }

    if let Some((warn, crit)) = levels_lower {
        let lower_severity = if value < crit {
            Severity::Crit
        } else if value < warn {
            Severity::Warn
        } else {
            Severity::Ok
        };
        if lower_severity > Severity::Ok {
            severity = severity.max(lower_severity);
            levels_text.push_str(&format!(
                " (warn/crit below {}/{})",
                render(warn),
                render(crit)
            ));
        }
    }

    let mut result = CheckResult::new(severity, format!("{label}: {}{levels_text}", render(value)));
    result.notice = notice_only;
    result
}

/// Concrete levels of one traffic direction after resolving percentages
/// against the reference speed. Percent thresholds without a reference
/// speed resolve to no levels at all (the evaluation is skipped).
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionLevels {
    Fixed {
        upper: Option<(f64, f64)>,
        lower: Option<(f64, f64)>,
    },
    Predictive(PredictiveSpec),
}

impl Default for DirectionLevels {
    fn default() -> Self {
        DirectionLevels::Fixed {
            upper: None,
            lower: None,
        }
    }
}

impl DirectionLevels {
    pub fn upper(&self) -> Option<(f64, f64)> {
        match self {
            DirectionLevels::Fixed { upper, .. } => *upper,
            DirectionLevels::Predictive(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandwidthLevels {
    pub input: DirectionLevels,
    pub output: DirectionLevels,
    pub total: DirectionLevels,
}

/// Merges the configured bandwidth threshold entries into per-direction
/// levels. Later entries override earlier ones per (direction, bound); a
/// predictive entry replaces the whole direction. All resulting values are
/// bytes per second.
pub fn bandwidth_levels(
    params: &CheckParams,
    speed_in: Option<f64>,
    speed_out: Option<f64>,
    speed_total: Option<f64>,
) -> BandwidthLevels {
    let mut input = Merged::default();
    let mut output = Merged::default();
    let mut total = Merged::default();

    for entry in &params.traffic {
        match entry.direction {
            TrafficDirection::In => input.apply(&entry.levels, speed_in, params.unit),
            TrafficDirection::Out => output.apply(&entry.levels, speed_out, params.unit),
            TrafficDirection::Both => {
                input.apply(&entry.levels, speed_in, params.unit);
                output.apply(&entry.levels, speed_out, params.unit);
            }
        }
    }

    if let Some(total_traffic) = &params.total_traffic {
        for levels in &total_traffic.levels {
            total.apply(levels, speed_total, params.unit);
        }
    }

    BandwidthLevels {
        input: input.finalize(),
        output: output.finalize(),
        total: total.finalize(),
    }
}

#[derive(Debug, Clone, Default)]
struct Merged {
    predictive: Option<PredictiveSpec>,
    upper: Option<(f64, f64)>,
    lower: Option<(f64, f64)>,
}

impl Merged {
    fn apply(&mut self, levels: &LevelsSpec, speed: Option<f64>, unit: BandwidthUnit) {
        match levels {
            LevelsSpec::Predictive { config } => {
                *self = Merged {
                    predictive: Some(PredictiveSpec(config.clone())),
                    upper: None,
                    lower: None,
                };
            }
            LevelsSpec::Abs { bound, warn, crit } => {
                if self.predictive.is_some() {
                    *self = Merged::default();
                }
                let scaled = (warn / unit.divisor(), crit / unit.divisor());
                self.set(*bound, Some(scaled));
            }
            LevelsSpec::Perc { bound, warn, crit } => {
                if self.predictive.is_some() {
                    *self = Merged::default();
                }
                let scaled = speed.map(|s| (warn * s / 100.0, crit * s / 100.0));
                self.set(*bound, scaled);
            }
        }
    }

    fn set(&mut self, bound: crate::config::Bound, levels: Option<(f64, f64)>) {
        match bound {
            crate::config::Bound::Upper => self.upper = levels,
            crate::config::Bound::Lower => self.lower = levels,
        }
    }

    fn finalize(self) -> DirectionLevels {
        match self.predictive {
            Some(spec) => DirectionLevels::Predictive(spec),
            None => DirectionLevels::Fixed {
                upper: self.upper,
                lower: self.lower,
            },
        }
    }
}
