//! Interface telemetry engine.
//!
//! Takes canonical per-interface counter snapshots (produced by external
//! parsers), turns monotonic counters into rates across check cycles,
//! applies configurable bandwidth/packet thresholds, discovers and groups
//! interfaces according to rule hierarchies, reconciles redundant
//! observations from clustered sources and emits deterministic, ordered
//! check results and metrics.
//!
//! The engine is pure except for reads/writes through the caller-supplied
//! [`store::ValueStore`]; it performs no I/O, no locking and no protocol
//! decoding. Entry points are [`discovery::discover_interfaces`] at
//! configuration time and [`check::check_interfaces`] /
//! [`cluster::cluster_check`] at evaluation time.

pub mod aggregate;
pub mod average;
pub mod check;
pub mod cluster;
pub mod config;
pub mod discovery;
pub mod iface;
pub mod levels;
pub mod rate;
pub mod render;
pub mod state_map;
pub mod store;

#[cfg(test)]
mod tests;

use ifmon_common::types::CheckOutput;
use serde::{Deserialize, Serialize};

/// Opaque configuration of a predictive threshold, handed through to the
/// forecasting collaborator without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveSpec(pub serde_json::Value);

/// External forecasting collaborator for predictive levels.
///
/// The engine never computes forecasts itself: when a quantity carries a
/// predictive threshold specification, evaluation is delegated here and the
/// returned output records are merged into the check output unchanged.
pub trait Forecaster: Send + Sync {
    /// Evaluates `value` against the forecast configured by `spec`.
    ///
    /// `metric_name` is the time-series the forecast is keyed on and `label`
    /// the human-readable quantity name (e.g. `"In average 5min"`).
    fn check_predictive(
        &self,
        spec: &PredictiveSpec,
        metric_name: &str,
        value: f64,
        label: &str,
    ) -> Vec<CheckOutput>;
}
