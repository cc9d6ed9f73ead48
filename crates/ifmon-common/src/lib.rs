//! Shared vocabulary between the ifmon telemetry engine and its callers.
//!
//! The engine produces ordered sequences of [`types::CheckOutput`] records;
//! the scheduler consumes them for status display, alerting and time-series
//! storage. Nothing in here performs any evaluation.

pub mod types;
