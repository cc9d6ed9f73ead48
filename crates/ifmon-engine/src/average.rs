//! Averaging engine: exponential smoothing of a rate over a configurable
//! backlog window.
//!
//! Each backlog forms its own persisted series; the backlog is part of the
//! persistence key, so series from different configurations never collide.

use crate::store::ValueStore;

/// A smoothed value tagged with its backlog window. Only averages of equal
/// backlog are comparable or summable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Average {
    pub value: f64,
    pub backlog_minutes: u32,
}

impl Average {
    /// Sum of two averages of the same backlog. Combining series of
    /// different backlogs is a configuration error; the defensive path
    /// drops the average rather than aborting the cycle.
    pub fn checked_add(self, other: Average) -> Option<Average> {
        if self.backlog_minutes != other.backlog_minutes {
            tracing::warn!(
                left = self.backlog_minutes,
                right = other.backlog_minutes,
                "refusing to combine averages of different backlogs"
            );
            return None;
        }
        Some(Average {
            value: self.value + other.value,
            backlog_minutes: self.backlog_minutes,
        })
    }
}

/// Smoothes `value` into the persisted series at `key`.
///
/// The first call seeds the series with `value`. Subsequent calls update it
/// with weight `min(1, elapsed / (backlog_minutes * 60))`; a non-advancing
/// timestamp leaves the series untouched and returns the stored value.
pub fn backlog_average(
    store: &mut dyn ValueStore,
    key: &str,
    timestamp: f64,
    value: f64,
    backlog_minutes: u32,
) -> f64 {
    let Some((last_time, last_average)) = store.get(key) else {
        store.set(key, timestamp, value);
        return value;
    };

    let elapsed = timestamp - last_time;
    if elapsed <= 0.0 {
        return last_average;
    }

    let weight = (elapsed / (f64::from(backlog_minutes) * 60.0)).min(1.0);
    let average = last_average + weight * (value - last_average);
    store.set(key, timestamp, average);
    average
}
