//! Rate engine: turns one raw counter sample plus the persisted prior
//! sample into a per-second rate, detecting counter resets and overflow.

use crate::store::ValueStore;

/// Local signals of the rate engine. Neither is a hard failure: the caller
/// suppresses the derived quantity and, for resets, surfaces a deferred
/// notice at the end of the check output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// First observation for this key; the baseline was stored and a rate
    /// will be available from the next cycle on.
    #[error("counter initialized, rate not yet available")]
    NotYetAvailable,

    /// The counter went backwards (device reset or overflow). The baseline
    /// was reinitialized from the current sample.
    #[error("counter decreased, assuming reset (baseline reinitialized)")]
    CounterReset,
}

/// Policy for a decreasing counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDecrease {
    /// Signal [`RateError::CounterReset`].
    RaiseReset,
    /// Report a rate of zero for this cycle.
    ClampToZero,
}

/// Computes the rate of a monotonic counter.
///
/// First observation for `key` stores `(timestamp, value)` and signals
/// [`RateError::NotYetAvailable`]. A repeated call with a non-advancing
/// timestamp returns the previously computed rate unchanged. A decreasing
/// counter reinitializes the baseline and follows the `on_decrease` policy.
/// Otherwise the rate is `Δvalue / Δtime`, never negative.
pub fn counter_rate(
    store: &mut dyn ValueStore,
    key: &str,
    timestamp: f64,
    value: f64,
    on_decrease: OnDecrease,
) -> Result<f64, RateError> {
    let rate_key = format!("{key}.rate");

    let Some((last_time, last_value)) = store.get(key) else {
        store.set(key, timestamp, value);
        return Err(RateError::NotYetAvailable);
    };

    if timestamp <= last_time {
        // Same cycle replayed: hand back the stored result untouched.
        return match store.get(&rate_key) {
            Some((_, rate)) => Ok(rate),
            None => Err(RateError::NotYetAvailable),
        };
    }

    if value < last_value {
        store.set(key, timestamp, value);
        return match on_decrease {
            OnDecrease::RaiseReset => Err(RateError::CounterReset),
            OnDecrease::ClampToZero => {
                store.set(&rate_key, timestamp, 0.0);
                Ok(0.0)
            }
        };
    }

    let rate = (value - last_value) / (timestamp - last_time);
    store.set(key, timestamp, value);
    store.set(&rate_key, timestamp, rate);
    Ok(rate)
}
