//! Cross-cycle persistence contract.
//!
//! The engine never owns state across check cycles; the caller supplies a
//! [`ValueStore`] scoped to "this item on this host" and the engine performs
//! plain read-modify-write cycles on string keys. The scheduler guarantees
//! at most one concurrent execution per store instance, so no locking
//! happens here.

use std::collections::HashMap;

/// External per-item key/value map surviving across check cycles.
///
/// Keys are engine-constructed from interface identity, counter name and,
/// for averages, the smoothing backlog. Values are `(timestamp, value)`
/// pairs in epoch seconds.
pub trait ValueStore {
    fn get(&self, key: &str) -> Option<(f64, f64)>;
    fn set(&mut self, key: &str, timestamp: f64, value: f64);
}

/// In-memory [`ValueStore`] for tests and embedders that keep cycle state
/// in process.
#[derive(Debug, Default, Clone)]
pub struct MemoryValueStore {
    entries: HashMap<String, (f64, f64)>,
}

impl MemoryValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ValueStore for MemoryValueStore {
    fn get(&self, key: &str) -> Option<(f64, f64)> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: &str, timestamp: f64, value: f64) {
        self.entries.insert(key.to_string(), (timestamp, value));
    }
}
