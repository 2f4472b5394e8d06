//! Per-program load counters.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::Serialize;

/// Exported name of the successful-load counter.
pub const LOADS_METRIC: &str = "prog_loads_total";

/// Exported name of the load-error counter.
pub const ERRORS_METRIC: &str = "prog_load_errors";

/// Receives one increment per load attempt, keyed by program name.
pub trait LoadCounters: Send + Sync {
    fn record_load(&self, name: &str);
    fn record_error(&self, name: &str);
}

/// In-memory [`LoadCounters`] that can be read back and exported.
#[derive(Debug, Default)]
pub struct LoadMetrics {
    loads: DashMap<String, u64>,
    errors: DashMap<String, u64>,
}

/// Point-in-time copy of [`LoadMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadMetricsSnapshot {
    #[serde(rename = "prog_loads_total")]
    pub loads: BTreeMap<String, u64>,
    #[serde(rename = "prog_load_errors")]
    pub errors: BTreeMap<String, u64>,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loads(&self, name: &str) -> u64 {
        self.loads.get(name).map(|v| *v).unwrap_or(0)
    }

    pub fn errors(&self, name: &str) -> u64 {
        self.errors.get(name).map(|v| *v).unwrap_or(0)
    }

    pub fn snapshot(&self) -> LoadMetricsSnapshot {
        let copy = |map: &DashMap<String, u64>| -> BTreeMap<String, u64> {
            map.iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect()
        };
        LoadMetricsSnapshot {
            loads: copy(&self.loads),
            errors: copy(&self.errors),
        }
    }
}

impl LoadCounters for LoadMetrics {
    fn record_load(&self, name: &str) {
        *self.loads.entry(name.to_string()).or_insert(0) += 1;
    }

    fn record_error(&self, name: &str) {
        *self.errors.entry(name.to_string()).or_insert(0) += 1;
    }
}
