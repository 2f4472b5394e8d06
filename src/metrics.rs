//! Shared metric namespace programs declare their counters in.
//!
//! Counters are keyed by name across all programs. Declaring a name that
//! already exists hands back the existing counter, so a reloaded program
//! keeps counting where its previous instance stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

/// A monotonically increasing counter owned by the namespace.
#[derive(Debug)]
pub struct Counter {
    name: String,
    /// Program that first declared the counter.
    program: String,
    value: AtomicU64,
}

impl Counter {
    fn new(name: &str, program: &str) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Point-in-time copy of one counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterValue {
    pub name: String,
    pub program: String,
    pub value: u64,
}

/// Concurrent metric namespace shared by the compiler and running programs.
#[derive(Debug, Default)]
pub struct MetricStore {
    counters: DashMap<String, Arc<Counter>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a counter, returning the existing one if the name is taken.
    pub fn declare(&self, name: &str, program: &str) -> Arc<Counter> {
        self.counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Counter::new(name, program)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Counter>> {
        self.counters.get(name).map(|c| c.clone())
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// All counters sorted by name.
    pub fn snapshot(&self) -> Vec<CounterValue> {
        let mut values: Vec<CounterValue> = self
            .counters
            .iter()
            .map(|entry| {
                let counter = entry.value();
                CounterValue {
                    name: counter.name.clone(),
                    program: counter.program.clone(),
                    value: counter.value(),
                }
            })
            .collect();
        values.sort_by(|a, b| a.name.cmp(&b.name));
        values
    }
}
