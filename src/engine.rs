//! Registry of live program instances.
//!
//! The execution path reads the registry for every log line while the
//! loader swaps entries in and out. Instances are built off to the side and
//! published with a single `Arc` swap under a write lock, so readers see
//! either the old instance or the new one and never wait on a compile.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::vm::Program;

/// Thread-safe mapping from program name to its live instance.
#[derive(Debug, Default)]
pub struct Engine {
    programs: RwLock<HashMap<String, Arc<Program>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `program` under `name`, replacing any previous instance.
    ///
    /// Returns the replaced instance. Holders of it can keep using it.
    pub fn add_or_replace(&self, name: &str, program: Arc<Program>) -> Option<Arc<Program>> {
        self.programs.write().insert(name.to_string(), program)
    }

    /// Remove the instance registered under `name`. Absent names are a no-op.
    pub fn remove(&self, name: &str) -> Option<Arc<Program>> {
        self.programs.write().remove(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Program>> {
        self.programs.read().get(name).cloned()
    }

    /// Consistent point-in-time view of every live program, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, Arc<Program>)> {
        let mut programs: Vec<(String, Arc<Program>)> = self
            .programs
            .read()
            .iter()
            .map(|(name, program)| (name.clone(), Arc::clone(program)))
            .collect();
        programs.sort_by(|a, b| a.0.cmp(&b.0));
        programs
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.programs.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.programs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.read().is_empty()
    }

    /// Feed one line to every live program. Returns total counter increments.
    pub fn process_line(&self, line: &str) -> usize {
        // Run outside the lock so a reload never waits on execution
        self.snapshot()
            .iter()
            .map(|(_, program)| program.process_line(line))
            .sum()
    }
}
