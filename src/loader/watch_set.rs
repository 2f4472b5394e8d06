//! Set of program files the loader has individually watched.
//!
//! The program directory is watched as a whole at startup. Files are added
//! here once an event shows them, so a rename-over that a directory watch
//! alone could miss is still seen. Entries are base file names.

use std::collections::HashSet;

use parking_lot::RwLock;

/// Guarded set of individually watched file names.
///
/// Only the reconciliation loop writes; diagnostics may read at any time.
#[derive(Debug, Default)]
pub struct WatchSet {
    names: RwLock<HashSet<String>>,
}

impl WatchSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name, returning `true` if it was not already present.
    pub fn insert(&self, name: &str) -> bool {
        let mut names = self.names.write();
        if names.contains(name) {
            return false;
        }
        names.insert(name.to_string())
    }

    /// Remove a name, returning `true` if it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.names.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.read().contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.read().iter().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let set = WatchSet::new();

        assert!(set.insert("a.mtail"));
        assert!(!set.insert("a.mtail"));

        assert_eq!(set.len(), 1);
        assert!(set.contains("a.mtail"));
    }

    #[test]
    fn test_remove() {
        let set = WatchSet::new();
        set.insert("a.mtail");

        assert!(set.remove("a.mtail"));
        assert!(!set.remove("a.mtail"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_names_sorted() {
        let set = WatchSet::new();
        set.insert("c.mtail");
        set.insert("a.mtail");
        set.insert("b.mtail");

        assert_eq!(set.names(), vec!["a.mtail", "b.mtail", "c.mtail"]);
    }
}
