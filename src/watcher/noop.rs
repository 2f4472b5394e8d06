//! Watcher for one-shot loads that never consume events.

use std::path::Path;

use super::Watcher;
use super::error::WatchError;

/// Accepts every `add`/`remove` and watches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatcher;

impl Watcher for NoopWatcher {
    fn add(&self, path: &Path) -> Result<(), WatchError> {
        crate::debug_event!("watcher", "not watching", "{}", path.display());
        Ok(())
    }

    fn remove(&self, _path: &Path) -> Result<(), WatchError> {
        Ok(())
    }
}
