//! `notify`-backed watcher for the real filesystem.

use std::path::Path;

use notify::{Event, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::error::WatchError;
use super::event::normalize;
use super::{EventStream, Watcher};

/// Watches individual paths with a single `notify::RecommendedWatcher`.
///
/// Every watch is non-recursive: a directory watch reports changes to its
/// direct children, a file watch reports changes to that file.
pub struct NotifyWatcher {
    /// The underlying OS watcher. `None` once closed.
    inner: Mutex<Option<notify::RecommendedWatcher>>,
}

impl NotifyWatcher {
    /// Create the watcher and the stream its events arrive on.
    ///
    /// The stream is unbounded: the notify callback thread must never block,
    /// since `add`/`remove` called from the stream's consumer wait on that
    /// same thread.
    pub fn new() -> Result<(Self, EventStream), WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in normalize(event) {
                    crate::debug_event!("watcher", "event", "{change:?}");
                    if tx.send(change).is_err() {
                        // Consumer is gone
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::error!("[watcher] file watch error: {e}");
            }
        })?;

        Ok((
            Self {
                inner: Mutex::new(Some(watcher)),
            },
            rx,
        ))
    }

    /// Stop watching everything and close the event stream.
    pub fn close(&self) {
        if self.inner.lock().take().is_some() {
            crate::log_event!("watcher", "closed");
        }
    }
}

impl Watcher for NotifyWatcher {
    fn add(&self, path: &Path) -> Result<(), WatchError> {
        let mut guard = self.inner.lock();
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("watcher", "watching", "{}", path.display());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), WatchError> {
        let mut guard = self.inner.lock();
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;

        watcher
            .unwatch(path)
            .map_err(|e| WatchError::UnwatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("watcher", "unwatched", "{}", path.display());
        Ok(())
    }
}
