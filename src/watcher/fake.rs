//! Scriptable in-process watcher for tests and embedding.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::error::WatchError;
use super::event::WatchEvent;
use super::{EventStream, Watcher};

/// A call made against a [`FakeWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCall {
    Add(PathBuf),
    Remove(PathBuf),
}

/// Watcher that records calls and emits whatever events it is handed.
#[derive(Debug)]
pub struct FakeWatcher {
    sender: Mutex<Option<mpsc::UnboundedSender<WatchEvent>>>,
    calls: Mutex<Vec<WatchCall>>,
    fail_adds: AtomicBool,
    fail_removes: AtomicBool,
}

impl FakeWatcher {
    pub fn new() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
                calls: Mutex::new(Vec::new()),
                fail_adds: AtomicBool::new(false),
                fail_removes: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Emit an event on the stream.
    pub fn inject(&self, event: WatchEvent) -> Result<(), WatchError> {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(WatchError::Closed)?;
        sender.send(event).map_err(|_| WatchError::Closed)
    }

    /// Close the event stream. Events already injected are still delivered.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Every `add`/`remove` call so far, in order, including failed ones.
    pub fn calls(&self) -> Vec<WatchCall> {
        self.calls.lock().clone()
    }

    pub fn adds(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                WatchCall::Add(p) => Some(p.clone()),
                WatchCall::Remove(_) => None,
            })
            .collect()
    }

    pub fn removes(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                WatchCall::Remove(p) => Some(p.clone()),
                WatchCall::Add(_) => None,
            })
            .collect()
    }

    /// Make subsequent `add` calls fail.
    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `remove` calls fail.
    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

impl Watcher for FakeWatcher {
    fn add(&self, path: &Path) -> Result<(), WatchError> {
        self.calls.lock().push(WatchCall::Add(path.to_path_buf()));
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), WatchError> {
        self.calls.lock().push(WatchCall::Remove(path.to_path_buf()));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(WatchError::UnwatchFailed {
                path: path.to_path_buf(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}
