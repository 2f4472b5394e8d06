//! Filesystem watcher collaborator.
//!
//! The loader talks to a [`Watcher`] to add and remove watches, and consumes
//! the [`EventStream`] the watcher was created with.
//!
//! # Architecture
//!
//! ```text
//! OS notifications
//!       |
//! NotifyWatcher (notify::RecommendedWatcher)
//!       |  normalize()
//!       v
//! EventStream: Create | Update | Delete | Unknown
//!       |
//! ProgramLoader reconciliation loop
//! ```

mod error;
mod event;
mod fake;
mod noop;
mod notify_watcher;

use std::path::Path;

use tokio::sync::mpsc;

pub use error::WatchError;
pub use event::{WatchEvent, normalize};
pub use fake::{FakeWatcher, WatchCall};
pub use noop::NoopWatcher;
pub use notify_watcher::NotifyWatcher;

/// Stream of normalized events produced by a watcher.
///
/// The stream ends when the watcher that produced it is closed.
pub type EventStream = mpsc::UnboundedReceiver<WatchEvent>;

/// Adds and removes filesystem watches.
pub trait Watcher: Send + Sync {
    /// Start watching `path`. Watching a path twice is not an error.
    fn add(&self, path: &Path) -> Result<(), WatchError>;

    /// Stop watching `path`.
    fn remove(&self, path: &Path) -> Result<(), WatchError>;
}
