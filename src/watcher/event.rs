//! Normalized change events and their translation from `notify`.

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind, RenameMode};

/// A filesystem change as the loader sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A path appeared.
    Create(PathBuf),
    /// A path's content changed, or a file was renamed over it.
    Update(PathBuf),
    /// A path disappeared or was renamed away.
    Delete(PathBuf),
    /// Anything the watcher could not classify.
    Unknown { kind: String, paths: Vec<PathBuf> },
}

/// Translate one `notify` event into zero or more [`WatchEvent`]s.
///
/// Access events are dropped. A rename onto a path is an update so the new
/// content gets compiled. Ambiguous renames (`RenameMode::Any`, reported by
/// some backends for both sides) are resolved by checking whether the path
/// still exists. So are removals: a file watch reports its old inode as
/// removed after a rename-over, while the path now holds the new file.
pub fn normalize(event: notify::Event) -> Vec<WatchEvent> {
    let notify::Event { kind, paths, .. } = event;

    match kind {
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Create(_) => paths.into_iter().map(WatchEvent::Create).collect(),
        EventKind::Remove(_) => paths.into_iter().map(by_existence).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.into_iter().map(WatchEvent::Delete).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.into_iter().map(WatchEvent::Update).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => {
            let mut paths = paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![WatchEvent::Delete(from), WatchEvent::Update(to)],
                _ => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths.into_iter().map(by_existence).collect(),
        EventKind::Modify(_) => paths.into_iter().map(WatchEvent::Update).collect(),
        EventKind::Any | EventKind::Other => vec![WatchEvent::Unknown {
            kind: format!("{kind:?}"),
            paths,
        }],
    }
}

/// Update if something is still at `path`, Delete otherwise.
fn by_existence(path: PathBuf) -> WatchEvent {
    if path.exists() {
        WatchEvent::Update(path)
    } else {
        WatchEvent::Delete(path)
    }
}
