//! Filesystem abstraction used by the loader.
//!
//! [`OsFs`] reads the real disk. [`MemFs`] keeps an in-memory tree so the
//! loader can be exercised without touching the filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// One directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Base name of the entry.
    pub name: String,
    pub is_dir: bool,
}

/// Directory listing and read access to program files.
pub trait FileSystem: Send + Sync {
    /// List the direct children of `dir`, sorted by name.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Open a file for reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Follow symlinks so a linked program counts as a regular file
            let is_dir = fs::metadata(entry.path())
                .map(|m| m.is_dir())
                .unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
}

#[derive(Debug, Default)]
struct MemTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

/// In-memory filesystem.
///
/// Writing a file creates its parent directories.
#[derive(Debug, Default)]
pub struct MemFs {
    tree: RwLock<MemTree>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_dir_all(&self, dir: impl AsRef<Path>) {
        let mut tree = self.tree.write();
        for ancestor in dir.as_ref().ancestors() {
            if !ancestor.as_os_str().is_empty() {
                tree.dirs.insert(ancestor.to_path_buf());
            }
        }
    }

    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent);
        }
        self.tree
            .write()
            .files
            .insert(path.to_path_buf(), contents.into());
    }

    /// Remove a file. Returns whether it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.tree.write().files.remove(path.as_ref()).is_some()
    }

    /// Move a file, replacing whatever was at `to`.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> io::Result<()> {
        let contents = self
            .tree
            .write()
            .files
            .remove(from.as_ref())
            .ok_or_else(|| not_found(from.as_ref()))?;
        self.write_file(to, contents);
        Ok(())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

impl FileSystem for MemFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let tree = self.tree.read();
        if !tree.dirs.contains(dir) {
            return Err(not_found(dir));
        }

        let child_name = |p: &Path| -> Option<String> {
            if p.parent() != Some(dir) {
                return None;
            }
            p.file_name().map(|n| n.to_string_lossy().into_owned())
        };

        let mut entries: Vec<DirEntry> = tree
            .dirs
            .iter()
            .filter_map(|d| child_name(d.as_path()))
            .map(|name| DirEntry { name, is_dir: true })
            .chain(
                tree.files
                    .keys()
                    .filter_map(|f| child_name(f.as_path()))
                    .map(|name| DirEntry {
                        name,
                        is_dir: false,
                    }),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let tree = self.tree.read();
        if tree.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{}: is a directory", path.display()),
            ));
        }
        let contents = tree.files.get(path).ok_or_else(|| not_found(path))?;
        Ok(Box::new(Cursor::new(contents.clone())))
    }
}
