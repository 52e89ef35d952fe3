//! Projected file entries.
//!
//! An [`Entry`] describes one file or directory visible inside a mount. The
//! entry list is finalized when a container is mounted (and again on every
//! option update); entries are immutable in between.
//!
//! Identity is structural over kind + path: two entries naming the same
//! place in the tree are the same entry even if their declared size or
//! source timestamp differ. This is what lets cache keys survive an entry
//! rebuild with different render options.

use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Nanosecond timestamp within the container's recording clock.
pub type Timestamp = i64;

/// What kind of node an entry projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Invalid,
}

/// Immutable descriptor of a projected file or directory.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Node kind.
    pub kind: EntryKind,
    /// Directory names from the mount root to this entry's parent.
    pub path_parts: Vec<String>,
    /// Leaf name, including extension.
    pub name: String,
    /// Declared logical size in bytes. For frame entries this is the
    /// typical DNG size measured at mount time, not the exact encoded size.
    pub size: u64,
    /// Opaque tag; for frame entries, the source timestamp of the physical
    /// frame this entry projects to.
    pub user_data: Timestamp,
}

impl Entry {
    /// Create a file entry directly under the mount root.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            path_parts: Vec::new(),
            name: name.into(),
            size,
            user_data: 0,
        }
    }

    /// Attach a source timestamp tag.
    pub fn with_user_data(mut self, user_data: Timestamp) -> Self {
        self.user_data = user_data;
        self
    }

    /// The entry's path relative to the mount root.
    pub fn full_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for part in &self.path_parts {
            path.push(part);
        }
        path.push(&self.name);
        path
    }

    /// True if the leaf name ends with the given extension (no dot).
    pub fn has_extension(&self, ext: &str) -> bool {
        self.name
            .rsplit('.')
            .next()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.path_parts == other.path_parts && self.name == other.name
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.path_parts.hash(state);
        self.name.hash(state);
    }
}
