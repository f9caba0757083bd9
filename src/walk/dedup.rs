//! Device/inode identity sets
//!
//! Hard links and repeated mounts make the same file reachable through
//! several paths; a `(device, inode)` pair names the underlying object
//! uniquely. Two independent sets share this shape with different
//! lifetimes: the dedup set spans the whole invocation, the mount-point
//! set is built once on the first genuine cycle check.

use std::collections::HashSet;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

/// Identity of a filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevIno {
    pub dev: u64,
    pub ino: u64,
}

impl DevIno {
    pub fn of(meta: &Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

/// Insert-only set of filesystem identities.
#[derive(Debug, Default)]
pub struct DevInoSet {
    entries: HashSet<DevIno>,
}

impl DevInoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`, reporting whether it was newly added. A `false` return
    /// means the object was seen before and must not be counted again.
    pub fn insert(&mut self, id: DevIno) -> bool {
        self.entries.insert(id)
    }

    pub fn contains(&self, id: DevIno) -> bool {
        self.entries.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
