//! Depth-first cursor over a single root
//!
//! The cursor delivers one visit per call: directories once in preorder
//! and once in postorder, everything else exactly once. Entries within a
//! directory are visited in name order. Directory identities on the
//! current ancestor chain are tracked so a repeated directory surfaces as
//! a cycle visit instead of recursing forever.

use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use super::dedup::DevIno;

/// Symlink policy for the walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FollowLinks {
    /// Treat every symlink as a leaf (the default).
    #[default]
    Never,
    /// Follow symlinks named on the command line, nothing deeper.
    CommandLine,
    /// Follow every symlink.
    Always,
}

impl FollowLinks {
    fn follows_at(self, depth: usize) -> bool {
        match self {
            FollowLinks::Never => false,
            FollowLinks::CommandLine => depth == 0,
            FollowLinks::Always => true,
        }
    }
}

/// One delivered visit. `depth` is 0 for the root itself.
#[derive(Debug)]
pub struct Visit {
    pub path: PathBuf,
    pub depth: usize,
    pub kind: VisitKind,
}

#[derive(Debug)]
pub enum VisitKind {
    /// Directory about to be entered; its totals arrive with `PostDir`.
    PreDir { meta: Metadata },
    /// Directory after all of its children; totals are now final.
    PostDir { meta: Metadata },
    /// Directory whose listing could not be opened. Delivered instead of
    /// the pre/post pair; the entry itself is still countable.
    UnreadableDir { meta: Metadata, error: io::Error },
    /// Directory already present on the ancestor chain. `chain` holds the
    /// identities from this entry up to, but not including, the repeated
    /// ancestor.
    Cycle { meta: Metadata, chain: Vec<DevIno> },
    /// File or other non-directory entry; `symlink` marks an unfollowed
    /// symbolic link.
    Leaf { meta: Metadata, symlink: bool },
    /// Entry whose metadata could not be read (vanished file, broken link
    /// under a follow policy, unreachable root).
    Inaccessible { error: io::Error },
}

struct Frame {
    path: PathBuf,
    meta: Metadata,
    id: DevIno,
    depth: usize,
    children: std::vec::IntoIter<OsString>,
}

enum ListError {
    /// The directory could not be opened at all.
    Open(io::Error),
    /// The stream failed while being read; the walk cannot trust the rest
    /// of this root.
    Read(io::Error),
}

/// Iterative traversal state for one root path.
pub struct Traversal {
    follow: FollowLinks,
    pending_root: Option<PathBuf>,
    stack: Vec<Frame>,
}

impl Traversal {
    pub fn new(root: impl Into<PathBuf>, follow: FollowLinks) -> Self {
        Self {
            follow,
            pending_root: Some(root.into()),
            stack: Vec::new(),
        }
    }

    /// Deliver the next visit, `None` when the root is exhausted. A
    /// top-level `Err` means the directory stream itself failed and the
    /// rest of this root cannot be walked.
    pub fn next_visit(&mut self) -> Option<Result<Visit, io::Error>> {
        if let Some(root) = self.pending_root.take() {
            return Some(self.visit_entry(root, 0));
        }

        let frame = self.stack.last_mut()?;
        match frame.children.next() {
            Some(name) => {
                let path = frame.path.join(name);
                let depth = frame.depth + 1;
                Some(self.visit_entry(path, depth))
            }
            None => {
                let frame = self.stack.pop()?;
                Some(Ok(Visit {
                    path: frame.path,
                    depth: frame.depth,
                    kind: VisitKind::PostDir { meta: frame.meta },
                }))
            }
        }
    }

    /// Drop the directory most recently delivered as `PreDir`, skipping
    /// its children and swallowing the postorder visit that would
    /// otherwise follow.
    pub fn skip_subtree(&mut self) {
        self.stack.pop();
    }

    fn visit_entry(&mut self, path: PathBuf, depth: usize) -> Result<Visit, io::Error> {
        let meta = match self.stat(&path, depth) {
            Ok(meta) => meta,
            Err(error) => {
                return Ok(Visit {
                    path,
                    depth,
                    kind: VisitKind::Inaccessible { error },
                });
            }
        };

        if !meta.is_dir() {
            let symlink = meta.is_symlink();
            return Ok(Visit {
                path,
                depth,
                kind: VisitKind::Leaf { meta, symlink },
            });
        }

        let id = DevIno::of(&meta);
        if let Some(pos) = self.stack.iter().position(|f| f.id == id) {
            // Identities strictly below the repeated ancestor, newest
            // first, ending with the entry itself.
            let mut chain = vec![id];
            chain.extend(self.stack[pos + 1..].iter().rev().map(|f| f.id));
            return Ok(Visit {
                path,
                depth,
                kind: VisitKind::Cycle { meta, chain },
            });
        }

        match list_dir(&path) {
            Ok(children) => {
                self.stack.push(Frame {
                    path: path.clone(),
                    meta: meta.clone(),
                    id,
                    depth,
                    children: children.into_iter(),
                });
                Ok(Visit {
                    path,
                    depth,
                    kind: VisitKind::PreDir { meta },
                })
            }
            Err(ListError::Open(error)) => Ok(Visit {
                path,
                depth,
                kind: VisitKind::UnreadableDir { meta, error },
            }),
            Err(ListError::Read(error)) => Err(error),
        }
    }

    fn stat(&self, path: &Path, depth: usize) -> io::Result<Metadata> {
        if self.follow.follows_at(depth) {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
    }
}

fn list_dir(path: &Path) -> Result<Vec<OsString>, ListError> {
    let entries = fs::read_dir(path).map_err(ListError::Open)?;
    let mut names = Vec::new();
    for entry in entries {
        names.push(entry.map_err(ListError::Read)?.file_name());
    }
    names.sort();
    Ok(names)
}
