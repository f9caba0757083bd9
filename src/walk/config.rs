//! Configuration for the accumulation walk

use crate::stats::TimeKind;

use super::traversal::FollowLinks;

/// Policy knobs for one invocation. All roots share one config.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Report all entries, not just directories.
    pub all: bool,
    /// Count every hard link instead of deduplicating by device/inode.
    pub count_links: bool,
    /// Deduplicate every entry, not just multi-link files. Needed when the
    /// same inode can be reached through two roots or followed symlinks.
    pub hash_all: bool,
    /// Keep subdirectory totals out of each directory's reported number.
    pub separate_dirs: bool,
    /// Do not descend into directories on other filesystems.
    pub one_file_system: bool,
    /// Deepest level to report; `None` means unlimited. Roots are level 0.
    pub max_depth: Option<usize>,
    /// Report entries with cached bytes >= threshold (positive) or
    /// <= |threshold| (negative). Zero reports everything.
    pub threshold: i64,
    pub follow: FollowLinks,
    pub time_kind: TimeKind,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            all: false,
            count_links: false,
            hash_all: false,
            separate_dirs: false,
            one_file_system: false,
            max_depth: None,
            threshold: 0,
            follow: FollowLinks::Never,
            time_kind: TimeKind::Modified,
        }
    }
}
