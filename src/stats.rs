//! Per-entry page cache statistics and their merge algebra
//!
//! `CacheStats` is the record every visited file or directory produces and
//! every accumulator holds: five byte counters sourced from `cachestat(2)`
//! plus the newest relevant timestamp seen so far. Counters never wrap;
//! merging saturates at `u64::MAX`.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

/// Which file timestamp feeds the "newest" field (selected by `--time`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeKind {
    #[default]
    Modified,
    Accessed,
    Changed,
}

/// Page cache residency counters for one entry, in bytes, plus the newest
/// timestamp of any entry merged in so far. `newest` starts at `None`,
/// which orders below every concrete timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub cached: u64,
    pub dirty: u64,
    pub writeback: u64,
    pub evicted: u64,
    pub recently_evicted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<DateTime<Utc>>,
}

impl CacheStats {
    /// A zeroed record; the identity element of `merge`.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build a record carrying only a timestamp taken from `secs`/`nanos`
    /// since the epoch. Out-of-range values leave the sentinel in place.
    pub fn with_timestamp(secs: i64, nanos: u32) -> Self {
        Self {
            newest: Utc.timestamp_opt(secs, nanos).single(),
            ..Self::default()
        }
    }

    /// Fold `other` into `self`: counters add with saturation, the newest
    /// timestamp wins (ties keep the existing value).
    pub fn merge(&mut self, other: &CacheStats) {
        self.cached = self.cached.saturating_add(other.cached);
        self.dirty = self.dirty.saturating_add(other.dirty);
        self.writeback = self.writeback.saturating_add(other.writeback);
        self.evicted = self.evicted.saturating_add(other.evicted);
        self.recently_evicted = self.recently_evicted.saturating_add(other.recently_evicted);
        if other.newest > self.newest {
            self.newest = other.newest;
        }
    }

    /// `merge` without mutation, for call sites that want an expression.
    pub fn merged(mut self, other: &CacheStats) -> Self {
        self.merge(other);
        self
    }
}
