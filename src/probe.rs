//! Page cache residency probe
//!
//! One `cachestat(2)` call per visited entry, issued against a read-only
//! descriptor. Symlink leaves never get a descriptor; sockets and files
//! that vanish mid-walk degrade to a zero record carrying only the
//! timestamp. Anything else that keeps the counters out of reach is
//! reported as `Unavailable` and left to the caller to downgrade.

use std::fs::{File, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::stats::{CacheStats, TimeKind};

/// The probe could not produce counters for this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unavailable;

/// Per-entry cache counter source. The walker only consumes this trait,
/// so tests can script exact numbers.
pub trait Probe {
    fn probe(&self, path: &Path, meta: &Metadata, symlink: bool)
    -> Result<CacheStats, Unavailable>;
}

/// A record with zero counters and the timestamp selected by `kind`.
pub fn stamp_only(meta: &Metadata, kind: TimeKind) -> CacheStats {
    let (secs, nanos) = match kind {
        TimeKind::Modified => (meta.mtime(), meta.mtime_nsec()),
        TimeKind::Accessed => (meta.atime(), meta.atime_nsec()),
        TimeKind::Changed => (meta.ctime(), meta.ctime_nsec()),
    };
    CacheStats::with_timestamp(secs, nanos as u32)
}

/// Probe backed by the real `cachestat(2)` syscall.
#[derive(Debug, Clone, Copy)]
pub struct CachestatProbe {
    time_kind: TimeKind,
}

impl CachestatProbe {
    pub fn new(time_kind: TimeKind) -> Self {
        Self { time_kind }
    }
}

impl Probe for CachestatProbe {
    fn probe(
        &self,
        path: &Path,
        meta: &Metadata,
        symlink: bool,
    ) -> Result<CacheStats, Unavailable> {
        let mut record = stamp_only(meta, self.time_kind);

        // A symlink's own blob is never page-cache backed.
        if symlink {
            return Ok(record);
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                // UNIX domain socket; counters are necessarily zero.
                return Ok(record);
            }
            Err(_) if !path.exists() => {
                // Vanished between the directory listing and now.
                return Ok(record);
            }
            Err(_) => return Err(Unavailable),
        };

        let pages = cachestat(&file, meta.size()).ok_or(Unavailable)?;
        let page_size = page_size();
        record.cached = pages.nr_cache.saturating_mul(page_size);
        record.dirty = pages.nr_dirty.saturating_mul(page_size);
        record.writeback = pages.nr_writeback.saturating_mul(page_size);
        record.evicted = pages.nr_evicted.saturating_mul(page_size);
        record.recently_evicted = pages.nr_recently_evicted.saturating_mul(page_size);
        Ok(record)
    }
}

/// Raw page counts as returned by the kernel.
#[repr(C)]
#[derive(Debug, Default)]
struct RawCachestat {
    nr_cache: u64,
    nr_dirty: u64,
    nr_writeback: u64,
    nr_evicted: u64,
    nr_recently_evicted: u64,
}

#[cfg(target_os = "linux")]
#[repr(C)]
struct RawCachestatRange {
    off: u64,
    len: u64,
}

// `cachestat(2)` syscall number. Fixed kernel ABI value (451) on every
// architecture; some `libc` builds don't re-export it for gnu/x86_64.
#[cfg(target_os = "linux")]
const SYS_CACHESTAT: libc::c_long = 451;

#[cfg(target_os = "linux")]
fn cachestat(file: &File, len: u64) -> Option<RawCachestat> {
    use std::os::fd::AsRawFd;

    let range = RawCachestatRange { off: 0, len };
    let mut counts = RawCachestat::default();
    // Fails with ENOSYS on kernels before 6.1; the caller downgrades.
    let rc = unsafe {
        libc::syscall(
            SYS_CACHESTAT,
            file.as_raw_fd(),
            &range as *const RawCachestatRange,
            &mut counts as *mut RawCachestat,
            0u32,
        )
    };
    (rc == 0).then_some(counts)
}

#[cfg(not(target_os = "linux"))]
fn cachestat(_file: &File, _len: u64) -> Option<RawCachestat> {
    None
}

#[cfg(target_os = "linux")]
fn page_size() -> u64 {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as u64 } else { 4096 }
}

#[cfg(not(target_os = "linux"))]
fn page_size() -> u64 {
    4096
}
