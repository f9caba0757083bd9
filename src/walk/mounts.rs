//! Local mount point discovery
//!
//! Cycle handling needs to know which directories are mount roots: a
//! repeated directory reached through a bind mount is already-counted
//! territory, not a corrupted tree. The mount table is read from
//! `/proc/self/mounts` once, on the first genuine cycle check; remote and
//! virtual filesystems are left out, and directories that cannot be
//! stat'ed are ignored (false positives like unreachable gvfs mounts are
//! too common to report).

use std::ffi::OsString;
use std::fs;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

use super::dedup::{DevIno, DevInoSet};

/// Filesystem types that never hold regular page-cache-backed files.
const DUMMY_FS_TYPES: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "proc",
    "pstore",
    "rpc_pipefs",
    "securityfs",
    "sysfs",
    "tracefs",
];

/// Build the set of local mount point identities.
pub fn local_mount_points() -> DevInoSet {
    let table = fs::read_to_string("/proc/self/mounts").unwrap_or_default();
    let mut mounts = DevInoSet::new();
    for dir in parse_mount_dirs(&table) {
        if let Ok(meta) = fs::metadata(&dir) {
            mounts.insert(DevIno::of(&meta));
        }
    }
    mounts
}

/// Extract the mount directories of local, non-dummy filesystems from
/// mount-table text in the `/proc/self/mounts` format.
fn parse_mount_dirs(table: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(source), Some(dir), Some(fstype)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if is_remote_source(source) || DUMMY_FS_TYPES.contains(&fstype) {
            continue;
        }
        dirs.push(PathBuf::from(unescape_mount_field(dir)));
    }
    dirs
}

/// Remote filesystems look like `host:/export` or `//server/share`.
fn is_remote_source(source: &str) -> bool {
    source.contains(':') || source.starts_with("//")
}

/// Mount fields escape whitespace and backslashes as three-digit octal
/// (`\040` for space); everything else passes through unchanged.
fn unescape_mount_field(field: &str) -> OsString {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let octal = &bytes[i + 1..i + 4];
            if octal.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = (octal[0] - b'0') * 64 + (octal[1] - b'0') * 8 + (octal[2] - b'0');
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    OsString::from_vec(out)
}
