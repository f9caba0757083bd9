//! The traversal-and-accumulation engine
//!
//! Drives one `Traversal` per root, applies the counting policies
//! (exclusion, hard-link dedup, filesystem boundaries, cycle handling),
//! feeds surviving records through the level accumulator and decides which
//! rows reach the report sink. One walker instance spans the whole
//! invocation so deduplication works across roots.

use std::fs::Metadata;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::filter::ExclusionFilter;
use crate::levels::LevelAccumulator;
use crate::output::ReportSink;
use crate::probe::{self, Probe};
use crate::stats::CacheStats;

use super::config::WalkerConfig;
use super::dedup::{DevIno, DevInoSet};
use super::mounts;
use super::traversal::{Traversal, Visit, VisitKind};

pub struct Walker<'a, P> {
    config: &'a WalkerConfig,
    filter: &'a ExclusionFilter,
    probe: &'a P,
    levels: LevelAccumulator,
    seen: DevInoSet,
    mounts: Option<DevInoSet>,
    grand_total: CacheStats,
    root_dev: u64,
}

impl<'a, P: Probe> Walker<'a, P> {
    pub fn new(config: &'a WalkerConfig, filter: &'a ExclusionFilter, probe: &'a P) -> Self {
        Self {
            config,
            filter,
            probe,
            levels: LevelAccumulator::new(),
            seen: DevInoSet::new(),
            mounts: None,
            grand_total: CacheStats::zero(),
            root_dev: 0,
        }
    }

    /// Every counted record merged together, across all roots walked so
    /// far, independent of depth limits and thresholds.
    pub fn grand_total(&self) -> &CacheStats {
        &self.grand_total
    }

    /// Walk one root to completion. Returns `false` when anything was
    /// reported to the operator (unreadable entries, genuine cycles, a
    /// failed directory stream); totals still cover whatever was readable.
    pub fn walk_root<S: ReportSink>(&mut self, root: &Path, sink: &mut S) -> io::Result<bool> {
        let mut ok = true;
        let mut traversal = Traversal::new(root, self.config.follow);

        while let Some(step) = traversal.next_visit() {
            match step {
                Ok(visit) => ok &= self.process(visit, &mut traversal, sink)?,
                Err(e) => {
                    eprintln!("mu: reading directory under {}: {}", root.display(), e);
                    // The rest of this root cannot be trusted; make sure
                    // the next root starts from a clean depth.
                    self.levels.reset_depth();
                    return Ok(false);
                }
            }
        }
        Ok(ok)
    }

    fn process<S: ReportSink>(
        &mut self,
        visit: Visit,
        traversal: &mut Traversal,
        sink: &mut S,
    ) -> io::Result<bool> {
        let Visit { path, depth, kind } = visit;

        match kind {
            VisitKind::UnreadableDir { meta, error } => {
                // The listing is lost but the directory's own entry still
                // has a knowable size; count it.
                eprintln!("mu: cannot read directory {}: {}", path.display(), error);
                self.account(&path, depth, &meta, true, false, sink)?;
                Ok(false)
            }
            VisitKind::PostDir { meta } => {
                self.account(&path, depth, &meta, true, false, sink)?;
                Ok(true)
            }
            VisitKind::Inaccessible { error } => {
                if self.filter.is_excluded(&path) {
                    return Ok(true);
                }
                eprintln!("mu: cannot access {}: {}", path.display(), error);
                Ok(false)
            }
            VisitKind::PreDir { meta } => {
                if self.skip_entry(&path, depth, &meta, traversal, true) {
                    return Ok(true);
                }
                // Totals for this directory arrive with its postorder
                // visit; nothing to record yet.
                Ok(true)
            }
            VisitKind::Cycle { meta, chain } => {
                if self.skip_entry(&path, depth, &meta, traversal, false) {
                    return Ok(true);
                }
                if self.cycle_is_mount_backed(&chain) {
                    // A bind mount re-exposing an ancestor: everything in
                    // it is already counted, so drop it silently.
                    return Ok(true);
                }
                eprintln!(
                    "mu: WARNING: circular directory structure; the following directory is part of the cycle: {}",
                    path.display()
                );
                Ok(false)
            }
            VisitKind::Leaf { meta, symlink } => {
                if self.skip_entry(&path, depth, &meta, traversal, false) {
                    return Ok(true);
                }
                self.account(&path, depth, &meta, false, symlink, sink)?;
                Ok(true)
            }
        }
    }

    /// Shared count-or-skip policy for every non-postorder visit:
    /// exclusion, filesystem boundaries, then hard-link deduplication.
    /// Returns `true` when the entry (and, for directories, its subtree)
    /// must be left out of the statistics.
    fn skip_entry(
        &mut self,
        path: &Path,
        depth: usize,
        meta: &Metadata,
        traversal: &mut Traversal,
        pre_dir: bool,
    ) -> bool {
        if depth == 0 {
            self.root_dev = meta.dev();
        }

        let mut skip = self.filter.is_excluded(path);

        // Crossing onto another filesystem can only happen below a root;
        // the roots themselves are always counted.
        if !skip && self.config.one_file_system && depth > 0 && meta.dev() != self.root_dev {
            skip = true;
        }

        if !skip && !self.config.count_links {
            let needs_hash =
                self.config.hash_all || (!meta.is_dir() && meta.nlink() > 1);
            if needs_hash && !self.seen.insert(DevIno::of(meta)) {
                skip = true;
            }
        }

        if skip && pre_dir {
            traversal.skip_subtree();
        }
        skip
    }

    fn cycle_is_mount_backed(&mut self, chain: &[DevIno]) -> bool {
        let mounts = self
            .mounts
            .get_or_insert_with(mounts::local_mount_points);
        chain.iter().any(|id| mounts.contains(*id))
    }

    /// Probe the entry, fold it into the level machine and the grand
    /// total, and emit its row when display policy says so.
    fn account<S: ReportSink>(
        &mut self,
        path: &Path,
        depth: usize,
        meta: &Metadata,
        dir_entry: bool,
        symlink: bool,
        sink: &mut S,
    ) -> io::Result<()> {
        let record = self
            .probe
            .probe(path, meta, symlink)
            .unwrap_or_else(|_| probe::stamp_only(meta, self.config.time_kind));

        let reported =
            self.levels
                .accumulate(depth, &record, dir_entry, self.config.separate_dirs);
        self.grand_total.merge(&record);

        if self.displayable(depth, dir_entry) && self.passes_threshold(reported.cached) {
            sink.entry(&reported, path)?;
        }
        Ok(())
    }

    fn displayable(&self, depth: usize, dir_entry: bool) -> bool {
        let within = self.config.max_depth.is_none_or(|max| depth <= max);
        (within && (dir_entry || self.config.all)) || depth == 0
    }

    fn passes_threshold(&self, cached: u64) -> bool {
        let threshold = self.config.threshold;
        if threshold < 0 {
            cached <= threshold.unsigned_abs()
        } else {
            cached >= threshold as u64
        }
    }
}
