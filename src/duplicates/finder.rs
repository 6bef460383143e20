//! Duplicate finder: walk, hash, group.
//!
//! # Overview
//!
//! This module orchestrates the scan pipeline:
//! 1. **Walk**: a single-threaded [`Walker`] admits regular files
//! 2. **Hash**: admitted files are batched by `(dev, ino)` and resolved on
//!    a bounded rayon pool, trusting the xattr cache when it is fresh
//! 3. **Group**: keys are merged into a [`GroupMap`] and reduced to
//!    [`DuplicateGroup`]s
//!
//! One worker owns each inode, so no two threads ever hash the same file
//! or write the same attributes.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::duplicates::DuplicateFinder;
//! use dedupe::scanner::ScanConfig;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(ScanConfig::default());
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//! for group in &groups {
//!     println!("{}: {} copies", group.hash_hex(), group.len());
//! }
//! println!("{summary}");
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::groups::{DedupKey, DuplicateGroup, GroupMap};
use crate::metadata::Metadata;
use crate::progress::ProgressCallback;
use crate::scanner::{FileKind, FileRecord, Item, ScanConfig, ScanError, ScanSummary, Walker};

/// Phase name reported to progress callbacks.
pub const PHASE_HASHING: &str = "hashing";

/// Result of resolving one file's identity.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub meta: Metadata,
    /// Content was read (cache missing, stale or ignored)
    pub hashed: bool,
}

/// Load, validate and if necessary recompute the cached identity of an
/// open regular file, then persist it.
///
/// The cache is trusted only when it is complete and its size and time
/// match the item's snapshot. Attributes are written after a recompute,
/// or always when `rewrite` is set. Returns `None` when hashing fails.
#[must_use]
pub fn resolve_metadata(item: &Item, config: &ScanConfig) -> Option<Resolution> {
    let file = item.file()?;
    let size = item.size_i64();
    let mut meta = Metadata::default();

    let loaded = !config.rescan && meta.load(file, &item.path, &config.names);
    let mut hashed = false;
    if !loaded || !meta.check(size, item.time) {
        if !meta.compute(file, &item.path, size, item.time) {
            return None;
        }
        hashed = true;
        log::trace!("{}: hashed ({} bytes)", item.path.display(), size);
    } else {
        log::trace!("{}: cache hit", item.path.display());
    }

    if hashed || config.rewrite {
        meta.save(file, &item.path, &config.names);
    }
    Some(Resolution { meta, hashed })
}

/// Counters and keys produced by one batch.
#[derive(Debug, Default)]
struct BatchOutcome {
    map: GroupMap,
    cache_hits: usize,
    files_hashed: usize,
    bytes_hashed: u64,
    errors: usize,
    changed: usize,
}

/// Scan driver.
pub struct DuplicateFinder {
    config: ScanConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.config)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl DuplicateFinder {
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `roots` and return duplicate groups in digest order.
    ///
    /// # Errors
    ///
    /// Fails only when no roots are given or the worker pool cannot be
    /// started. Unreadable entries are counted in
    /// [`ScanSummary::errors`] instead.
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), ScanError> {
        if roots.is_empty() {
            return Err(ScanError::NoRoots);
        }

        let start = Instant::now();
        let mut summary = ScanSummary::default();

        let mut walker = Walker::new(&self.config);
        if let Some(cb) = &self.progress {
            walker = walker.with_progress(Arc::clone(cb));
        }
        let records = walker.walk(roots, &mut summary);
        log::debug!("Walk admitted {} files", records.len());

        let map = self.hash_records(records, &mut summary)?;
        let groups = map.into_groups(self.config.mode);

        summary.duplicate_groups = groups.len();
        summary.duplicate_paths = groups.iter().map(DuplicateGroup::len).sum();
        summary.duration = start.elapsed();
        log::info!("Scan complete: {summary}");

        Ok((groups, summary))
    }

    /// Resolve every record's identity and file it under its key.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the pool cannot be built.
    pub fn hash_records(
        &self,
        records: Vec<FileRecord>,
        summary: &mut ScanSummary,
    ) -> Result<GroupMap, ScanError> {
        let total = records.len();
        let batches = partition_by_inode(records);
        if batches.is_empty() {
            log::debug!("Nothing to hash");
            return Ok(GroupMap::default());
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_start(PHASE_HASHING, total);
        }
        log::info!(
            "Resolving {} files ({} inodes) on {} threads",
            total,
            batches.len(),
            self.config.io_threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()?;

        let done = AtomicUsize::new(0);
        let outcomes: Vec<BatchOutcome> = pool.install(|| {
            batches
                .into_par_iter()
                .map(|batch| self.hash_batch(batch, &done))
                .collect()
        });

        let mut map = GroupMap::default();
        for outcome in outcomes {
            map.merge(outcome.map);
            summary.cache_hits += outcome.cache_hits;
            summary.files_hashed += outcome.files_hashed;
            summary.bytes_hashed += outcome.bytes_hashed;
            summary.errors += outcome.errors;
            summary.skipped_mismatch += outcome.changed;
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_end(PHASE_HASHING);
        }
        Ok(map)
    }

    /// Resolve all paths of one inode. The first path that resolves
    /// provides the identity for the rest, as long as their snapshots
    /// still agree with it.
    fn hash_batch(&self, batch: Vec<FileRecord>, done: &AtomicUsize) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut known: Option<Metadata> = None;

        for record in batch {
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(cb) = &self.progress {
                cb.on_progress(n, record.path.to_string_lossy().as_ref());
            }

            let item = match Item::open(&record.path) {
                Ok(item) => item,
                Err(err) => {
                    log::error!("{}: failed to open: {err}", record.path.display());
                    outcome.errors += 1;
                    continue;
                }
            };
            if item.kind != FileKind::Regular || item.dev != record.dev || item.ino != record.ino
            {
                log::warn!("{}: changed since it was scanned, skipping", item.path.display());
                outcome.changed += 1;
                continue;
            }

            let sha256 = match &known {
                Some(meta) if meta.check(item.size_i64(), item.time) => {
                    outcome.cache_hits += 1;
                    meta.sha256
                }
                _ => match resolve_metadata(&item, &self.config) {
                    Some(resolution) => {
                        if resolution.hashed {
                            outcome.files_hashed += 1;
                            outcome.bytes_hashed += item.size;
                            if let Some(cb) = &self.progress {
                                cb.on_item_completed(item.size);
                            }
                        } else {
                            outcome.cache_hits += 1;
                        }
                        let sha256 = resolution.meta.sha256;
                        known = Some(resolution.meta);
                        sha256
                    }
                    None => {
                        outcome.errors += 1;
                        continue;
                    }
                },
            };

            let key = DedupKey::for_mode(self.config.mode, sha256, item.dev, item.ino);
            outcome.map.insert(key, record.path);
        }

        outcome
    }
}

/// Group records by `(dev, ino)` so each inode is handled by one worker.
fn partition_by_inode(records: Vec<FileRecord>) -> Vec<Vec<FileRecord>> {
    let mut batches: BTreeMap<(u64, u64), Vec<FileRecord>> = BTreeMap::new();
    for record in records {
        batches
            .entry((record.dev, record.ino))
            .or_default()
            .push(record);
    }
    batches.into_values().collect()
}
