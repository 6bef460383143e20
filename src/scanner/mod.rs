//! Directory traversal and file admission.
//!
//! This module provides functionality for:
//! - Opening entries with a stat snapshot ([`item`])
//! - Walking a root set with an explicit stack ([`walker`])
//! - Lexical path cleaning and NFD normalization ([`path_utils`])
//!
//! The walk is single-threaded. It yields a [`FileRecord`] for every
//! regular file that passes the size, device and rule checks; hashing and
//! grouping happen afterwards in [`crate::duplicates`].
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::{ScanConfig, ScanSummary, Walker};
//! use std::path::PathBuf;
//!
//! let config = ScanConfig::default().with_min_size(1024);
//! let mut summary = ScanSummary::default();
//! let records = Walker::new(&config).walk(&[PathBuf::from(".")], &mut summary);
//! for record in &records {
//!     println!("{}: {} bytes", record.path.display(), record.size);
//! }
//! ```

pub mod item;
pub mod path_utils;
pub mod walker;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use bytesize::ByteSize;

use crate::metadata::AttrNames;
use crate::rules::RuleSet;

pub use item::{FileKind, Item};
pub use walker::Walker;

/// How duplicate paths are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingMode {
    /// One representative path per inode; hardlinks already sharing an
    /// inode are not reported as duplicates.
    #[default]
    Inodes,
    /// Every path with the same content is reported.
    Paths,
}

/// Settings for a scan. Built once, shared by reference.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Cache attribute names
    pub names: AttrNames,
    /// Include/exclude rules applied to files and directories
    pub rules: RuleSet,
    /// Files smaller than this are skipped
    pub min_size: u64,
    /// Descend into directories on other filesystems
    pub cross_device: bool,
    /// Ignore cached identities and hash everything
    pub rescan: bool,
    /// Write cache attributes even when nothing changed
    pub rewrite: bool,
    pub mode: GroupingMode,
    /// Worker threads for hashing
    pub io_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            names: AttrNames::default(),
            rules: RuleSet::default(),
            min_size: 1,
            cross_device: false,
            rescan: false,
            rewrite: false,
            mode: GroupingMode::Inodes,
            io_threads: 4,
        }
    }
}

impl ScanConfig {
    #[must_use]
    pub fn with_names(mut self, names: AttrNames) -> Self {
        self.names = names;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    #[must_use]
    pub fn with_cross_device(mut self, enabled: bool) -> Self {
        self.cross_device = enabled;
        self
    }

    #[must_use]
    pub fn with_rescan(mut self, enabled: bool) -> Self {
        self.rescan = enabled;
        self
    }

    #[must_use]
    pub fn with_rewrite(mut self, enabled: bool) -> Self {
        self.rewrite = enabled;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: GroupingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the hashing worker count. Zero is treated as one.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }
}

/// A regular file admitted by the walk.
///
/// Holds the stat snapshot taken during the walk; the hashing phase
/// reopens the path and compares identities before trusting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub time: i64,
    pub dev: u64,
    pub ino: u64,
    pub nlink: u64,
    /// Found through a symlink
    pub is_symlink: bool,
}

impl From<&Item> for FileRecord {
    fn from(item: &Item) -> Self {
        Self {
            path: item.path.clone(),
            size: item.size,
            time: item.time,
            dev: item.dev,
            ino: item.ino,
            nlink: item.nlink,
            is_symlink: item.is_symlink,
        }
    }
}

/// Why an entry was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Below the minimum size
    Small,
    /// Excluded by a rule or the exclude attribute
    Excluded,
    /// On another filesystem
    CrossDevice,
    /// Directory entry type disagreed with `fstat`
    Mismatch,
    /// Not a regular file or directory
    Unsupported,
}

/// Counters collected over one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub roots: usize,
    pub directories: usize,
    /// Entries examined (files and directories)
    pub entries: usize,
    pub admitted: usize,
    pub skipped_small: usize,
    pub skipped_excluded: usize,
    pub skipped_cross_device: usize,
    pub skipped_mismatch: usize,
    pub skipped_unsupported: usize,
    /// Files whose cached identity was trusted
    pub cache_hits: usize,
    pub files_hashed: usize,
    pub bytes_hashed: u64,
    /// Non-fatal failures (unreadable roots, directories or files)
    pub errors: usize,
    pub duplicate_groups: usize,
    pub duplicate_paths: usize,
    pub duration: Duration,
}

impl ScanSummary {
    /// Count a skipped entry.
    pub fn skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Small => self.skipped_small += 1,
            SkipReason::Excluded => self.skipped_excluded += 1,
            SkipReason::CrossDevice => self.skipped_cross_device += 1,
            SkipReason::Mismatch => self.skipped_mismatch += 1,
            SkipReason::Unsupported => self.skipped_unsupported += 1,
        }
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped_small
            + self.skipped_excluded
            + self.skipped_cross_device
            + self.skipped_mismatch
            + self.skipped_unsupported
    }

    /// True when some entries could not be read.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.errors > 0
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} roots, {} directories, {} files admitted, {} skipped \
             (small {}, excluded {}, cross-device {}, mismatch {}), \
             {} cached, {} hashed ({}), {} errors, \
             {} duplicate groups ({} paths) in {:.2?}",
            self.roots,
            self.directories,
            self.admitted,
            self.skipped(),
            self.skipped_small,
            self.skipped_excluded,
            self.skipped_cross_device,
            self.skipped_mismatch,
            self.cache_hits,
            self.files_hashed,
            ByteSize::b(self.bytes_hashed),
            self.errors,
            self.duplicate_groups,
            self.duplicate_paths,
            self.duration
        )
    }
}

/// Errors that can occur while starting a scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// No roots were given.
    #[error("No paths to scan")]
    NoRoots,

    /// The hashing thread pool could not be created.
    #[error("Failed to start hashing workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
