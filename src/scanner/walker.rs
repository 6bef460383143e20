//! Stack-based directory walker.
//!
//! # Overview
//!
//! [`Walker`] visits a root set without recursion: directories wait on an
//! explicit `Vec<Item>` stack and each one is closed as soon as its entries
//! have been read. Every child is opened by path to take a fresh snapshot,
//! which is then checked against the directory entry's type hint and the
//! parent's device.
//!
//! # Rules
//!
//! - Symlinks are followed only when they point at a regular file.
//! - Children on another device are skipped unless cross-device traversal
//!   is enabled.
//! - A child whose `fstat` type disagrees with its directory entry is
//!   skipped and logged.
//! - Files below `min_size` are skipped.
//! - Files and directories excluded by the rules are skipped; an excluded
//!   directory prunes its whole subtree.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::{ScanConfig, ScanSummary, Walker};
//! use std::path::PathBuf;
//!
//! let config = ScanConfig::default();
//! let mut summary = ScanSummary::default();
//! let records = Walker::new(&config).walk(&[PathBuf::from("/srv/photos")], &mut summary);
//! println!("{} files admitted", records.len());
//! ```

use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::item::{FileKind, Item};
use super::{FileRecord, ScanConfig, ScanSummary, SkipReason};
use crate::progress::ProgressCallback;

/// Phase name reported to progress callbacks.
pub const PHASE_WALKING: &str = "walking";

/// Directory walker producing admitted [`FileRecord`]s.
pub struct Walker<'a> {
    config: &'a ScanConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("config", &self.config)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(config: &'a ScanConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Report each admitted file to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Walk every root and return the admitted files in discovery order.
    ///
    /// Roots that cannot be opened, unreadable directories and files that
    /// fail to open are logged and counted in `summary.errors`; the walk
    /// always continues.
    pub fn walk(&self, roots: &[PathBuf], summary: &mut ScanSummary) -> Vec<FileRecord> {
        if let Some(cb) = &self.progress {
            cb.on_phase_start(PHASE_WALKING, 0);
        }

        let mut records = Vec::new();
        let mut stack: Vec<Item> = Vec::with_capacity(256);

        for root in roots {
            summary.roots += 1;
            match open_root(root) {
                Ok(item) => match item.kind {
                    FileKind::Directory => stack.push(item),
                    FileKind::Regular => self.admit(item, summary, &mut records),
                    _ => {
                        log::warn!("{}: not a regular file or directory", root.display());
                        summary.skip(SkipReason::Unsupported);
                    }
                },
                Err(err) => {
                    log::error!("{}: failed to open: {err}", root.display());
                    summary.errors += 1;
                }
            }

            while let Some(dir) = stack.pop() {
                self.scan_dir(dir, &mut stack, summary, &mut records);
            }
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_end(PHASE_WALKING);
        }
        records
    }

    /// Read one directory, pushing subdirectories and admitting files.
    /// `dir` is dropped (closed) on return.
    fn scan_dir(
        &self,
        dir: Item,
        stack: &mut Vec<Item>,
        summary: &mut ScanSummary,
        records: &mut Vec<FileRecord>,
    ) {
        summary.directories += 1;

        let entries = match read_entries(&dir, summary) {
            Ok(entries) => entries,
            Err(err) => {
                log::error!("{}: failed to read directory: {err}", dir.path.display());
                summary.errors += 1;
                return;
            }
        };

        for (path, hint) in entries {
            summary.entries += 1;

            let (hint, via_symlink) = match hint {
                FileKind::Regular | FileKind::Directory => (hint, false),
                FileKind::Symlink => match fs::metadata(&path) {
                    Ok(meta) if meta.is_file() => (FileKind::Regular, true),
                    Ok(_) => {
                        log::trace!("{}: symlink not followed", path.display());
                        summary.skip(SkipReason::Unsupported);
                        continue;
                    }
                    Err(err) => {
                        log::debug!("{}: dangling symlink: {err}", path.display());
                        summary.skip(SkipReason::Unsupported);
                        continue;
                    }
                },
                FileKind::Other => {
                    log::trace!("{}: skipping special file", path.display());
                    summary.skip(SkipReason::Unsupported);
                    continue;
                }
            };

            let mut child = match Item::open(&path) {
                Ok(child) => child,
                Err(err) => {
                    log::error!("{}: failed to open: {err}", path.display());
                    summary.errors += 1;
                    continue;
                }
            };
            child.is_symlink = via_symlink;

            if child.dev != dir.dev {
                if !self.config.cross_device {
                    log::debug!("{}: on another device, skipping", child.path.display());
                    summary.skip(SkipReason::CrossDevice);
                    continue;
                }
                if child.kind != hint {
                    log::warn!(
                        "{}: file type mismatch: directory said {hint:?}, stat said {:?}",
                        child.path.display(),
                        child.kind
                    );
                    summary.skip(SkipReason::Mismatch);
                    continue;
                }
            } else if child.kind != hint {
                log::error!(
                    "{}: file type mismatch: directory said {hint:?}, stat said {:?}",
                    child.path.display(),
                    child.kind
                );
                summary.skip(SkipReason::Mismatch);
                continue;
            }

            if child.kind == FileKind::Directory {
                if self.config.rules.is_excluded(&child, &self.config.names) {
                    log::debug!("{}: directory excluded", child.path.display());
                    summary.skip(SkipReason::Excluded);
                    continue;
                }
                stack.push(child);
            } else {
                self.admit(child, summary, records);
            }
        }
    }

    /// Apply the size and rule checks to a regular file.
    fn admit(&self, item: Item, summary: &mut ScanSummary, records: &mut Vec<FileRecord>) {
        if item.size < self.config.min_size {
            log::trace!("{}: below minimum size", item.path.display());
            summary.skip(SkipReason::Small);
            return;
        }
        if self.config.rules.is_excluded(&item, &self.config.names) {
            log::debug!("{}: excluded", item.path.display());
            summary.skip(SkipReason::Excluded);
            return;
        }

        summary.admitted += 1;
        if let Some(cb) = &self.progress {
            cb.on_progress(summary.admitted, item.path.to_string_lossy().as_ref());
        }
        records.push(FileRecord::from(&item));
    }
}

/// Open a root, marking it when the given path is itself a symlink.
fn open_root(root: &Path) -> io::Result<Item> {
    let mut item = Item::open(root)?;
    item.is_symlink = fs::symlink_metadata(root)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    Ok(item)
}

/// Read all entries of a directory up front, with their type hints.
///
/// The listing goes through the directory's own open handle, so a rename
/// of the directory after it was opened does not change what is read.
/// An entry that cannot be read is logged, counted and skipped.
fn read_entries(dir: &Item, summary: &mut ScanSummary) -> io::Result<Vec<(PathBuf, FileKind)>> {
    let listing = match dir.file().map(|file| fs::read_dir(handle_path(file))) {
        Some(Ok(listing)) => listing,
        // No /dev/fd on this system.
        Some(Err(err)) if err.kind() == io::ErrorKind::NotFound => fs::read_dir(&dir.path)?,
        Some(Err(err)) => return Err(err),
        None => fs::read_dir(&dir.path)?,
    };

    let mut entries = Vec::new();
    for entry in listing {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::error!("{}: failed to read entry: {err}", dir.path.display());
                summary.errors += 1;
                continue;
            }
        };
        let path = dir.path.join(entry.file_name());
        match entry.file_type() {
            Ok(kind) => entries.push((path, kind.into())),
            Err(err) => {
                log::error!("{}: failed to read entry type: {err}", path.display());
                summary.errors += 1;
            }
        }
    }
    Ok(entries)
}

/// Path naming an already-open descriptor.
fn handle_path(file: &fs::File) -> PathBuf {
    PathBuf::from(format!("/dev/fd/{}", file.as_raw_fd()))
}
