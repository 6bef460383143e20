//! Replacing duplicates with links.
//!
//! # Overview
//!
//! For each group of identical files a survivor is chosen (see
//! [`survivor`](super::survivor)) and every other member is atomically
//! replaced with a hardlink to it. When a hardlink cannot be made, for
//! example because the member lives on another filesystem, a symlink is
//! used instead. If neither can be created the run stops: continuing could
//! leave the tree in a state the user did not ask for.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::actions::replace::{ReplaceConfig, Replacer};
//! use dedupe::rules::RuleSet;
//! use std::path::PathBuf;
//!
//! let config = ReplaceConfig::default()
//!     .with_rules(RuleSet::preferences(&["/data/originals/**"]).unwrap());
//! let groups = vec![vec![PathBuf::from("/data/originals/a"), PathBuf::from("/data/copy/a")]];
//! let report = Replacer::new(config).run(&groups).unwrap();
//! println!("{}", report.summary());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::link::{try_link, try_symlink};
use super::survivor::select_survivor;
use crate::rules::RuleSet;
use crate::scanner::{FileKind, Item};

/// Error type for replacement runs. Every variant stops the run.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// Neither a hardlink nor a symlink could replace `dst`.
    #[error("could not replace {dst} with a link to {src}")]
    Fatal { src: PathBuf, dst: PathBuf },
}

/// Settings for a replacement run.
#[derive(Debug, Clone, Default)]
pub struct ReplaceConfig {
    /// Preference rules; a lower index makes a better survivor
    pub rules: RuleSet,
    /// Write symlink targets relative to the link's directory
    pub relative_symlinks: bool,
    /// Log what would happen without touching the filesystem
    pub dry_run: bool,
}

impl ReplaceConfig {
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_relative_symlinks(mut self, enabled: bool) -> Self {
        self.relative_symlinks = enabled;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// How a destination was (or would be) replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAction {
    HardLink,
    Symlink,
    /// Dry run; nothing was changed
    Planned,
}

/// One replaced destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRecord {
    /// Survivor the destination now points at
    pub src: PathBuf,
    pub dst: PathBuf,
    pub action: ReplaceAction,
}

/// Outcome of a replacement run.
#[derive(Debug, Clone, Default)]
pub struct ReplaceReport {
    pub groups_processed: usize,
    /// Groups with fewer than two usable members or no non-symlink survivor
    pub groups_skipped: usize,
    /// Paths that could not be opened as regular files
    pub paths_dropped: usize,
    pub hard_links: usize,
    pub symlinks: usize,
    /// Members already sharing the survivor's inode
    pub already_linked: usize,
    pub records: Vec<ReplaceRecord>,
}

impl ReplaceReport {
    /// Get a summary message.
    #[must_use]
    pub fn summary(&self) -> String {
        let planned = self
            .records
            .iter()
            .filter(|r| r.action == ReplaceAction::Planned)
            .count();
        if planned > 0 {
            return format!(
                "Dry run: {} files would be replaced in {} groups ({} already linked)",
                planned, self.groups_processed, self.already_linked
            );
        }
        format!(
            "Replaced {} files with hardlinks and {} with symlinks in {} groups ({} already linked, {} groups skipped)",
            self.hard_links,
            self.symlinks,
            self.groups_processed,
            self.already_linked,
            self.groups_skipped
        )
    }
}

/// Runs survivor selection and link replacement over path groups.
#[derive(Debug, Clone)]
pub struct Replacer {
    config: ReplaceConfig,
}

impl Replacer {
    #[must_use]
    pub fn new(config: ReplaceConfig) -> Self {
        Self { config }
    }

    /// Process every group in order.
    ///
    /// # Errors
    ///
    /// Stops at the first [`ReplaceError`]; groups before it stay
    /// processed.
    pub fn run(&self, groups: &[Vec<PathBuf>]) -> Result<ReplaceReport, ReplaceError> {
        let mut report = ReplaceReport::default();
        for paths in groups {
            self.process_group(paths, &mut report)?;
        }
        log::info!("{}", report.summary());
        Ok(report)
    }

    /// Replace every member of one group with a link to its survivor.
    ///
    /// # Errors
    ///
    /// Returns [`ReplaceError::Fatal`] when a member cannot be
    /// replaced by either kind of link.
    pub fn process_group(
        &self,
        paths: &[PathBuf],
        report: &mut ReplaceReport,
    ) -> Result<(), ReplaceError> {
        if paths.len() < 2 {
            report.groups_skipped += 1;
            return Ok(());
        }

        let mut items: Vec<Item> = Vec::with_capacity(paths.len());
        for path in paths {
            match self.open_candidate(path) {
                Some(item) => items.push(item),
                None => report.paths_dropped += 1,
            }
        }
        if items.len() < 2 {
            log::debug!("Skipping group with {} usable paths", items.len());
            report.groups_skipped += 1;
            return Ok(());
        }

        let Some(best_index) = select_survivor(&mut items) else {
            log::warn!(
                "Skipping group: every path is a symlink ({})",
                items[0].path.display()
            );
            report.groups_skipped += 1;
            return Ok(());
        };
        report.groups_processed += 1;

        let best = &items[best_index];
        for (index, item) in items.iter().enumerate() {
            if index == best_index {
                continue;
            }
            if item.same_file(best) && !item.is_symlink {
                log::trace!("{}: already linked", item.path.display());
                report.already_linked += 1;
                continue;
            }

            let action = self.replace(&best.path, &item.path)?;
            match action {
                ReplaceAction::HardLink => report.hard_links += 1,
                ReplaceAction::Symlink => report.symlinks += 1,
                ReplaceAction::Planned => {}
            }
            report.records.push(ReplaceRecord {
                src: best.path.clone(),
                dst: item.path.clone(),
                action,
            });
        }
        Ok(())
    }

    fn replace(&self, src: &Path, dst: &Path) -> Result<ReplaceAction, ReplaceError> {
        if self.config.dry_run {
            log::info!("Would replace {} with a link to {}", dst.display(), src.display());
            return Ok(ReplaceAction::Planned);
        }

        log::debug!("Replacing {} with a link to {}", dst.display(), src.display());
        match try_link(src, dst) {
            Ok(()) => return Ok(ReplaceAction::HardLink),
            Err(err) if err.is_cross_device() => {
                log::debug!("{}: on another device, using a symlink", dst.display());
            }
            Err(err) => log::error!("{err}"),
        }

        match try_symlink(src, dst, self.config.relative_symlinks) {
            Ok(()) => Ok(ReplaceAction::Symlink),
            Err(err) => {
                log::error!("{err}");
                Err(ReplaceError::Fatal {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                })
            }
        }
    }

    /// Open a group member as a replacement candidate.
    fn open_candidate(&self, path: &Path) -> Option<Item> {
        let mut item = match Item::open(path) {
            Ok(item) => item,
            Err(err) => {
                log::warn!("{}: failed to open: {err}", path.display());
                return None;
            }
        };
        if item.kind != FileKind::Regular {
            log::warn!("{}: not a regular file", item.path.display());
            return None;
        }

        item.priority = self.config.rules.priority(&item.path);
        item.is_symlink = match fs::symlink_metadata(&item.path) {
            Ok(meta) => meta.file_type().is_symlink(),
            Err(err) => {
                log::warn!("{}: lstat failed: {err}", item.path.display());
                true
            }
        };
        Some(item)
    }
}
