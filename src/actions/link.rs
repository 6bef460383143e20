//! Atomic link replacement.
//!
//! # Overview
//!
//! A destination is never removed before its replacement exists. The new
//! link is created inside a fresh `.incoming.*` directory next to the
//! destination and then renamed over it, so a crash leaves either the old
//! file or the new link in place, plus at worst a stray temp directory.
//!
//! `rename(2)` does nothing when source and destination already name the
//! same inode. That case is detected by the temp entry still being present
//! afterwards; only then is the destination removed and the rename
//! repeated.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::actions::link::{try_link, try_symlink};
//! use std::path::Path;
//!
//! let src = Path::new("/data/keep/a.bin");
//! let dst = Path::new("/data/copy/a.bin");
//! if let Err(err) = try_link(src, dst) {
//!     if err.is_cross_device() {
//!         try_symlink(src, dst, false).unwrap();
//!     }
//! }
//! ```

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use thiserror::Error;

use crate::scanner::path_utils::{clean_path, relative_to};

/// Prefix of the temporary directories created next to destinations.
pub const TEMP_DIR_PREFIX: &str = ".incoming.";

/// Error type for a single link replacement.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Destination has no final component.
    #[error("{0} has no file name")]
    NoFileName(PathBuf),

    /// The source could not be made absolute.
    #[error("failed to make {path} absolute: {source}")]
    Absolute {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The sibling temp directory could not be created.
    #[error("failed to create temporary directory in {dir}: {source}")]
    TempDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Creating the link inside the temp directory failed.
    #[error("failed to create link {path} -> {target}: {source}")]
    Create {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving the link over the destination failed.
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// True when the link could not be created because source and
    /// destination are on different filesystems.
    #[must_use]
    pub fn is_cross_device(&self) -> bool {
        matches!(self, Self::Create { source, .. } if source.raw_os_error() == Some(libc::EXDEV))
    }
}

/// Replace `dst` with a hardlink to `src`.
///
/// # Errors
///
/// Returns [`LinkError`]; check [`LinkError::is_cross_device`] to decide
/// whether a symlink is worth trying.
pub fn try_link(src: &Path, dst: &Path) -> Result<(), LinkError> {
    replace_via_temp(dst, src, |temp| fs::hard_link(src, temp))
}

/// Replace `dst` with a symlink to `src`.
///
/// The link target is `src` made absolute, or relative to `dst`'s
/// directory when `relative` is set.
///
/// # Errors
///
/// Returns [`LinkError`] if any step fails.
pub fn try_symlink(src: &Path, dst: &Path, relative: bool) -> Result<(), LinkError> {
    let target = symlink_target(src, dst, relative)?;
    replace_via_temp(dst, &target, |temp| symlink(&target, temp))
}

/// Compute what a symlink at `dst` should contain to reach `src`.
///
/// # Errors
///
/// Returns [`LinkError::Absolute`] if the working directory is unavailable.
pub fn symlink_target(src: &Path, dst: &Path, relative: bool) -> Result<PathBuf, LinkError> {
    let src_abs = absolute(src)?;
    if !relative {
        return Ok(src_abs);
    }
    let dst_dir = absolute(parent_dir(dst))?;
    Ok(relative_to(&dst_dir, &src_abs))
}

fn absolute(path: &Path) -> Result<PathBuf, LinkError> {
    std::path::absolute(path)
        .map(|p| clean_path(&p))
        .map_err(|source| LinkError::Absolute {
            path: path.to_path_buf(),
            source,
        })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Create an entry with `create` inside a sibling temp directory and
/// rename it over `dst`. The temp directory is removed on every path.
fn replace_via_temp<F>(dst: &Path, target: &Path, create: F) -> Result<(), LinkError>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let name = dst
        .file_name()
        .ok_or_else(|| LinkError::NoFileName(dst.to_path_buf()))?;
    let dir = parent_dir(dst);

    let temp_dir = Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir_in(dir)
        .map_err(|source| LinkError::TempDir {
            dir: dir.to_path_buf(),
            source,
        })?;
    let temp_path = temp_dir.path().join(name);

    let result = create(&temp_path)
        .map_err(|source| LinkError::Create {
            path: temp_path.clone(),
            target: target.to_path_buf(),
            source,
        })
        .and_then(|()| rename_over(&temp_path, dst));

    remove_temp_dir(temp_dir);
    result
}

fn rename_over(temp_path: &Path, dst: &Path) -> Result<(), LinkError> {
    let rename = |from: &Path| {
        fs::rename(from, dst).map_err(|source| LinkError::Rename {
            from: from.to_path_buf(),
            to: dst.to_path_buf(),
            source,
        })
    };

    rename(temp_path)?;
    if fs::symlink_metadata(temp_path).is_ok() {
        // Both names were the same inode, so rename(2) did nothing.
        log::debug!(
            "{}: rename was a no-op, removing destination first",
            dst.display()
        );
        if let Err(err) = fs::remove_file(dst) {
            log::warn!("{}: failed to remove: {err}", dst.display());
        }
        rename(temp_path)?;
    }
    Ok(())
}

fn remove_temp_dir(temp_dir: TempDir) {
    let path = temp_dir.path().to_path_buf();
    if let Err(err) = temp_dir.close() {
        log::error!(
            "{}: failed to delete temporary directory: {err}",
            path.display()
        );
    }
}
