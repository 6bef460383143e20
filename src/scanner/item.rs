//! Open filesystem entries with a stat snapshot.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use super::path_utils::clean_path;

/// File type as reported by `fstat` (or a directory entry hint).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl From<fs::FileType> for FileKind {
    fn from(ft: fs::FileType) -> Self {
        if ft.is_file() {
            Self::Regular
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// An entry under examination.
///
/// The size, time and identity fields are a snapshot taken when the entry
/// was opened and are never refreshed. The handle belongs to the item; it
/// is released by [`Item::close`] or when the item is dropped.
#[derive(Debug)]
pub struct Item {
    /// Cleaned path the entry was opened by
    pub path: PathBuf,
    file: Option<File>,
    pub kind: FileKind,
    pub size: u64,
    /// Modification time in whole seconds
    pub time: i64,
    pub dev: u64,
    pub ino: u64,
    pub nlink: u64,
    /// Rank assigned by the preference rules, lower is better
    pub priority: usize,
    /// The path itself is a symlink to the opened file
    pub is_symlink: bool,
}

impl Item {
    /// Open `path` (following symlinks) and snapshot its metadata.
    ///
    /// # Errors
    ///
    /// Returns the error from `open(2)` or `fstat(2)`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let path = clean_path(path);
        // A FIFO must not block the walk.
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)?;
        let meta = file.metadata()?;

        Ok(Self {
            path,
            kind: meta.file_type().into(),
            size: meta.len(),
            time: meta.mtime(),
            dev: meta.dev(),
            ino: meta.ino(),
            nlink: meta.nlink(),
            priority: 0,
            is_symlink: false,
            file: Some(file),
        })
    }

    /// The open handle, or `None` once closed.
    #[must_use]
    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// Release the handle. Calling this more than once is harmless.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            log::trace!("closed {}", self.path.display());
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// True when both items name the same inode.
    #[must_use]
    pub fn same_file(&self, other: &Self) -> bool {
        self.dev == other.dev && self.ino == other.ino
    }

    /// Size as the signed value stored in the cache.
    #[must_use]
    pub fn size_i64(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }
}
