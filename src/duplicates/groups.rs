//! Content identity keys and duplicate grouping.
//!
//! # Overview
//!
//! Every hashed path is filed under a [`DedupKey`]. Keys live in a
//! `BTreeMap`, so the final groups come out in key order no matter how the
//! hashing workers interleaved.
//!
//! In [`GroupingMode::Inodes`] the key also carries `(dev, ino)`. Each
//! inode's paths are collapsed to the smallest one and those
//! representatives are then regrouped by digest alone, so files that are
//! already hardlinked together are not reported again.
//!
//! # Example
//!
//! ```
//! use dedupe::duplicates::{DedupKey, GroupMap};
//! use dedupe::scanner::GroupingMode;
//! use std::path::PathBuf;
//!
//! let digest = [7u8; 32];
//! let mut map = GroupMap::default();
//! map.insert(DedupKey::identity(digest, 1, 10), PathBuf::from("/b"));
//! map.insert(DedupKey::identity(digest, 1, 10), PathBuf::from("/a"));
//! map.insert(DedupKey::identity(digest, 1, 11), PathBuf::from("/c"));
//!
//! let groups = map.into_groups(GroupingMode::Inodes);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].paths, vec![PathBuf::from("/a"), PathBuf::from("/c")]);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::metadata::Sha256Sum;
use crate::scanner::GroupingMode;

/// Key a path is grouped under.
///
/// Ordering is by digest bytes, then device, then inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DedupKey {
    /// Content only
    Content { sha256: Sha256Sum },
    /// Content plus physical identity
    Identity { sha256: Sha256Sum, dev: u64, ino: u64 },
}

impl DedupKey {
    #[must_use]
    pub fn content(sha256: Sha256Sum) -> Self {
        Self::Content { sha256 }
    }

    #[must_use]
    pub fn identity(sha256: Sha256Sum, dev: u64, ino: u64) -> Self {
        Self::Identity { sha256, dev, ino }
    }

    /// Key for `mode`.
    #[must_use]
    pub fn for_mode(mode: GroupingMode, sha256: Sha256Sum, dev: u64, ino: u64) -> Self {
        match mode {
            GroupingMode::Inodes => Self::identity(sha256, dev, ino),
            GroupingMode::Paths => Self::content(sha256),
        }
    }

    #[must_use]
    pub fn sha256(&self) -> &Sha256Sum {
        match self {
            Self::Content { sha256 } | Self::Identity { sha256, .. } => sha256,
        }
    }
}

/// A set of paths with identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub sha256: Sha256Sum,
    /// Sorted, at least two entries
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Digest as lowercase hex.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.sha256)
    }
}

/// Accumulates paths per key.
#[derive(Debug, Clone, Default)]
pub struct GroupMap {
    entries: BTreeMap<DedupKey, Vec<PathBuf>>,
}

impl GroupMap {
    pub fn insert(&mut self, key: DedupKey, path: PathBuf) {
        self.entries.entry(key).or_default().push(path);
    }

    /// Move every entry of `other` into `self`.
    pub fn merge(&mut self, other: GroupMap) {
        for (key, paths) in other.entries {
            self.entries.entry(key).or_default().extend(paths);
        }
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reduce to duplicate groups in digest order.
    ///
    /// In [`GroupingMode::Inodes`] each `(dev, ino)` contributes only its
    /// smallest path. Groups with fewer than two paths are dropped.
    #[must_use]
    pub fn into_groups(self, mode: GroupingMode) -> Vec<DuplicateGroup> {
        let mut by_content: BTreeMap<Sha256Sum, Vec<PathBuf>> = BTreeMap::new();

        for (key, mut paths) in self.entries {
            paths.sort();
            paths.dedup();
            let slot = by_content.entry(*key.sha256()).or_default();
            match mode {
                GroupingMode::Inodes => {
                    if let Some(first) = paths.into_iter().next() {
                        slot.push(first);
                    }
                }
                GroupingMode::Paths => slot.extend(paths),
            }
        }

        by_content
            .into_iter()
            .filter_map(|(sha256, mut paths)| {
                paths.sort();
                paths.dedup();
                (paths.len() > 1).then_some(DuplicateGroup { sha256, paths })
            })
            .collect()
    }
}
