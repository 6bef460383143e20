//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Resolving each admitted file's content identity through the xattr cache
//! - Keying paths by digest (and optionally inode)
//! - Reducing keys to sorted duplicate groups

pub mod finder;
pub mod groups;

pub use finder::{resolve_metadata, DuplicateFinder, Resolution, PHASE_HASHING};
pub use groups::{DedupKey, DuplicateGroup, GroupMap};
