//! File actions module.
//!
//! This module provides functionality for:
//! - Ranking a duplicate group and choosing its survivor
//! - Atomic hardlink/symlink replacement through a sibling temp directory
//! - Running replacement over the groups of a JSON report
//!
//! ```no_run
//! use dedupe::actions::{ReplaceConfig, Replacer};
//! use std::path::PathBuf;
//!
//! let groups = vec![vec![PathBuf::from("/a"), PathBuf::from("/b")]];
//! let report = Replacer::new(ReplaceConfig::default().with_dry_run(true))
//!     .run(&groups)
//!     .unwrap();
//! println!("{}", report.summary());
//! ```

pub mod link;
pub mod replace;
pub mod survivor;

pub use link::{try_link, try_symlink, LinkError};
pub use replace::{ReplaceAction, ReplaceConfig, ReplaceError, ReplaceRecord, ReplaceReport, Replacer};
pub use survivor::{compare_items, select_survivor};
