//! JSON duplicate report.
//!
//! The report is an array of groups, each group an array of path strings,
//! pretty-printed with two-space indentation. The same document is the
//! input of the `clean` command.
//!
//! JSON strings are UTF-8, so a path that is not valid UTF-8 is written with
//! U+FFFD in place of the bad bytes and a warning is logged. `clean` cannot
//! reopen such a path; it is dropped from its group when the report is
//! replayed.
//!
//! # Output Schema
//!
//! ```json
//! [
//!   [
//!     "/data/a.jpg",
//!     "/data/copy/a.jpg"
//!   ]
//! ]
//! ```
//!
//! # Example
//!
//! ```
//! use dedupe::duplicates::DuplicateGroup;
//! use dedupe::output::json::{read_groups, JsonOutput};
//! use std::path::PathBuf;
//!
//! let groups = vec![DuplicateGroup {
//!     sha256: [0u8; 32],
//!     paths: vec![PathBuf::from("/a"), PathBuf::from("/b")],
//! }];
//! let json = JsonOutput::new(&groups).to_json_pretty().unwrap();
//! let parsed = read_groups(json.as_bytes()).unwrap();
//! assert_eq!(parsed, vec![vec![PathBuf::from("/a"), PathBuf::from("/b")]]);
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::duplicates::DuplicateGroup;

/// Serializable form of a scan result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonOutput {
    pub groups: Vec<Vec<String>>,
}

impl JsonOutput {
    /// Build the report. Paths that are not valid UTF-8 are converted
    /// lossily and logged.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|group| group.paths.iter().map(|p| path_string(p)).collect())
                .collect(),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        let json = self.to_json_pretty()?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    match path.to_str() {
        Some(s) => s.to_string(),
        None => {
            log::warn!(
                "{}: path is not valid UTF-8 and cannot be cleaned from this report",
                path.display()
            );
            path.to_string_lossy().into_owned()
        }
    }
}

/// Parse a report back into path groups.
///
/// # Errors
///
/// Returns an error if reading fails or the document is not an array of
/// string arrays.
pub fn read_groups<R: Read>(mut reader: R) -> Result<Vec<Vec<PathBuf>>, JsonOutputError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let output: JsonOutput = serde_json::from_str(&raw)?;
    Ok(output
        .groups
        .into_iter()
        .map(|group| group.into_iter().map(PathBuf::from).collect())
        .collect())
}

/// Errors that can occur while writing or reading a report.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
