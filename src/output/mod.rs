//! Output formatters for scan results.
//!
//! Only JSON is produced: the report doubles as the input of `clean`.

pub mod json;

pub use json::{read_groups, JsonOutput, JsonOutputError};
