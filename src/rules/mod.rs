//! Ordered include/exclude/priority rules.
//!
//! A [`RuleSet`] is an ordered list of compiled globs. The first rule whose
//! pattern matches a path decides: during a scan its [`Disposition`] says
//! whether the path is skipped, and during replacement its index is the
//! path's priority (lower wins).
//!
//! # Example
//!
//! ```
//! use dedupe::rules::{Disposition, RuleSet, RuleSpec};
//! use std::path::Path;
//!
//! let rules = RuleSet::compile(&[
//!     RuleSpec::include("/keep/**"),
//!     RuleSpec::exclude("**/*.tmp"),
//! ])
//! .unwrap();
//!
//! assert_eq!(rules.disposition(Path::new("/keep/a.tmp")), Some(Disposition::Include));
//! assert_eq!(rules.disposition(Path::new("/other/a.tmp")), Some(Disposition::Exclude));
//! assert_eq!(rules.priority(Path::new("/other/a.txt")), 2);
//! ```

pub mod glob;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::metadata::attr::maybe_get;
use crate::metadata::AttrNames;
use crate::scanner::item::Item;
use crate::scanner::path_utils::normalize;

pub use glob::{GlobError, Pattern};

/// What a matching rule does to a path during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Exclude,
    Include,
}

/// An uncompiled rule as it comes from the command line or config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub disposition: Disposition,
    pub pattern: String,
}

impl RuleSpec {
    #[must_use]
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self {
            disposition: Disposition::Exclude,
            pattern: pattern.into(),
        }
    }

    #[must_use]
    pub fn include(pattern: impl Into<String>) -> Self {
        Self {
            disposition: Disposition::Include,
            pattern: pattern.into(),
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Pattern,
    pub disposition: Disposition,
}

impl Rule {
    /// Test a normalized path.
    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

/// Ordered rule list. First match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile every [`RuleSpec`], keeping order.
    ///
    /// # Errors
    ///
    /// Returns the first [`GlobError`]; nothing is partially built.
    pub fn compile(specs: &[RuleSpec]) -> Result<Self, GlobError> {
        let rules = specs
            .iter()
            .map(|spec| {
                Ok(Rule {
                    pattern: Pattern::compile(&spec.pattern)?,
                    disposition: spec.disposition,
                })
            })
            .collect::<Result<Vec<_>, GlobError>>()?;
        Ok(Self { rules })
    }

    /// Compile plain globs as preference rules, earliest first.
    ///
    /// # Errors
    ///
    /// Returns the first [`GlobError`].
    pub fn preferences<S: AsRef<str>>(globs: &[S]) -> Result<Self, GlobError> {
        let specs: Vec<RuleSpec> = globs
            .iter()
            .map(|g| RuleSpec::include(g.as_ref()))
            .collect();
        Self::compile(&specs)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    fn first_match(&self, path: &Path) -> Option<(usize, &Rule)> {
        let normalized = normalize(path);
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(&normalized))
    }

    /// Index of the first matching rule, or [`len`](Self::len) when none
    /// match.
    #[must_use]
    pub fn priority(&self, path: &Path) -> usize {
        self.first_match(path).map_or(self.len(), |(index, _)| index)
    }

    /// Disposition of the first matching rule.
    #[must_use]
    pub fn disposition(&self, path: &Path) -> Option<Disposition> {
        self.first_match(path).map(|(_, rule)| rule.disposition)
    }

    /// Decide whether a scan should skip `item`.
    ///
    /// The item's own `<ns>exclude` attribute wins over the rule list:
    /// empty or one of `1`, `y`, `yes`, `t`, `true` excludes it, any other
    /// value admits it. Without the attribute the first matching rule
    /// decides, and no match means the item is kept.
    #[must_use]
    pub fn is_excluded(&self, item: &Item, names: &AttrNames) -> bool {
        if let Some(file) = item.file() {
            if let Some(raw) = maybe_get(file, &item.path, &names.exclude) {
                let excluded = exclude_value(&raw);
                log::debug!(
                    "{}: {} says {}",
                    item.path.display(),
                    names.exclude,
                    if excluded { "exclude" } else { "include" }
                );
                return excluded;
            }
        }
        self.disposition(&item.path) == Some(Disposition::Exclude)
    }
}

/// Interpretation of an `<ns>exclude` attribute value.
#[must_use]
pub fn exclude_value(raw: &[u8]) -> bool {
    matches!(raw, b"" | b"1" | b"y" | b"yes" | b"t" | b"true")
}
