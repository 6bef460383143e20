//! Extended attribute names used by the cache.

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "user.dedupe.";

/// Attribute names derived from a namespace prefix.
///
/// # Example
///
/// ```
/// use dedupe::metadata::AttrNames;
///
/// let names = AttrNames::with_namespace("user.test.");
/// assert_eq!(names.stamp, "user.test.stamp");
/// assert_eq!(names.sha256, "user.test.sha256sum");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrNames {
    /// Combined `key:value,...` stamp
    pub stamp: String,
    pub size: String,
    pub time: String,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    /// Per-file exclusion override
    pub exclude: String,
}

impl AttrNames {
    /// Derive every name from `namespace`. The prefix is used verbatim, so
    /// it normally ends with a `.`.
    #[must_use]
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            stamp: format!("{namespace}stamp"),
            size: format!("{namespace}size"),
            time: format!("{namespace}mtime"),
            md5: format!("{namespace}md5sum"),
            sha1: format!("{namespace}sha1sum"),
            sha256: format!("{namespace}sha256sum"),
            exclude: format!("{namespace}exclude"),
        }
    }
}

impl Default for AttrNames {
    fn default() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }
}
