//! Lexical path cleaning and Unicode normalization.
//!
//! Glob patterns are compiled in NFD (decomposed) form, so every path that
//! is matched against a pattern has to go through [`normalize`] first. The
//! same visual filename can otherwise have two byte representations:
//!
//! - NFC: `café.txt` - 'é' is U+00E9 (single code point)
//! - NFD: `café.txt` - 'e' U+0065 + combining acute accent U+0301
//!
//! # Example
//!
//! ```
//! use dedupe::scanner::path_utils::normalize;
//! use std::path::Path;
//!
//! let composed = normalize(Path::new("photos/./café.jpg"));
//! let decomposed = normalize(Path::new("photos//cafe\u{0301}.jpg"));
//! assert_eq!(composed, decomposed);
//! ```

use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Lexically clean a path.
///
/// Repeated separators and `.` elements are removed, `..` elements cancel
/// the preceding regular element, and `..` directly under the root is
/// dropped. An empty result becomes `.`. The filesystem is never touched,
/// so symlinks are not resolved.
///
/// # Example
///
/// ```
/// use dedupe::scanner::path_utils::clean_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(clean_path(Path::new("a//b/./c/../d")), PathBuf::from("a/b/d"));
/// assert_eq!(clean_path(Path::new("/../x")), PathBuf::from("/x"));
/// assert_eq!(clean_path(Path::new("")), PathBuf::from("."));
/// ```
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut rooted = false;
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                rooted = true;
                parts.clear();
            }
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }

    let mut cleaned = PathBuf::new();
    if rooted {
        cleaned.push(Component::RootDir.as_os_str());
    }
    for part in parts {
        cleaned.push(part.as_os_str());
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// Produce the canonical string form used for pattern matching.
///
/// The path is cleaned, rendered with `/` separators, and converted to
/// NFD. Non-UTF-8 bytes are replaced with U+FFFD.
#[must_use]
pub fn normalize(path: &Path) -> String {
    let cleaned = clean_path(path);
    let slashed = cleaned
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/");
    normalize_str(&slashed)
}

/// Convert a string to NFD form.
#[must_use]
pub fn normalize_str(s: &str) -> String {
    s.nfd().collect()
}

/// Compute `target` relative to the directory `base`.
///
/// Both paths are made absolute against the working directory and cleaned
/// first, so relative inputs (including ones starting with `..`) resolve
/// correctly. If the working directory cannot be read, `target` is returned
/// cleaned.
///
/// # Example
///
/// ```
/// use dedupe::scanner::path_utils::relative_to;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     relative_to(Path::new("/data/b/c"), Path::new("/data/a/file")),
///     PathBuf::from("../../a/file")
/// );
/// ```
#[must_use]
pub fn relative_to(base: &Path, target: &Path) -> PathBuf {
    let (Ok(base), Ok(target)) = (std::path::absolute(base), std::path::absolute(target)) else {
        return clean_path(target);
    };
    let base = clean_path(&base);
    let target = clean_path(&target);

    let base_parts: Vec<Component<'_>> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let target_parts: Vec<Component<'_>> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}
