//! Logged, non-failing extended attribute access.
//!
//! Cache attributes are advisory, so none of these helpers return errors:
//! a missing attribute is silent, an unsupported filesystem is logged at
//! debug, anything else at error.

use std::fs::File;
use std::io;
use std::path::Path;

use ::xattr::FileExt;

fn is_unsupported(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::ENOTSUP || code == libc::EOPNOTSUPP)
        || err.kind() == io::ErrorKind::Unsupported
}

fn log_failure(op: &str, path: &Path, name: &str, err: &io::Error) {
    if is_unsupported(err) {
        log::debug!("{op}({}, {name}): {err}", path.display());
    } else {
        log::error!("{op}({}, {name}) failed: {err}", path.display());
    }
}

/// Read an attribute, returning `None` when absent or unreadable.
pub fn maybe_get(file: &File, path: &Path, name: &str) -> Option<Vec<u8>> {
    match file.get_xattr(name) {
        Ok(Some(value)) => {
            log::trace!(
                "fgetxattr({}, {name}) = {:?}",
                path.display(),
                String::from_utf8_lossy(&value)
            );
            Some(value)
        }
        Ok(None) => None,
        Err(err) => {
            log_failure("fgetxattr", path, name, &err);
            None
        }
    }
}

/// Write an attribute unless it already holds `value`.
///
/// The existing value is read first. If that read fails for any reason
/// other than the attribute being absent, the write is skipped.
pub fn maybe_set(file: &File, path: &Path, name: &str, value: &[u8]) {
    match file.get_xattr(name) {
        Ok(Some(existing)) if existing == value => return,
        Ok(_) => {}
        Err(err) => {
            log_failure("fgetxattr", path, name, &err);
            return;
        }
    }

    match file.set_xattr(name, value) {
        Ok(()) => log::debug!(
            "fsetxattr({}, {name}, {:?})",
            path.display(),
            String::from_utf8_lossy(value)
        ),
        Err(err) => log_failure("fsetxattr", path, name, &err),
    }
}
