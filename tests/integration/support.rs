//! Shared fixtures for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use dedupe::metadata::attr::maybe_get;
use tempfile::TempDir;

/// Write `content` to `dir/name`, creating parent directories.
pub fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// True when the filesystem under `dir` accepts `user.` attributes.
pub fn xattrs_supported(dir: &Path) -> bool {
    let probe = dir.join(".xattr-probe");
    fs::write(&probe, b"probe").unwrap();
    let supported = xattr::set(&probe, "user.dedupe.probe", b"1").is_ok();
    fs::remove_file(&probe).unwrap();
    if !supported {
        eprintln!("Skipping: no user xattr support under {}", dir.display());
    }
    supported
}

/// Temp dir with xattr support, or `None` to skip the test.
pub fn xattr_dir() -> Option<TempDir> {
    let dir = TempDir::new().unwrap();
    xattrs_supported(dir.path()).then_some(dir)
}

/// Read one attribute through the crate's own reader.
pub fn read_attr(path: &Path, name: &str) -> Option<Vec<u8>> {
    let file = fs::File::open(path).unwrap();
    maybe_get(&file, path, name)
}

/// Inode number of `path`.
pub fn inode(path: &Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().ino()
}

/// Device number of `path`.
pub fn device(path: &Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().dev()
}
