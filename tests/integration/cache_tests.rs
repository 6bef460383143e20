use super::support::{read_attr, write, xattr_dir};
use dedupe::duplicates::DuplicateFinder;
use dedupe::metadata::{AttrNames, Bits, Metadata};
use dedupe::scanner::ScanConfig;
use filetime::{set_file_mtime, FileTime};
use std::fs::{self, File};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

fn mtime(path: &Path) -> i64 {
    fs::metadata(path).unwrap().mtime()
}

/// Store a complete but fabricated identity on `path`.
fn forge(path: &Path, sha256: [u8; 32], names: &AttrNames) {
    let meta = Metadata {
        bits: Bits::ALL,
        size: fs::metadata(path).unwrap().len() as i64,
        time: mtime(path),
        md5: [1; 16],
        sha1: [2; 20],
        sha256,
    };
    let file = File::open(path).unwrap();
    meta.save(&file, path, names);
}

#[test]
fn test_scan_writes_cache_attributes() {
    let Some(dir) = xattr_dir() else { return };
    let path = write(dir.path(), "hello.txt", b"hello");
    let names = AttrNames::default();

    DuplicateFinder::new(ScanConfig::default())
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    let stamp = String::from_utf8(read_attr(&path, &names.stamp).unwrap()).unwrap();
    assert!(stamp.starts_with("size:5,modTime:"), "{stamp}");
    assert!(stamp.ends_with(",sha256:LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ="));
    assert_eq!(
        read_attr(&path, &names.sha256).unwrap(),
        b"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(read_attr(&path, &names.size).unwrap(), b"5");
    assert_eq!(
        read_attr(&path, &names.time).unwrap(),
        mtime(&path).to_string().as_bytes()
    );
}

#[test]
fn test_second_scan_hashes_nothing() {
    let Some(dir) = xattr_dir() else { return };
    write(dir.path(), "a", b"duplicate");
    write(dir.path(), "b", b"duplicate");
    write(dir.path(), "c", b"unique");
    let roots = [dir.path().to_path_buf()];
    let finder = DuplicateFinder::new(ScanConfig::default());

    let (first, summary) = finder.find_duplicates(&roots).unwrap();
    assert_eq!(summary.files_hashed, 3);

    let (second, summary) = finder.find_duplicates(&roots).unwrap();
    assert_eq!(summary.files_hashed, 0);
    assert_eq!(summary.bytes_hashed, 0);
    assert_eq!(summary.cache_hits, 3);
    assert_eq!(first, second);
}

#[test]
fn test_cached_identity_is_trusted() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"one content");
    let b = write(dir.path(), "b", b"another content");
    let names = AttrNames::default();
    forge(&a, [9; 32], &names);
    forge(&b, [9; 32], &names);

    let (groups, summary) = DuplicateFinder::new(ScanConfig::default())
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(summary.files_hashed, 0);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].sha256, [9; 32]);
}

#[test]
fn test_rescan_ignores_cache() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"one content");
    let b = write(dir.path(), "b", b"another content");
    let names = AttrNames::default();
    forge(&a, [9; 32], &names);
    forge(&b, [9; 32], &names);

    let (groups, summary) = DuplicateFinder::new(ScanConfig::default().with_rescan(true))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(summary.files_hashed, 2);
    assert!(groups.is_empty());
    // The forged values were overwritten.
    assert_ne!(read_attr(&a, &names.sha256).unwrap(), hex::encode([9u8; 32]).as_bytes());
}

#[test]
fn test_stale_cache_is_recomputed() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"version 1");
    let b = write(dir.path(), "b", b"version 2");
    let names = AttrNames::default();
    let finder = DuplicateFinder::new(ScanConfig::default());
    let roots = [dir.path().to_path_buf()];

    let (groups, _) = finder.find_duplicates(&roots).unwrap();
    assert!(groups.is_empty());
    let before = read_attr(&a, &names.stamp).unwrap();

    // Same size, new content, new mtime.
    fs::write(&a, b"version 2").unwrap();
    set_file_mtime(&a, FileTime::from_unix_time(mtime(&b) + 60, 0)).unwrap();

    let (groups, summary) = finder.find_duplicates(&roots).unwrap();
    assert_eq!(summary.files_hashed, 1);
    assert_eq!(summary.cache_hits, 1);
    assert_eq!(groups.len(), 1);
    assert_ne!(read_attr(&a, &names.stamp).unwrap(), before);
}

#[test]
fn test_size_change_invalidates_cache() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"short");
    let names = AttrNames::default();
    forge(&a, [9; 32], &names);
    let time = mtime(&a);

    fs::write(&a, b"much longer now").unwrap();
    set_file_mtime(&a, FileTime::from_unix_time(time, 0)).unwrap();

    let (_, summary) = DuplicateFinder::new(ScanConfig::default())
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(summary.files_hashed, 1);
}

#[test]
fn test_stamp_alone_is_enough_and_rewrite_fills_fields() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"hello");
    let names = AttrNames::default();
    let stamp = format!(
        "size:5,modTime:{},md5:XUFAKrxLKna5cZ2REBfFkg==,\
         sha1:qvTGHdzF6KLavt4PO0gs2a6pQ00=,\
         sha256:LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ=",
        mtime(&a)
    );
    xattr::set(&a, &names.stamp, stamp.as_bytes()).unwrap();
    let roots = [dir.path().to_path_buf()];

    let (_, summary) = DuplicateFinder::new(ScanConfig::default())
        .find_duplicates(&roots)
        .unwrap();
    assert_eq!(summary.files_hashed, 0);
    assert!(read_attr(&a, &names.sha256).is_none());

    let (_, summary) = DuplicateFinder::new(ScanConfig::default().with_rewrite(true))
        .find_duplicates(&roots)
        .unwrap();
    assert_eq!(summary.files_hashed, 0);
    assert_eq!(
        read_attr(&a, &names.sha256).unwrap(),
        b"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[test]
fn test_per_field_attributes_used_without_stamp() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"hello");
    let names = AttrNames::default();
    let time = mtime(&a).to_string();
    xattr::set(&a, &names.size, b"5").unwrap();
    xattr::set(&a, &names.time, time.as_bytes()).unwrap();
    xattr::set(&a, &names.md5, b"5d41402abc4b2a76b9719d911017c592").unwrap();
    xattr::set(&a, &names.sha1, b"aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d").unwrap();
    xattr::set(
        &a,
        &names.sha256,
        b"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
    )
    .unwrap();

    let (_, summary) = DuplicateFinder::new(ScanConfig::default())
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(summary.files_hashed, 0);
    assert_eq!(summary.cache_hits, 1);
}

#[test]
fn test_custom_namespace() {
    let Some(dir) = xattr_dir() else { return };
    let a = write(dir.path(), "a", b"hello");
    let names = AttrNames::with_namespace("user.other.");

    DuplicateFinder::new(ScanConfig::default().with_names(names.clone()))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(read_attr(&a, &names.stamp).is_some());
    assert!(read_attr(&a, &AttrNames::default().stamp).is_none());
}
