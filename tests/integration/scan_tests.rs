use super::support::write;
use dedupe::duplicates::DuplicateFinder;
use dedupe::scanner::{GroupingMode, ScanConfig, ScanError};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use tempfile::tempdir;

fn scan(config: ScanConfig, roots: &[PathBuf]) -> (Vec<Vec<PathBuf>>, dedupe::scanner::ScanSummary) {
    let (groups, summary) = DuplicateFinder::new(config).find_duplicates(roots).unwrap();
    (groups.into_iter().map(|g| g.paths).collect(), summary)
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (groups, summary) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);

    assert!(groups.is_empty());
    assert_eq!(summary.admitted, 0);
    assert_eq!(summary.duplicate_groups, 0);
    assert_eq!(summary.errors, 0);
}

#[test]
fn test_scan_no_roots_is_error() {
    let finder = DuplicateFinder::new(ScanConfig::default());
    assert!(matches!(finder.find_duplicates(&[]), Err(ScanError::NoRoots)));
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.txt", b"duplicate");
    let b = write(dir.path(), "sub/b.txt", b"duplicate");
    write(dir.path(), "c.txt", b"unique");

    let (groups, summary) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);

    assert_eq!(groups, vec![vec![a, b]]);
    assert_eq!(summary.admitted, 3);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_paths, 2);
}

#[test]
fn test_scan_groups_sorted_by_digest_paths_sorted() {
    let dir = tempdir().unwrap();
    for name in ["z1", "a1", "m1"] {
        write(dir.path(), name, b"first content");
    }
    for name in ["y2", "b2"] {
        write(dir.path(), name, b"second content");
    }

    let (groups, _) = DuplicateFinder::new(ScanConfig::default())
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert!(groups[0].sha256 < groups[1].sha256);
    for group in &groups {
        let mut sorted = group.paths.clone();
        sorted.sort();
        assert_eq!(group.paths, sorted);
    }
}

#[test]
fn test_multiple_roots_share_groups() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    let a = write(left.path(), "photo.jpg", b"pixels");
    let b = write(right.path(), "backup/photo.jpg", b"pixels");

    let (groups, summary) = scan(
        ScanConfig::default(),
        &[left.path().to_path_buf(), right.path().to_path_buf()],
    );

    assert_eq!(summary.roots, 2);
    assert_eq!(groups.len(), 1);
    assert!(groups[0].contains(&a) && groups[0].contains(&b));
}

#[test]
fn test_root_may_be_a_file() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");

    let (groups, _) = scan(ScanConfig::default(), &[a.clone(), b.clone()]);
    assert_eq!(groups, vec![vec![a, b]]);
}

#[test]
fn test_min_size_skips_small_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small1", b"x");
    write(dir.path(), "small2", b"x");
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");
    let big1 = write(dir.path(), "big1", &[7u8; 100]);
    let big2 = write(dir.path(), "big2", &[7u8; 100]);

    let (groups, summary) = scan(
        ScanConfig::default().with_min_size(10),
        &[dir.path().to_path_buf()],
    );

    assert_eq!(groups, vec![vec![big1, big2]]);
    assert_eq!(summary.skipped_small, 4);
}

#[test]
fn test_default_min_size_skips_empty_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "e1", b"");
    write(dir.path(), "e2", b"");

    let (groups, summary) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);
    assert!(groups.is_empty());
    assert_eq!(summary.skipped_small, 2);
}

#[test]
fn test_hardlinks_collapse_in_inode_mode() {
    let dir = tempdir().unwrap();
    let original = write(dir.path(), "original.txt", b"identical content");
    let link = dir.path().join("hardlink.txt");
    fs::hard_link(&original, &link).unwrap();

    let (groups, _) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);
    assert!(groups.is_empty(), "one inode is not a duplicate");

    let copy = write(dir.path(), "copy.txt", b"identical content");
    let (groups, _) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);
    // The inode is represented by its smallest path.
    assert_eq!(groups, vec![vec![copy, link]]);
}

#[test]
fn test_hardlinks_listed_in_paths_mode() {
    let dir = tempdir().unwrap();
    let original = write(dir.path(), "a", b"identical content");
    let link = dir.path().join("b");
    fs::hard_link(&original, &link).unwrap();

    let (groups, _) = scan(
        ScanConfig::default().with_mode(GroupingMode::Paths),
        &[dir.path().to_path_buf()],
    );
    assert_eq!(groups, vec![vec![original, link]]);
}

#[test]
fn test_symlink_to_file_is_admitted() {
    let dir = tempdir().unwrap();
    let target = write(dir.path(), "target", b"linked content");
    let copy = write(dir.path(), "copy", b"linked content");
    let link = dir.path().join("link");
    symlink(&target, &link).unwrap();

    let (groups, _) = scan(
        ScanConfig::default().with_mode(GroupingMode::Paths),
        &[dir.path().to_path_buf()],
    );
    assert_eq!(groups, vec![vec![copy, link, target]]);
}

#[test]
fn test_symlinked_directory_not_followed() {
    let outside = tempdir().unwrap();
    write(outside.path(), "a", b"outside");
    write(outside.path(), "b", b"outside");

    let dir = tempdir().unwrap();
    symlink(outside.path(), dir.path().join("elsewhere")).unwrap();

    let (groups, summary) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);
    assert!(groups.is_empty());
    assert_eq!(summary.skipped_unsupported, 1);
}

#[test]
fn test_dangling_symlink_skipped() {
    let dir = tempdir().unwrap();
    symlink(dir.path().join("missing"), dir.path().join("dangling")).unwrap();

    let (_, summary) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.skipped_unsupported, 1);
}

#[test]
fn test_missing_root_counted_as_error() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");

    let (groups, summary) = scan(
        ScanConfig::default(),
        &[dir.path().join("does-not-exist"), dir.path().to_path_buf()],
    );

    assert_eq!(summary.errors, 1);
    assert!(summary.is_partial());
    assert_eq!(groups, vec![vec![a, b]]);
}

#[test]
fn test_unreadable_directory_does_not_stop_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");
    write(dir.path(), "locked/c", b"same");
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (groups, summary) = scan(ScanConfig::default(), &[dir.path().to_path_buf()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(groups, vec![vec![a, b]]);
}

#[test]
fn test_single_worker_matches_many_workers() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        write(dir.path(), &format!("f{i:02}"), format!("content {}", i % 7).as_bytes());
    }
    let roots = [dir.path().to_path_buf()];

    let (one, _) = scan(ScanConfig::default().with_io_threads(1).with_rescan(true), &roots);
    let (many, _) = scan(ScanConfig::default().with_io_threads(8).with_rescan(true), &roots);

    assert_eq!(one.len(), 7);
    assert_eq!(one, many);
}
