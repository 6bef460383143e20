use super::support::{write, xattr_dir};
use dedupe::cli::{Cli, Commands};
use dedupe::config::Config;
use dedupe::duplicates::DuplicateFinder;
use dedupe::metadata::AttrNames;
use dedupe::rules::{RuleSet, RuleSpec};
use dedupe::scanner::ScanConfig;
use std::path::PathBuf;
use tempfile::tempdir;

fn glob_under(root: &std::path::Path, glob: &str) -> String {
    format!("{}/{glob}", root.display())
}

fn scan_with(rules: &[RuleSpec], roots: &[PathBuf]) -> (Vec<Vec<PathBuf>>, usize) {
    let config = ScanConfig::default().with_rules(RuleSet::compile(rules).unwrap());
    let (groups, summary) = DuplicateFinder::new(config).find_duplicates(roots).unwrap();
    (
        groups.into_iter().map(|g| g.paths).collect(),
        summary.skipped_excluded,
    )
}

#[test]
fn test_exclude_files_by_extension() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.txt", b"same");
    let b = write(dir.path(), "b.txt", b"same");
    write(dir.path(), "c.tmp", b"same");

    let (groups, excluded) = scan_with(
        &[RuleSpec::exclude("**.tmp")],
        &[dir.path().to_path_buf()],
    );
    assert_eq!(groups, vec![vec![a, b]]);
    assert_eq!(excluded, 1);
}

#[test]
fn test_excluded_directory_is_pruned() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");
    write(dir.path(), "cache/one", b"same");
    write(dir.path(), "cache/deeper/two", b"same");

    let (groups, excluded) = scan_with(
        &[RuleSpec::exclude(glob_under(dir.path(), "cache"))],
        &[dir.path().to_path_buf()],
    );
    assert_eq!(groups, vec![vec![a, b]]);
    // Only the directory itself is counted; its contents are never seen.
    assert_eq!(excluded, 1);
}

#[test]
fn test_include_before_exclude_wins() {
    let dir = tempdir().unwrap();
    let keep = write(dir.path(), "keep/x", b"same");
    let other = write(dir.path(), "top", b"same");
    write(dir.path(), "drop/y", b"same");

    let rules = [
        RuleSpec::include(glob_under(dir.path(), "keep/**")),
        RuleSpec::include(glob_under(dir.path(), "keep")),
        RuleSpec::exclude(glob_under(dir.path(), "*/**")),
        RuleSpec::exclude(glob_under(dir.path(), "drop")),
    ];
    let (groups, _) = scan_with(&rules, &[dir.path().to_path_buf()]);
    assert_eq!(groups, vec![vec![keep, other]]);
}

#[test]
fn test_rule_order_from_command_line() {
    let dir = tempdir().unwrap();
    let root = dir.path().display().to_string();
    let include = format!("{root}/a.log");
    let exclude = format!("{root}/*.log");

    let cli = Cli::try_parse_ordered_from([
        "dedupe",
        "find",
        root.as_str(),
        "--include",
        include.as_str(),
        "--exclude",
        exclude.as_str(),
    ])
    .unwrap();
    let Commands::Find(args) = cli.command else {
        panic!("Expected Find command");
    };
    let config = dedupe::scan_config(&args, &Config::default()).unwrap();

    let a = write(dir.path(), "a.log", b"same");
    write(dir.path(), "b.log", b"same");
    let c = write(dir.path(), "c.txt", b"same");

    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates(&args.roots)
        .unwrap();
    assert_eq!(groups[0].paths, vec![a, c]);
    assert_eq!(summary.skipped_excluded, 1);
}

#[test]
fn test_unicode_glob_matches_precomposed_name() {
    let dir = tempdir().unwrap();
    // NFC on disk, NFD in the pattern.
    write(dir.path(), "caf\u{e9}.txt", b"same");
    write(dir.path(), "copy.txt", b"same");

    let (groups, excluded) = scan_with(
        &[RuleSpec::exclude(glob_under(dir.path(), "cafe\u{301}.txt"))],
        &[dir.path().to_path_buf()],
    );
    assert!(groups.is_empty());
    assert_eq!(excluded, 1);
}

#[test]
fn test_exclude_attribute_excludes_without_rules() {
    let Some(dir) = xattr_dir() else { return };
    let names = AttrNames::default();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");
    let c = write(dir.path(), "c", b"same");
    xattr::set(&c, &names.exclude, b"yes").unwrap();

    let (groups, excluded) = scan_with(&[], &[dir.path().to_path_buf()]);
    assert_eq!(groups, vec![vec![a, b]]);
    assert_eq!(excluded, 1);
}

#[test]
fn test_exclude_attribute_no_overrides_rule() {
    let Some(dir) = xattr_dir() else { return };
    let names = AttrNames::default();
    let a = write(dir.path(), "a.tmp", b"same");
    let b = write(dir.path(), "b.tmp", b"same");
    xattr::set(&a, &names.exclude, b"no").unwrap();

    let (groups, excluded) = scan_with(
        &[RuleSpec::exclude("**.tmp")],
        &[dir.path().to_path_buf()],
    );
    assert!(groups.is_empty());
    assert_eq!(excluded, 1);

    xattr::set(&b, &names.exclude, b"0").unwrap();
    let (groups, _) = scan_with(&[RuleSpec::exclude("**.tmp")], &[dir.path().to_path_buf()]);
    assert_eq!(groups, vec![vec![a, b]]);
}

#[test]
fn test_exclude_attribute_on_directory_prunes() {
    let Some(dir) = xattr_dir() else { return };
    let names = AttrNames::default();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");
    write(dir.path(), "private/c", b"same");
    xattr::set(dir.path().join("private"), &names.exclude, b"").unwrap();

    let (groups, _) = scan_with(&[], &[dir.path().to_path_buf()]);
    assert_eq!(groups, vec![vec![a, b]]);
}
