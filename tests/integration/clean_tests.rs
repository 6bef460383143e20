use super::support::{inode, write};
use dedupe::cli::Cli;
use dedupe::error::ExitCode;
use dedupe::output::read_groups;
use std::fs::{self, File};
use std::path::Path;
use tempfile::tempdir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["dedupe", "-q"];
    argv.extend_from_slice(args);
    dedupe::run_app(Cli::try_parse_ordered_from(argv).unwrap())
}

fn empty_config(dir: &Path) -> String {
    let path = dir.join("config.toml");
    fs::write(&path, "").unwrap();
    path.display().to_string()
}

#[test]
fn test_find_then_clean_round_trip() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    let a = write(&tree, "originals/photo.jpg", b"pixels");
    let b = write(&tree, "copies/photo.jpg", b"pixels");
    let c = write(&tree, "copies/photo (1).jpg", b"pixels");
    write(&tree, "unique.txt", b"just me");
    let config = empty_config(dir.path());
    let report = dir.path().join("report.json");
    let report_str = report.display().to_string();
    let tree_str = tree.display().to_string();

    let code = run(&["--config", &config, "find", &tree_str, "-o", &report_str]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let groups = read_groups(File::open(&report).unwrap()).unwrap();
    assert_eq!(groups, vec![vec![c.clone(), b.clone(), a.clone()]]);

    let prefer = format!("{tree_str}/originals/**");
    let code = run(&["--config", &config, "clean", "--prefer", &prefer, &report_str]).unwrap();
    assert_eq!(code, ExitCode::Success);

    assert_eq!(inode(&a), inode(&b));
    assert_eq!(inode(&a), inode(&c));

    // Everything is one inode now, so a second find reports nothing.
    let code = run(&["--config", &config, "find", &tree_str, "-o", &report_str]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
    assert_eq!(fs::read_to_string(&report).unwrap(), "[]\n");
}

#[test]
fn test_find_partial_exit_code() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"same");
    write(dir.path(), "b", b"same");
    let config = empty_config(dir.path());
    let report = dir.path().join("out.json").display().to_string();
    let root = dir.path().display().to_string();
    let missing = dir.path().join("missing").display().to_string();

    let code = run(&["--config", &config, "find", &root, &missing, "-o", &report]).unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_clean_rejects_malformed_report() {
    let dir = tempdir().unwrap();
    let config = empty_config(dir.path());
    let report = dir.path().join("bad.json");
    fs::write(&report, "{\"not\": \"groups\"}").unwrap();

    let err = run(&["--config", &config, "clean", &report.display().to_string()]).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read report"));
}

#[test]
fn test_clean_missing_report_is_error() {
    let dir = tempdir().unwrap();
    let config = empty_config(dir.path());
    let missing = dir.path().join("nope.json").display().to_string();

    assert!(run(&["--config", &config, "clean", &missing]).is_err());
}

#[test]
fn test_missing_config_file_is_error() {
    let dir = tempdir().unwrap();
    let root = dir.path().display().to_string();
    let missing = dir.path().join("nope.toml").display().to_string();

    let err = run(&["--config", &missing, "find", &root]).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}
