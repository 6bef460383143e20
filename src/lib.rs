//! dedupe - duplicate file finder with xattr-cached hashes
//!
//! `find` walks one or more trees, hashes every admitted regular file with
//! MD5, SHA-1 and SHA-256, and caches the result in extended attributes on
//! the file itself so unchanged files are never read twice. Files sharing a
//! SHA-256 are reported as JSON. `clean` takes that report and atomically
//! replaces every duplicate with a hardlink to one survivor, falling back
//! to a symlink when a hardlink is impossible.
//!
//! # Library use
//!
//! ```no_run
//! use dedupe::duplicates::DuplicateFinder;
//! use dedupe::scanner::ScanConfig;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(ScanConfig::default().with_min_size(4096));
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from("/srv")]).unwrap();
//! for group in &groups {
//!     println!("{}: {:?}", group.hash_hex(), group.paths);
//! }
//! println!("{summary}");
//! ```

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod progress;
pub mod rules;
pub mod scanner;

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{ReplaceConfig, Replacer};
use crate::cli::{CleanArgs, Cli, Commands, FindArgs};
use crate::config::Config;
use crate::duplicates::DuplicateFinder;
use crate::error::ExitCode;
use crate::metadata::names::AttrNames;
use crate::output::{read_groups, JsonOutput};
use crate::progress::Progress;
use crate::rules::{RuleSet, RuleSpec};
use crate::scanner::{GroupingMode, ScanConfig};

/// Run the parsed command line and return the process exit code.
///
/// # Errors
///
/// Returns an error for invalid configuration or patterns, unreadable or
/// malformed reports, failure to write the report, and any replacement
/// that could not be completed.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Effective config: {config:?}");

    match cli.command {
        Commands::Find(args) => handle_find(args, &config, cli.quiet),
        Commands::Clean(args) => handle_clean(args, &config),
    }
}

/// Merge config-file settings with `find` flags; flags win.
///
/// # Errors
///
/// Returns an error if any exclude/include glob fails to compile.
pub fn scan_config(args: &FindArgs, config: &Config) -> Result<ScanConfig> {
    let mut specs: Vec<RuleSpec> = config.exclude.iter().map(RuleSpec::exclude).collect();
    specs.extend(args.rules.iter().cloned());
    let rules = RuleSet::compile(&specs).context("Invalid --exclude/--include pattern")?;

    let namespace = args.namespace.as_deref().unwrap_or(&config.namespace);
    let mode = if args.all_paths {
        GroupingMode::Paths
    } else {
        GroupingMode::Inodes
    };

    Ok(ScanConfig::default()
        .with_names(AttrNames::with_namespace(namespace))
        .with_rules(rules)
        .with_min_size(args.min_size.unwrap_or(config.min_size))
        .with_cross_device(args.cross_device || config.cross_device)
        .with_rescan(args.rescan)
        .with_rewrite(args.rewrite)
        .with_mode(mode)
        .with_io_threads(args.io_threads.unwrap_or(config.io_threads)))
}

/// Merge config-file settings with `clean` flags; flags win.
///
/// # Errors
///
/// Returns an error if a preference glob fails to compile.
pub fn replace_config(args: &CleanArgs, config: &Config) -> Result<ReplaceConfig> {
    let prefer = if args.prefer.is_empty() {
        &config.prefer
    } else {
        &args.prefer
    };
    let rules = RuleSet::preferences(prefer).context("Invalid --prefer pattern")?;
    Ok(ReplaceConfig::default()
        .with_rules(rules)
        .with_relative_symlinks(args.relative || config.relative_symlinks)
        .with_dry_run(args.dry_run))
}

fn handle_find(args: FindArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let scan = scan_config(&args, config)?;
    let finder = DuplicateFinder::new(scan).with_progress(Arc::new(Progress::new(quiet)));
    let (groups, summary) = finder.find_duplicates(&args.roots)?;

    let report = JsonOutput::new(&groups);
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            report
                .write_to(&mut BufWriter::new(file))
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => report
            .write_to(&mut io::stdout().lock())
            .context("Failed to write report")?,
    }

    if summary.is_partial() {
        log::warn!("{} entries could not be read", summary.errors);
    }
    Ok(ExitCode::for_scan(summary.duplicate_groups, summary.errors))
}

fn handle_clean(args: CleanArgs, config: &Config) -> Result<ExitCode> {
    let replace = replace_config(&args, config)?;

    let groups = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => {
            let file =
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            read_groups(BufReader::new(file))
                .with_context(|| format!("Failed to read report {}", path.display()))?
        }
        _ => read_groups(io::stdin().lock()).context("Failed to read report from stdin")?,
    };
    log::debug!("Read {} groups", groups.len());

    Replacer::new(replace).run(&groups)?;
    Ok(ExitCode::Success)
}
