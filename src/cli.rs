//! Command-line interface definitions for dedupe.
//!
//! Global options (verbosity, config file) come first, then one of two
//! subcommands:
//!
//! ```bash
//! # Find duplicates below two roots and write the report to a file
//! dedupe find /srv/photos /mnt/backup/photos -o dupes.json
//!
//! # Skip editor droppings but keep one directory that matches
//! dedupe find ~/src --exclude '**/target' --include '**/keep/target' --exclude '*.swp'
//!
//! # Replace duplicates with links, preferring copies under /srv
//! dedupe clean --prefer '/srv/**' dupes.json
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::rules::RuleSpec;

/// Duplicate file finder with xattr-cached hashes.
///
/// `find` hashes every regular file below the given roots, caching the
/// digests in extended attributes, and prints groups of identical files as
/// JSON. `clean` reads such a report and replaces every duplicate with a
/// hardlink (or symlink) to one survivor.
#[derive(Debug, Parser)]
#[command(name = "dedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate files and print them as JSON
    Find(FindArgs),
    /// Replace duplicates listed in a report with links
    Clean(CleanArgs),
}

/// Arguments for the find subcommand.
#[derive(Debug, Args)]
pub struct FindArgs {
    /// Directories (or files) to scan
    #[arg(value_name = "ROOT", required = true)]
    pub roots: Vec<PathBuf>,

    /// Ignore cached identities and hash every file
    #[arg(long)]
    pub rescan: bool,

    /// Rewrite cache attributes even when they are current
    #[arg(long)]
    pub rewrite: bool,

    /// Minimum file size to consider (e.g., 1, 4KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Descend into directories on other filesystems
    #[arg(long)]
    pub cross_device: bool,

    /// Skip paths matching this glob (repeatable)
    ///
    /// Rules are tried in command-line order together with --include; the
    /// first matching rule decides.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Keep paths matching this glob even if a later --exclude matches
    #[arg(long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Extended attribute prefix for cached metadata
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Report every path, not one per inode
    #[arg(long)]
    pub all_paths: bool,

    /// Number of hashing workers
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// --exclude and --include merged in the order they were given
    #[arg(skip)]
    pub rules: Vec<RuleSpec>,
}

/// Arguments for the clean subcommand.
#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Report to read; stdin when omitted or "-"
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Prefer survivors matching this glob (repeatable, earlier wins)
    #[arg(long, value_name = "GLOB")]
    pub prefer: Vec<String>,

    /// Write symlink targets relative to the link's directory
    #[arg(long = "rel")]
    pub relative: bool,

    /// Log what would be replaced without touching anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse `std::env::args_os`, exiting on error like [`Parser::parse`].
    #[must_use]
    pub fn parse_ordered() -> Self {
        match Self::try_parse_ordered_from(std::env::args_os()) {
            Ok(cli) => cli,
            Err(e) => e.exit(),
        }
    }

    /// Parse arguments and record the relative order of `--exclude` and
    /// `--include` in [`FindArgs::rules`].
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments, `--help` and
    /// `--version`.
    pub fn try_parse_ordered_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        if let Commands::Find(find) = &mut cli.command {
            if let Some(sub) = matches.subcommand_matches("find") {
                find.rules = ordered_rules(sub);
            }
        }
        Ok(cli)
    }
}

fn ordered_rules(matches: &ArgMatches) -> Vec<RuleSpec> {
    let mut indexed: Vec<(usize, RuleSpec)> = Vec::new();
    let kinds: [(&str, fn(String) -> RuleSpec); 2] = [
        ("exclude", |glob| RuleSpec::exclude(glob)),
        ("include", |glob| RuleSpec::include(glob)),
    ];
    for (id, make) in kinds {
        if let (Some(values), Some(indices)) =
            (matches.get_many::<String>(id), matches.indices_of(id))
        {
            indexed.extend(indices.zip(values.cloned().map(make)));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, spec)| spec).collect()
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dedupe::cli::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("4KiB").unwrap(), 4096);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    // Integers stay exact; only fractional input goes through f64.
    if let Ok(whole) = num_str.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Size too large: '{s}'"));
    }
    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;
    Ok((num * multiplier as f64) as u64)
}
