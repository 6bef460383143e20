//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config FILE`, or `config.toml` in the platform config
//!    directory (`~/.config/dedupe/config.toml` on Linux)
//! 3. `DEDUPE_`-prefixed environment variables (`DEDUPE_MIN_SIZE=4096`)
//! 4. Command-line flags, applied by the caller
//!
//! ```toml
//! namespace = "user.dedupe."
//! min_size = 1
//! io_threads = 4
//! exclude = ["*.tmp", "**/.git"]
//! prefer = ["/srv/primary/**"]
//! relative_symlinks = false
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::metadata::names::DEFAULT_NAMESPACE;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "DEDUPE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extended attribute prefix for cached metadata.
    pub namespace: String,
    /// Smallest file size admitted into a scan, in bytes.
    pub min_size: u64,
    /// Number of hashing workers.
    pub io_threads: usize,
    /// Descend into directories on other filesystems.
    pub cross_device: bool,
    /// Globs excluded from every scan, applied before CLI rules.
    pub exclude: Vec<String>,
    /// Survivor preference globs for `clean`, highest priority first.
    pub prefer: Vec<String>,
    /// Write relative symlink targets when a hardlink is impossible.
    pub relative_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            min_size: 1,
            io_threads: 4,
            cross_device: false,
            exclude: Vec::new(),
            prefer: Vec::new(),
            relative_symlinks: false,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist. The default platform path is used
    /// only when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, or if a layer
    /// cannot be parsed into [`Config`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.is_file()),
        };

        match &file {
            Some(file) => log::debug!("Loading config from {}", file.display()),
            None => log::debug!("No config file, using defaults and environment"),
        }

        Self::figment(file.as_deref())
            .extract()
            .context("Failed to load configuration")
    }

    /// Build the provider stack without extracting it.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dedupe", "dedupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
