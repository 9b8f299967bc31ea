use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cdr::{FormatCatalog, FormatSpec};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cdrlog: CdrlogConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Extra formats, tried after the built-in catalog.
    #[serde(default)]
    pub formats: Vec<FormatSpec>,
}

/// Core settings
#[derive(Debug, Clone, Deserialize)]
pub struct CdrlogConfig {
    /// Directories watched in live mode and walked in reconciliation mode.
    pub paths: Vec<PathBuf>,
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Live watch settings
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Quiet period per path before a file is processed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Files processed concurrently; 1 means sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_workers() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate the configuration for the cdrlog service.
    ///
    /// Loads `.env` (if present) first. An explicit path wins; otherwise the
    /// file named by CDRLOG_CONFIG, then ./config.toml.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(&Self::locate(explicit))
    }

    /// Load the configuration for tools that only read the loading log.
    ///
    /// Watched paths are not checked, so a report can run on a host that has
    /// the database but not the CDR directories.
    pub fn load_report(explicit: Option<&Path>) -> Result<Self> {
        Self::read(&Self::locate(explicit))
    }

    /// Load and validate the configuration at `config_path`.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = Self::read(config_path)?;
        config.validate()?;
        config.resolve_paths()?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> PathBuf {
        let _ = dotenv::dotenv();

        match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var("CDRLOG_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.toml")),
        }
    }

    fn read(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.cdrlog.paths.is_empty() {
            anyhow::bail!("cdrlog.paths must list at least one directory");
        }

        for path in &self.cdrlog.paths {
            if !path.exists() {
                anyhow::bail!("watched path does not exist: {}", path.display());
            }
            if !path.is_dir() {
                anyhow::bail!("watched path must be a directory, not a file: {}", path.display());
            }
        }

        if self.watch.debounce_ms == 0 {
            anyhow::bail!("watch.debounce_ms must be greater than 0");
        }

        if self.reconcile.workers == 0 {
            anyhow::bail!("reconcile.workers must be greater than 0");
        }

        // Surface bad [[formats]] entries at startup rather than on first dispatch
        self.catalog()?;

        Ok(())
    }

    /// Make watched paths absolute so stored directories are stable across runs.
    fn resolve_paths(&mut self) -> Result<()> {
        for path in self.cdrlog.paths.iter_mut() {
            *path = path
                .canonicalize()
                .with_context(|| format!("Failed to resolve path: {}", path.display()))?;
        }
        Ok(())
    }

    /// Built-in format catalog extended with the configured formats.
    pub fn catalog(&self) -> Result<FormatCatalog> {
        FormatCatalog::with_extra(&self.formats).context("Invalid [[formats]] entry")
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.cdrlog.db_path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.cdrlog.paths
    }
}
