//! Configuration loading for Nereid.
//!
//! Configuration lives in `.nereid/config.yaml` under the working directory.
//! A missing file means "use the defaults"; a present but invalid file is an
//! error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the nereid directory
pub const NEREID_DIR_NAME: &str = ".nereid";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default database location, relative to the working directory
pub const DEFAULT_DATABASE: &str = ".nereid/graph.db";

/// Default depth for closure queries when the caller gives none
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Hard ceiling applied to every closure query
pub const DEFAULT_MAX_DEPTH_LIMIT: u32 = 32;

/// Default `SQLite` busy timeout
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration file structure for nereid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Path to the `SQLite` database, relative to the working directory
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Closure query settings
    #[serde(default)]
    pub closure: ClosureConfig,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Closure query section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ClosureConfig {
    /// Depth used when a caller does not pass one
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,

    /// Requests above this depth are clamped to it
    #[serde(default = "default_max_depth_limit")]
    pub max_depth_limit: u32,
}

/// Storage section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// How long a connection waits on a locked database before giving up
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_max_depth_limit() -> u32 {
    DEFAULT_MAX_DEPTH_LIMIT
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            default_max_depth: DEFAULT_MAX_DEPTH,
            max_depth_limit: DEFAULT_MAX_DEPTH_LIMIT,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            closure: ClosureConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Path of the config file for a working directory.
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(NEREID_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load and validate configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it is not valid YAML or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.nereid/config.yaml` under `dir`, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for a file that exists.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.closure.max_depth_limit == 0 {
            return Err(Error::Config(
                "closure.max-depth-limit must be at least 1".to_string(),
            ));
        }
        if self.closure.default_max_depth == 0 {
            return Err(Error::Config(
                "closure.default-max-depth must be at least 1".to_string(),
            ));
        }
        if self.closure.default_max_depth > self.closure.max_depth_limit {
            return Err(Error::Config(format!(
                "closure.default-max-depth ({}) exceeds closure.max-depth-limit ({})",
                self.closure.default_max_depth, self.closure.max_depth_limit
            )));
        }
        Ok(())
    }

    /// Resolve the database path against a working directory.
    #[must_use]
    pub fn database_path(&self, dir: &Path) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            dir.join(&self.database)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("should create temp dir");

        let config = Config::load_or_default(dir.path()).expect("defaults should load");

        assert_eq!(config, Config::default());
        assert_eq!(config.closure.max_depth_limit, DEFAULT_MAX_DEPTH_LIMIT);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = Config::path_in(dir.path());
        let mut config = Config::default();
        config.closure.default_max_depth = 3;
        config.storage.busy_timeout_ms = 250;

        config.save(&path).expect("save should succeed");
        let loaded = Config::load(&path).expect("load should succeed");

        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = Config::path_in(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "closure:\n  max-depth-limit: 8\n").unwrap();

        let config = Config::load(&path).expect("load should succeed");

        assert_eq!(config.closure.max_depth_limit, 8);
        assert_eq!(config.closure.default_max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
    }

    #[test]
    fn default_depth_above_limit_is_rejected() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = Config::path_in(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "closure:\n  default-max-depth: 10\n  max-depth-limit: 4\n",
        )
        .unwrap();

        let err = Config::load(&path).expect_err("should reject");

        assert!(matches!(err, Error::Config(ref msg) if msg.contains("exceeds")));
    }

    #[test]
    fn relative_database_resolves_against_dir() {
        let config = Config::default();

        let resolved = config.database_path(Path::new("/work"));

        assert_eq!(resolved, PathBuf::from("/work/.nereid/graph.db"));
    }
}
