//! core::config
//!
//! Configuration schema and loading.
//!
//! # Sources
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (`$CHRONICLE_CONFIG`, or an explicit path)
//! 3. `$CHRONICLE_REPOSITORY_ROOT`
//!
//! Hosts that configure programmatically can skip files entirely with
//! [`Config::new`].
//!
//! # Example
//!
//! ```no_run
//! use chronicle::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("/etc/chronicle.toml")).unwrap();
//! println!("Repositories under: {}", config.repository_root().display());
//! println!("Default author: {}", config.default_user());
//! ```

pub mod schema;

pub use schema::ConfigFile;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CHRONICLE_CONFIG";

/// Environment variable overriding the repository root.
pub const ROOT_ENV: &str = "CHRONICLE_REPOSITORY_ROOT";

/// Author recorded when none is set.
pub const DEFAULT_USER: &str = "Anonymous";

/// Commit message recorded when none is set.
pub const DEFAULT_MESSAGE: &str = "There was no commit message specified.";

/// Email recorded for authors given without one.
pub const DEFAULT_AUTHOR_EMAIL: &str = "chronicle@localhost";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("repository_root is not configured")]
    MissingRoot,
}

/// Resolved configuration.
///
/// Accessor methods apply defaults for anything the file left unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    file: ConfigFile,
    /// Path the file was loaded from, if any
    source: Option<PathBuf>,
}

impl Config {
    /// Configuration with only the repository root set.
    pub fn new(repository_root: impl Into<PathBuf>) -> Self {
        Self {
            file: ConfigFile {
                repository_root: Some(repository_root.into()),
                ..Default::default()
            },
            source: None,
        }
    }

    /// Wrap an already-parsed config file.
    ///
    /// # Errors
    ///
    /// Returns an error if values are invalid or no root is set.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let config = Self { file, source: None };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, holds
    /// invalid values, or does not set `repository_root`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = Self::read_file(path)?;
        let config = Self {
            file,
            source: Some(path.to_path_buf()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut file, source) = match lookup(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                (Self::read_file(&path)?, Some(path))
            }
            None => (ConfigFile::default(), None),
        };

        if let Some(root) = lookup(ROOT_ENV) {
            file.repository_root = Some(PathBuf::from(root));
        }

        let config = Self { file, source };
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate all values and require a repository root.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.file.validate()?;
        if self.file.repository_root.is_none() {
            return Err(ConfigError::MissingRoot);
        }
        Ok(())
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Set the default author.
    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.file.default_user = Some(user.into());
        self
    }

    /// Set the default commit message.
    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.file.default_message = Some(message.into());
        self
    }

    /// Set the fallback author email.
    pub fn with_author_email(mut self, email: impl Into<String>) -> Self {
        self.file.author_email = Some(email.into());
        self
    }

    /// Bound the wait for a commit lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.file.lock_timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Directory holding one repository per class.
    ///
    /// Empty if constructed without a root; [`Config::validate`] rejects that.
    pub fn repository_root(&self) -> &Path {
        self.file
            .repository_root
            .as_deref()
            .unwrap_or_else(|| Path::new(""))
    }

    /// Author used when a session sets none.
    pub fn default_user(&self) -> &str {
        self.file.default_user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Commit message used when a session sets none.
    pub fn default_message(&self) -> &str {
        self.file
            .default_message
            .as_deref()
            .unwrap_or(DEFAULT_MESSAGE)
    }

    /// Email for authors given without `<email>`.
    pub fn author_email(&self) -> &str {
        self.file
            .author_email
            .as_deref()
            .unwrap_or(DEFAULT_AUTHOR_EMAIL)
    }

    /// Bound on commit lock waits. `None` waits indefinitely.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.file.lock_timeout_ms.map(Duration::from_millis)
    }

    /// Path of the file this configuration came from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("chronicle.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn new_applies_defaults() {
        let config = Config::new("/data");
        assert_eq!(config.repository_root(), Path::new("/data"));
        assert_eq!(config.default_user(), "Anonymous");
        assert_eq!(config.default_message(), DEFAULT_MESSAGE);
        assert_eq!(config.author_email(), DEFAULT_AUTHOR_EMAIL);
        assert!(config.lock_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_all_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
repository_root = "/srv/history"
default_user = "batch"
default_message = "nightly import"
author_email = "batch@example.com"
lock_timeout_ms = 1500
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.repository_root(), Path::new("/srv/history"));
        assert_eq!(config.default_user(), "batch");
        assert_eq!(config.default_message(), "nightly import");
        assert_eq!(config.author_email(), "batch@example.com");
        assert_eq!(config.lock_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.source(), Some(path.as_path()));
    }

    #[test]
    fn load_without_root_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "default_user = \"x\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::MissingRoot)));
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "repository_root = [\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn root_variable_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "repository_root = \"/from/file\"\n");
        let env: HashMap<&str, String> = [
            (CONFIG_ENV, path.display().to_string()),
            (ROOT_ENV, "/from/env".to_string()),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.repository_root(), Path::new("/from/env"));
    }

    #[test]
    fn empty_environment_has_no_root() {
        let result = Config::from_lookup(|_| None);
        assert!(matches!(result, Err(ConfigError::MissingRoot)));
    }

    #[test]
    fn builders_override_defaults() {
        let config = Config::new("/data")
            .with_default_user("alice")
            .with_default_message("edit")
            .with_author_email("alice@example.com")
            .with_lock_timeout(Duration::from_secs(2));
        assert_eq!(config.default_user(), "alice");
        assert_eq!(config.default_message(), "edit");
        assert_eq!(config.author_email(), "alice@example.com");
        assert_eq!(config.lock_timeout(), Some(Duration::from_secs(2)));
    }
}
