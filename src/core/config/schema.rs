//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Example
//!
//! ```toml
//! repository_root = "/var/lib/chronicle"
//! default_user = "Anonymous"
//! default_message = "There was no commit message specified."
//! author_email = "chronicle@localhost"
//! lock_timeout_ms = 5000
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing so a bad file fails at load time,
//! not at the first commit.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// On-disk configuration. Every field is optional; unset fields fall back
/// to the defaults applied by [`Config`](super::Config).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Directory that holds one repository per versioned class
    pub repository_root: Option<PathBuf>,

    /// Author used when a session sets no user
    pub default_user: Option<String>,

    /// Commit message used when a session sets none
    pub default_message: Option<String>,

    /// Email recorded for authors given without `<email>`
    pub author_email: Option<String>,

    /// Upper bound on waiting for a commit lock (unbounded if unset)
    pub lock_timeout_ms: Option<u64>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.repository_root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "repository_root cannot be empty".to_string(),
                ));
            }
        }

        if let Some(user) = &self.default_user {
            if user.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "default_user cannot be empty".to_string(),
                ));
            }
        }

        if let Some(email) = &self.author_email {
            if email.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "author_email cannot be empty".to_string(),
                ));
            }
            if email.contains('<') || email.contains('>') {
                return Err(ConfigError::InvalidValue(format!(
                    "author_email '{}' cannot contain angle brackets",
                    email
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConfigFile::default();
        assert!(config.repository_root.is_none());
        assert!(config.lock_timeout_ms.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_user_rejected() {
        let config = ConfigFile {
            default_user: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bracketed_email_rejected() {
        let config = ConfigFile {
            author_email: Some("<me@example.com>".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str("trunk = \"main\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn roundtrip() {
        let config = ConfigFile {
            repository_root: Some(PathBuf::from("/data/history")),
            default_user: Some("ops".to_string()),
            default_message: Some("sync".to_string()),
            author_email: Some("ops@example.com".to_string()),
            lock_timeout_ms: Some(250),
        };
        let toml = toml::to_string(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
