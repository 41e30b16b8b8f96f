//! Store configuration.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```
//! use keepsake::StoreConfig;
//!
//! let config = StoreConfig::from_toml_str(r#"
//!     project = "clinic"
//!
//!     [cookie]
//!     expires_days = 30
//! "#).unwrap();
//!
//! assert_eq!(config.project, "clinic");
//! assert_eq!(config.cookie.expires_days, 30);
//! assert_eq!(config.cookie.path, "/");
//! assert_eq!(config.indexed.database, "MyDatabase");
//! ```

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration shared by every store a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix of every namespaced store key (`<project>:<name>`).
    pub project: String,
    pub cookie: CookieSettings,
    pub url: UrlSettings,
    pub indexed: IndexedSettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project: "health".to_string(),
            cookie: CookieSettings::default(),
            url: UrlSettings::default(),
            indexed: IndexedSettings::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a config from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Set the project prefix.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }
}

/// Attributes written with every cookie.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub expires_days: i64,
    pub path: String,
    pub same_site: SameSitePolicy,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            expires_days: 7,
            path: "/".to_string(),
            same_site: SameSitePolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl From<SameSitePolicy> for cookie::SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => cookie::SameSite::Strict,
            SameSitePolicy::Lax => cookie::SameSite::Lax,
            SameSitePolicy::None => cookie::SameSite::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UrlSettings {
    pub history: HistoryMode,
}

/// How a rewritten query string enters the session history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Replace the current history entry.
    #[default]
    Replace,
    /// Push a new history entry.
    Push,
}

/// Layout of the asynchronous key-value database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexedSettings {
    pub database: String,
    pub version: u32,
    pub object_store: String,
}

impl Default for IndexedSettings {
    fn default() -> Self {
        Self {
            database: "MyDatabase".to_string(),
            version: 1,
            object_store: "signals".to_string(),
        }
    }
}
