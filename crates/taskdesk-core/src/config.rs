//! Configuration: the JSON policy file and layered Odoo credentials.
//!
//! Credentials resolve through an ordered chain of [`EnvSource`] layers:
//! process environment first, then the dotenv file, then nothing. The process
//! environment is only ever read, never written.

use crate::error::ErrorCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_RECENT_DAYS: u32 = 7;

/// Environment keys that together make up [`Credentials`].
pub const CREDENTIAL_KEYS: [&str; 4] = ["ODOO_URL", "ODOO_DB", "ODOO_USER", "ODOO_PASSWORD"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to load dotenv file {}: {message}", path.display())]
    Dotenv { path: PathBuf, message: String },

    #[error("Missing {} env vars", missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Parse { .. } | Self::Dotenv { .. } => {
                ErrorCode::ConfigParseError
            }
            Self::MissingCredentials { .. } => ErrorCode::MissingCredentials,
        }
    }
}

/// Policy file shared by the `assign` and `digest` commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Stage names whose tickets count toward developer workload.
    #[serde(default)]
    pub open_stage_names: Vec<String>,
    /// Stage names listed in the daily digest.
    #[serde(default)]
    pub todo_stage_names: Vec<String>,
    /// Project key (name, id, or `default`) to ordered developer identifiers.
    #[serde(default)]
    pub preferred_developers: BTreeMap<String, Vec<String>>,
    /// Developer identifier (name, login, or email) to role label.
    #[serde(default)]
    pub developer_roles: BTreeMap<String, String>,
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,
}

const fn default_recent_days() -> u32 {
    DEFAULT_RECENT_DAYS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            open_stage_names: Vec::new(),
            todo_stage_names: Vec::new(),
            preferred_developers: BTreeMap::new(),
            developer_roles: BTreeMap::new(),
            recent_days: DEFAULT_RECENT_DAYS,
        }
    }
}

impl AppConfig {
    /// Parse a config document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Load the JSON config at `path`.
///
/// A missing file yields [`AppConfig`] defaults; every key is optional.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] when the file
/// exists but cannot be read or decoded.
pub fn load_app_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    AppConfig::from_json(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read-only key/value lookup used to resolve credentials.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// The live process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// Values parsed from a dotenv file, held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotenvValues {
    values: BTreeMap<String, String>,
}

impl DotenvValues {
    /// Parse the dotenv file at `path`. A missing file yields no values;
    /// lines that fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Dotenv`] if the file exists but cannot be opened.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no dotenv file");
            return Ok(Self::default());
        }

        // The only dotenv 0.15 reader that leaves the process environment untouched.
        #[allow(deprecated)]
        let iter = dotenv::from_path_iter(path).map_err(|e| ConfigError::Dotenv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut values = BTreeMap::new();
        for entry in iter {
            match entry {
                Ok((key, value)) => {
                    values.entry(key).or_insert(value);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping dotenv line: {e}");
                }
            }
        }
        Ok(Self { values })
    }

    #[must_use]
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for DotenvValues {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Ordered chain of sources; the first layer holding a key wins.
pub struct Layered<'a> {
    layers: Vec<&'a dyn EnvSource>,
}

impl<'a> Layered<'a> {
    #[must_use]
    pub fn new(layers: Vec<&'a dyn EnvSource>) -> Self {
        Self { layers }
    }
}

impl EnvSource for Layered<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}

/// Connection parameters for the Odoo server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub db: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("db", &self.db)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve all four credential keys from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] naming every absent key.
    pub fn resolve(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let [url, db, user, password] = CREDENTIAL_KEYS.map(|key| source.get(key));

        let missing: Vec<&'static str> = CREDENTIAL_KEYS
            .iter()
            .zip([&url, &db, &user, &password])
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| *key)
            .collect();

        match (url, db, user, password) {
            (Some(url), Some(db), Some(user), Some(password)) => Ok(Self {
                url: url.trim_end_matches('/').to_string(),
                db,
                user,
                password,
            }),
            _ => Err(ConfigError::MissingCredentials { missing }),
        }
    }

    /// Resolve credentials from the process environment layered over the
    /// dotenv file at `dotenv_path`.
    ///
    /// # Errors
    ///
    /// Propagates dotenv load failures and missing keys.
    pub fn from_env_and_dotenv(dotenv_path: &Path) -> Result<Self, ConfigError> {
        let dotenv = DotenvValues::load(dotenv_path)?;
        let chain = Layered::new(vec![&ProcessEnv, &dotenv]);
        Self::resolve(&chain)
    }
}
