//! Sectioned key/value configuration store.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::debug;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Lookup without a default found neither the section/key pair nor a
    /// fallback.
    #[error("missing configuration: [{section}] {key}")]
    Missing { section: String, key: String },

    /// A stored value could not be parsed as the requested type.
    #[error("invalid value for [{section}] {key}: {value:?} ({reason})")]
    Parse {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A top-level entry in the config file is not a table.
    #[error("config file entry [{0}] is not a section table")]
    BadSection(String),
}

static GLOBAL: OnceLock<Arc<ConfigStore>> = OnceLock::new();

/// Sectioned key/value store with typed accessors.
///
/// Values are stored as strings; typed accessors parse on read. List values
/// are whitespace-separated, matching the `modules = "Pkg.A Pkg.B"` form the
/// framework section uses. TOML arrays in a config file are joined the same
/// way on load.
///
/// The store is internally locked so the builder can publish values (input
/// lists, pipe descriptors) through a shared handle after construction.
///
/// # Example
///
/// ```
/// use xana_env::ConfigStore;
///
/// let cfg = ConfigStore::new();
/// cfg.put("xana", "parallel", "4");
/// assert_eq!(cfg.get::<u32>("xana", "parallel").unwrap(), 4);
/// assert!(cfg.get_str("xana", "no-such-key").is_err());
/// ```
#[derive(Debug, Default)]
pub struct ConfigStore {
    sections: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl ConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a TOML file of `[section] key = value` tables.
    ///
    /// Scalar values are stringified; arrays are joined with single spaces.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid TOML, or has a
    /// top-level entry that is not a table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let table: toml::Table = text.parse().map_err(|source| ConfigError::Toml {
            path: path.to_owned(),
            source,
        })?;

        let store = Self::new();
        {
            let mut sections = store.sections.write();
            for (name, value) in table {
                let toml::Value::Table(entries) = value else {
                    return Err(ConfigError::BadSection(name));
                };
                let section = sections.entry(name).or_default();
                for (key, value) in entries {
                    section.insert(key, stringify(&value));
                }
            }
        }
        debug!(path = %path.display(), "loaded configuration");
        Ok(store)
    }

    /// Installs a store as the process-global one, returning the installed
    /// handle.
    ///
    /// Only the first call installs; later calls return the already-installed
    /// store unchanged. The global slot exists for module factories, which
    /// receive nothing but a display name; framework code always threads an
    /// explicit store.
    pub fn init_global(store: Arc<ConfigStore>) -> Arc<ConfigStore> {
        GLOBAL.get_or_init(|| store).clone()
    }

    /// Returns the process-global store, installing an empty one if none was
    /// set.
    pub fn global() -> Arc<ConfigStore> {
        GLOBAL.get_or_init(|| Arc::new(ConfigStore::new())).clone()
    }

    /// Sets a value, replacing any previous one.
    pub fn put(&self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .write()
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), value.into());
    }

    /// Removes a key; returns the previous value if any.
    pub fn remove(&self, section: &str, key: &str) -> Option<String> {
        self.sections.write().get_mut(section)?.remove(key)
    }

    /// Raw string lookup.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] when the key is absent.
    pub fn get_str(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.sections
            .read()
            .get(section)
            .and_then(|s| s.get(key))
            .cloned()
            .ok_or_else(|| ConfigError::Missing {
                section: section.to_owned(),
                key: key.to_owned(),
            })
    }

    /// Raw string lookup with a default.
    #[must_use]
    pub fn get_str_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get_str(section, key).unwrap_or_else(|_| default.to_owned())
    }

    /// Typed lookup.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] when the key is absent,
    /// [`ConfigError::Parse`] when the value does not parse as `T`.
    pub fn get<T>(&self, section: &str, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.get_str(section, key)?;
        value.parse().map_err(|e: T::Err| ConfigError::Parse {
            section: section.to_owned(),
            key: key.to_owned(),
            value,
            reason: e.to_string(),
        })
    }

    /// Typed lookup returning a default when the key is absent.
    ///
    /// A present-but-malformed value is still an error; silently swallowing
    /// typos behind defaults hides misconfiguration.
    pub fn get_or<T>(&self, section: &str, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_str(section, key) {
            Ok(_) => self.get(section, key),
            Err(_) => Ok(default),
        }
    }

    /// List lookup: the stored string split on whitespace.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] when the key is absent.
    pub fn get_list(&self, section: &str, key: &str) -> Result<Vec<String>, ConfigError> {
        Ok(split_list(&self.get_str(section, key)?))
    }

    /// List lookup with a default used when the key is absent.
    #[must_use]
    pub fn get_list_or(&self, section: &str, key: &str, default: &[&str]) -> Vec<String> {
        match self.get_str(section, key) {
            Ok(value) => split_list(&value),
            Err(_) => default.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// All keys of a section, sorted.
    #[must_use]
    pub fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .sections
            .read()
            .get(section)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Returns `true` if the section has at least one key.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections
            .read()
            .get(section)
            .is_some_and(|s| !s.is_empty())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_owned).collect()
}

fn stringify(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(stringify)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}
