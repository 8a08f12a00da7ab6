//! Name resolution and configuration lookup for named framework objects.

use std::sync::Arc;
use xana_env::{ConfigError, ConfigStore};

/// A named object with class-level configuration fallback.
///
/// Display names have the form `Package.Class[:instance]`; the class name is
/// the display name with the `:instance` suffix stripped. Configuration for
/// key *k* is looked up first in the section named after the full display
/// name, then in the section named after the class, so several instances of
/// one class can share settings while overriding individually:
///
/// ```toml
/// ["Dump.Printer"]        # class defaults
/// lines = 10
///
/// ["Dump.Printer:brief"]  # instance override
/// lines = 1
/// ```
///
/// Lookup without a default fails with [`ConfigError::Missing`] when neither
/// section has the key.
#[derive(Debug, Clone)]
pub struct Configurable {
    name: String,
    class_name: String,
    store: Arc<ConfigStore>,
}

impl Configurable {
    /// Creates a configurable bound to the process-global config store.
    ///
    /// Module factories receive only a display name, so this is the
    /// constructor generated factories use; everything constructed by the
    /// framework itself goes through [`Configurable::with_store`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_store(name, ConfigStore::global())
    }

    /// Creates a configurable bound to an explicit config store.
    #[must_use]
    pub fn with_store(name: impl Into<String>, store: Arc<ConfigStore>) -> Self {
        let name = name.into();
        let class_name = name.split(':').next().unwrap_or(&name).to_owned();
        Self {
            name,
            class_name,
            store,
        }
    }

    /// Full display name including the instance suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class name: the display name without the `:instance` suffix.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The config store this object reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Typed scalar lookup with class fallback.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] when neither section has the key;
    /// [`ConfigError::Parse`] when the found value does not parse.
    pub fn config<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.store.get::<T>(&self.name, key) {
            Err(ConfigError::Missing { .. }) => self.store.get(&self.class_name, key),
            other => other,
        }
    }

    /// Typed scalar lookup with class fallback and a default.
    ///
    /// A present-but-malformed value still errors.
    pub fn config_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.config(key) {
            Err(ConfigError::Missing { .. }) => Ok(default),
            other => other,
        }
    }

    /// String lookup with class fallback.
    pub fn config_str(&self, key: &str) -> Result<String, ConfigError> {
        self.config(key)
    }

    /// String lookup with class fallback and a default.
    #[must_use]
    pub fn config_str_or(&self, key: &str, default: &str) -> String {
        self.config_str(key).unwrap_or_else(|_| default.to_owned())
    }

    /// List lookup with class fallback.
    pub fn config_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        match self.store.get_list(&self.name, key) {
            Err(ConfigError::Missing { .. }) => self.store.get_list(&self.class_name, key),
            other => other,
        }
    }

    /// List lookup with class fallback and a default.
    #[must_use]
    pub fn config_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        self.config_list(key)
            .unwrap_or_else(|_| default.iter().map(|s| (*s).to_owned()).collect())
    }
}
