//! Errors raised from module callbacks.

use thiserror::Error;
use xana_env::ConfigError;

/// Failure of a module or input-module callback.
///
/// Verdicts handle flow control; this type is for hard failures that cannot
/// continue the job. All variants are fatal to the event loop.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A specifier does not match the `Package.Class[:instance]` grammar.
    #[error("invalid module name: {0}")]
    InvalidName(String),

    /// A scripted module's callback raised in its host language.
    #[error("scripted module callback failed: {0}")]
    Scripting(String),

    /// Random access requested from an input that does not provide it.
    #[error("random access is not supported by this input")]
    UnsupportedIndex,

    /// Configuration lookup failed inside a callback.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O failure while reading or producing data.
    #[error("module i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else a module wants to fail the job with.
    #[error("{0}")]
    Other(String),
}

impl ModuleError {
    /// Convenience constructor for ad-hoc failures.
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(
            ModuleError::Scripting("oops".into()).to_string(),
            "scripted module callback failed: oops"
        );
        assert_eq!(
            ModuleError::UnsupportedIndex.to_string(),
            "random access is not supported by this input"
        );
        assert_eq!(ModuleError::other("bad frame").to_string(), "bad frame");
    }

    #[test]
    fn config_error_converts() {
        let cfg = ConfigError::Missing {
            section: "m".into(),
            key: "k".into(),
        };
        let err: ModuleError = cfg.into();
        assert!(err.to_string().contains("missing configuration"));
    }
}
