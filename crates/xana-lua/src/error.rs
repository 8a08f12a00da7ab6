//! Lua host errors.

use thiserror::Error;

/// Failure while loading or constructing a Lua module.
///
/// Callback-time failures are reported as
/// [`ModuleError::Scripting`](xana_module::ModuleError::Scripting) instead,
/// since they happen inside the module contract.
#[derive(Debug, Error)]
pub enum LuaError {
    /// No script file found for the specifier.
    #[error("no Lua script for module {spec}; searched {searched:?}")]
    ScriptNotFound { spec: String, searched: Vec<String> },

    /// The script failed to evaluate or did not produce a constructor.
    #[error("failed to load Lua module {spec}: {reason}")]
    Load { spec: String, reason: String },

    /// The constructed instance lacks a required callback.
    #[error("Lua module {spec} does not define {callback}()")]
    MissingCallback { spec: String, callback: String },

    /// The instance defines a pre-rename callback name.
    ///
    /// Old scripts used flat lowercase hook names; these are rejected so a
    /// stale script fails loudly instead of silently never being called.
    #[error("Lua module {spec} defines legacy callback {found}(); rename it to {expected}()")]
    LegacyCallback {
        spec: String,
        found: String,
        expected: String,
    },

    /// Interpreter-level failure.
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let err = LuaError::MissingCallback {
            spec: "Scripts.Counter".into(),
            callback: "event".into(),
        };
        assert_eq!(
            err.to_string(),
            "Lua module Scripts.Counter does not define event()"
        );

        let err = LuaError::LegacyCallback {
            spec: "Scripts.Counter".into(),
            found: "beginjob".into(),
            expected: "begin_job".into(),
        };
        assert!(err.to_string().contains("legacy callback beginjob()"));
    }
}
