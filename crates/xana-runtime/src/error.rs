//! Runtime error taxonomy.

use thiserror::Error;
use xana_env::ConfigError;
use xana_lua::LuaError;
use xana_module::ModuleError;

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the event loop, loaders and builder.
///
/// All of these are non-recoverable: they bubble to the driver, which logs
/// the reason and exits non-zero. A `Stop` verdict is never an error — it
/// drives the loop into its shutdown unwind instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A package library could not be loaded; carries the linker diagnostic.
    #[error("failed to load dynamic library {lib}: {source}")]
    LibraryLoad {
        lib: String,
        #[source]
        source: libloading::Error,
    },

    /// The factory symbol is not present in the package library.
    #[error("failed to locate symbol {symbol} in {lib}")]
    SymbolNotFound { symbol: String, lib: String },

    /// A module or the input requested immediate termination.
    #[error("abort requested: {0}")]
    Abort(String),

    /// An OS call failed; carries the errno description.
    #[error("{call} failed: {source}")]
    Os {
        call: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// More workers requested than the topology supports.
    #[error("too many workers requested: {0} (max {max})", max = crate::mp::MAX_WORKERS)]
    TooManyWorkers(u32),

    /// Neither the command line nor the configuration names any input.
    #[error("no input data specified")]
    NoInput,

    /// The input list mixes incompatible data types.
    #[error("mixed input data types: {0} and {1}")]
    MixedInput(String, String),

    /// Failure inside a module callback (invalid names included).
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Lua module loading failure.
    #[error(transparent)]
    Lua(#[from] LuaError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn os(call: &'static str) -> Self {
        Self::Os {
            call,
            source: std::io::Error::last_os_error(),
        }
    }
}
