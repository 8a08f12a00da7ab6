//! Lua module host.
//!
//! User modules can be written in Lua instead of compiled into a package
//! library. A script defines a constructor receiving the module's
//! configuration and returns an instance table of callbacks:
//!
//! ```lua
//! return function(config)
//!     local count = 0
//!     return {
//!         event = function(self, info)
//!             count = count + 1
//!             if count > tonumber(config.limit or "0") and config.limit then
//!                 return "stop"
//!             end
//!         end,
//!
//!         end_job = function(self, info)
//!             print("saw " .. count .. " events")
//!         end,
//!     }
//! end
//! ```
//!
//! Only `event` is required; the other hooks (`begin_job`, `begin_run`,
//! `begin_calib_cycle`, `end_calib_cycle`, `end_run`, `end_job`) are looked
//! up per invocation and silently skipped when absent. A callback's return
//! value steers the event loop: `nil`/`"ok"` continue, `"skip"`, `"stop"`
//! and `"abort"` map to the corresponding verdicts. Any Lua error is fatal
//! to the job.
//!
//! Each loaded module owns its own interpreter, held behind a mutex with
//! callbacks referenced through the Lua registry.

mod error;
mod loader;
mod module;

pub use error::LuaError;
pub use loader::LuaLoader;
pub use module::LuaModule;
