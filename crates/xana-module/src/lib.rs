//! Module and input-module contracts.
//!
//! Analysis code plugs into the framework as *modules*: named units invoked
//! at every hierarchy boundary of the transition stream. This crate defines
//! the capability interface both for user modules ([`Module`]) and for the
//! sources that produce the stream ([`InputModule`]), plus the configuration
//! lookup shared by everything that has a name ([`Configurable`]).
//!
//! # Flow control
//!
//! Modules steer the event loop through a per-call [`Verdict`] written on
//! their [`ModuleCore`]:
//!
//! | Verdict | Effect |
//! |---------|--------|
//! | `Ok` | Continue normally |
//! | `Skip` | Suppress `event` on later non-observe-all modules for this event |
//! | `Stop` | Finish the job cleanly after closing open scopes |
//! | `Abort` | Terminate immediately without finalization |
//!
//! The dispatcher resets the verdict to `Ok` before every invocation, so a
//! verdict never leaks from one call into the next.
//!
//! # Example
//!
//! ```
//! use xana_env::Env;
//! use xana_event::Event;
//! use xana_module::{Module, ModuleCore, ModuleError};
//!
//! struct HitFilter {
//!     core: ModuleCore,
//!     threshold: f64,
//! }
//!
//! impl HitFilter {
//!     fn new(name: &str) -> Self {
//!         Self { core: ModuleCore::new(name), threshold: 0.5 }
//!     }
//! }
//!
//! impl Module for HitFilter {
//!     fn core(&self) -> &ModuleCore { &self.core }
//!     fn core_mut(&mut self) -> &mut ModuleCore { &mut self.core }
//!
//!     fn event(&mut self, evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
//!         match evt.get::<f64>() {
//!             Some(amplitude) if *amplitude >= self.threshold => Ok(()),
//!             _ => {
//!                 self.core.skip();
//!                 Ok(())
//!             }
//!         }
//!     }
//! }
//! ```

mod configurable;
mod error;
mod index;
mod input;
mod module;
mod spec;
pub mod testing;

pub use configurable::Configurable;
pub use error::ModuleError;
pub use index::{Index, NullIndex};
pub use input::{InputModule, InputModuleFactory};
pub use module::{Module, ModuleCore, ModuleFactory, Verdict};
pub use spec::{ModuleSpec, DEFAULT_PACKAGE};

// Re-exported for the factory macros.
#[doc(hidden)]
pub use paste::paste;
