//! The user-module capability interface.

use crate::{Configurable, ModuleError};
use std::sync::Arc;
use xana_env::{ConfigStore, Env};
use xana_event::Event;

/// Per-call flow-control verdict written by a module.
///
/// Cleared to `Ok` by the dispatcher before every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Continue normally.
    #[default]
    Ok,
    /// Suppress the `event` hook of later non-observe-all modules for this
    /// event. Has no effect on scope transitions.
    Skip,
    /// Finish with the events: close open scopes, run `end_job`, terminate.
    Stop,
    /// Terminate immediately without finalization.
    Abort,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Abort => "abort",
        };
        f.write_str(name)
    }
}

/// State every module carries: its configurable identity and the verdict
/// cell.
///
/// Embed one in each module implementation and hand it out through
/// [`Module::core`] / [`Module::core_mut`]; the trait's provided methods
/// (name, reset, verdict) delegate here. Hooks request flow control by
/// calling [`skip`](ModuleCore::skip), [`stop`](ModuleCore::stop) or
/// [`abort`](ModuleCore::abort) on it.
#[derive(Debug, Clone)]
pub struct ModuleCore {
    cfg: Configurable,
    verdict: Verdict,
}

impl ModuleCore {
    /// Creates a core bound to the process-global config store.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            cfg: Configurable::new(name),
            verdict: Verdict::Ok,
        }
    }

    /// Creates a core bound to an explicit config store.
    #[must_use]
    pub fn with_store(name: impl Into<String>, store: Arc<ConfigStore>) -> Self {
        Self {
            cfg: Configurable::with_store(name, store),
            verdict: Verdict::Ok,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.cfg.name()
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        self.cfg.class_name()
    }

    /// Configuration accessors with class-level fallback.
    #[must_use]
    pub fn configurable(&self) -> &Configurable {
        &self.cfg
    }

    /// Request that later ordinary modules skip this event.
    pub fn skip(&mut self) {
        self.verdict = Verdict::Skip;
    }

    /// Request a clean finish of the job.
    pub fn stop(&mut self) {
        self.verdict = Verdict::Stop;
    }

    /// Request immediate termination without finalization.
    pub fn abort(&mut self) {
        self.verdict = Verdict::Abort;
    }

    /// Clears the verdict back to `Ok`; called by the dispatcher before every
    /// hook invocation.
    pub fn reset(&mut self) {
        self.verdict = Verdict::Ok;
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }
}

/// A user analysis module.
///
/// Only [`event`](Module::event) is required; every scope hook defaults to a
/// no-op. Hooks are invoked in registration order at each hierarchy boundary:
///
/// ```text
/// begin_job
///   begin_run
///     begin_calib_cycle
///       event ... event
///     end_calib_cycle
///   end_run
/// end_job
/// ```
///
/// `begin_job`/`end_job` run exactly once per data source, both in
/// registration order. Returned errors are fatal to the job; use the verdict
/// setters on [`ModuleCore`] for flow control instead.
pub trait Module: Send {
    /// Shared module state; the provided methods delegate to it.
    fn core(&self) -> &ModuleCore;

    /// Mutable access to the shared module state.
    fn core_mut(&mut self) -> &mut ModuleCore;

    /// Full display name, `Class[:instance]` with package prefix.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Display name without the instance suffix.
    fn class_name(&self) -> &str {
        self.core().class_name()
    }

    /// Clears the verdict; the dispatcher calls this before every hook.
    fn reset(&mut self) {
        self.core_mut().reset();
    }

    /// Verdict written by the most recent hook invocation.
    fn verdict(&self) -> Verdict {
        self.core().verdict()
    }

    /// Whether this module's `event` hook runs even after an earlier module
    /// requested skip for the event.
    fn observe_all_events(&self) -> bool {
        false
    }

    fn begin_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    fn begin_run(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    fn begin_calib_cycle(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called once per event, in registration order, subject to skip
    /// semantics.
    fn event(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError>;

    fn end_calib_cycle(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    fn end_run(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    fn end_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("name", &self.name()).finish()
    }
}

/// Signature of the factory symbol `_xana_module_<Class>` exported by module
/// packages.
pub type ModuleFactory = fn(name: &str) -> Box<dyn Module>;

/// Exports the factory symbol for a user module.
///
/// The module type must provide `fn new(name: &str) -> Self`. Expands to a
/// `#[no_mangle]` function named `_xana_module_<Class>` that the dynamic
/// loader resolves from the package library:
///
/// ```ignore
/// pub struct Filter { core: ModuleCore }
/// impl Filter { pub fn new(name: &str) -> Self { /* ... */ } }
/// impl Module for Filter { /* ... */ }
///
/// declare_module!(Filter);
/// ```
#[macro_export]
macro_rules! declare_module {
    ($module:ident) => {
        $crate::paste! {
            #[no_mangle]
            pub fn [<_xana_module_ $module>](name: &str) -> Box<dyn $crate::Module> {
                Box::new(<$module>::new(name))
            }
        }
    };
}
