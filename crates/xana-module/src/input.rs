//! The input-module contract.

use crate::{Index, ModuleError};
use xana_env::Env;
use xana_event::{Event, TransitionKind};

/// A source of the transition stream.
///
/// The event loop polls [`event`](InputModule::event) once per iteration; the
/// input fills the passed event container and reports where in the hierarchy
/// the stream is. The returned kinds must form properly nested
/// `BeginRun … EndRun` / `BeginCalibCycle … EndCalibCycle` brackets — if they
/// do not, the loop unwinds leniently to the level the new transition
/// implies.
///
/// `event` may block on I/O or on a shared-memory ring; the loop has no
/// timeout and relies on `Stop`/`Abort` for termination.
pub trait InputModule: Send {
    /// Full display name of the input module.
    fn name(&self) -> &str;

    /// Called once before the first poll.
    fn begin_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Produces the next transition, filling `evt` with its payload.
    fn event(&mut self, evt: &mut Event, env: &Env) -> Result<TransitionKind, ModuleError>;

    /// Called once after the stream ends, before the final unwind.
    fn end_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Random-access interface, when this input supports it.
    ///
    /// Inputs without an index return `None`; the iterators then fall back to
    /// sequential reading. [`NullIndex`](crate::NullIndex) is available for
    /// inputs that want every indexing call to fail loudly instead.
    fn index(&mut self) -> Option<&mut dyn Index> {
        None
    }

    /// Whether this input honors the `skip-events` configuration key.
    ///
    /// The builder logs a warning when `skip-events` is set and this returns
    /// `false`.
    fn supports_skip_events(&self) -> bool {
        false
    }
}

/// Signature of the factory symbol `_xana_input_module_<Class>` exported by
/// input-module packages.
pub type InputModuleFactory = fn(name: &str) -> Box<dyn InputModule>;

/// Exports the factory symbol for an input module.
///
/// The counterpart of [`declare_module!`](crate::declare_module) for input
/// modules; the type must provide `fn new(name: &str) -> Self`.
#[macro_export]
macro_rules! declare_input_module {
    ($module:ident) => {
        $crate::paste! {
            #[no_mangle]
            pub fn [<_xana_input_module_ $module>](name: &str) -> Box<dyn $crate::InputModule> {
                Box::new(<$module>::new(name))
            }
        }
    };
}
