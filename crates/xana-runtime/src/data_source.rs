//! The object tying input, modules and environment together.

use crate::event_loop::{EventLoop, SharedLoop};
use crate::iter::{EventIter, RunIter, StepIter};
use crate::GenericLoader;
use std::sync::Arc;
use xana_env::Env;
use xana_module::{InputModule, Module};

/// A configured data source.
///
/// Holds the (input, modules, env) triple wired into one [`EventLoop`] and
/// lazily hands out the three nested iterators. All iterators share the same
/// loop: pulling from any of them advances the single underlying stream.
pub struct DataSource {
    shared: SharedLoop,
    env: Arc<Env>,
    // Keeps the package libraries of dynamically loaded modules alive for as
    // long as their instances are.
    _loader: Option<GenericLoader>,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource").finish_non_exhaustive()
    }
}

impl DataSource {
    /// Wires a data source from its parts.
    ///
    /// Most callers go through
    /// [`Framework::data_source`](crate::Framework::data_source); this
    /// constructor is the direct path used with hand-built inputs, e.g. in
    /// tests.
    #[must_use]
    pub fn new(input: Box<dyn InputModule>, modules: Vec<Box<dyn Module>>, env: Arc<Env>) -> Self {
        let shared = EventLoop::new(input, modules, Arc::clone(&env)).into_shared();
        Self {
            shared,
            env,
            _loader: None,
        }
    }

    pub(crate) fn with_loader(
        input: Box<dyn InputModule>,
        modules: Vec<Box<dyn Module>>,
        env: Arc<Env>,
        loader: GenericLoader,
    ) -> Self {
        let mut ds = Self::new(input, modules, env);
        ds._loader = Some(loader);
        ds
    }

    /// Iterator over all runs.
    #[must_use]
    pub fn runs(&self) -> RunIter {
        RunIter::new(Arc::clone(&self.shared))
    }

    /// Iterator over all steps, crossing run boundaries silently.
    #[must_use]
    pub fn steps(&self) -> StepIter {
        StepIter::new(Arc::clone(&self.shared), None)
    }

    /// Iterator over all events, crossing scope boundaries silently.
    #[must_use]
    pub fn events(&self) -> EventIter {
        EventIter::new(Arc::clone(&self.shared), None)
    }

    #[must_use]
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }
}
