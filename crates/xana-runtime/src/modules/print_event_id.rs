//! Module printing the identity of every event.

use tracing::{info, warn};
use xana_env::Env;
use xana_event::{Event, EventId};
use xana_module::{Module, ModuleCore, ModuleError};

/// Logs the [`EventId`] of each event and a summary at the end of the job.
pub struct PrintEventId {
    core: ModuleCore,
    count: u64,
}

impl PrintEventId {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            core: ModuleCore::new(name),
            count: 0,
        }
    }
}

impl Module for PrintEventId {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn begin_job(&mut self, _evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        info!(
            module = self.core.name(),
            job = env.job_name(),
            experiment = env.experiment(),
            "starting job"
        );
        Ok(())
    }

    fn event(&mut self, evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.count += 1;
        match evt.get::<EventId>() {
            Some(id) => info!(module = self.core.name(), id = %id, "event"),
            None => warn!(module = self.core.name(), "event carries no id"),
        }
        Ok(())
    }

    fn end_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        info!(module = self.core.name(), events = self.count, "job finished");
        Ok(())
    }
}
