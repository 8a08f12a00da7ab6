//! Module dumping the keys stored in each event.

use tracing::info;
use xana_env::Env;
use xana_event::Event;
use xana_module::{Module, ModuleCore, ModuleError};

/// Logs every key present in the event container after the preceding
/// modules ran, including the skip marker state.
pub struct EventKeys {
    core: ModuleCore,
}

impl EventKeys {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            core: ModuleCore::new(name),
        }
    }
}

impl Module for EventKeys {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    // keys of skipped events are as interesting as any
    fn observe_all_events(&self) -> bool {
        true
    }

    fn event(&mut self, evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        info!(
            module = self.core.name(),
            keys = evt.len(),
            skipped = evt.is_skipped(),
            "event keys"
        );
        for key in evt.keys() {
            info!(module = self.core.name(), "  {key}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xana_module::testing::test_env;

    #[test]
    fn observes_all_events() {
        let m = EventKeys::new("xana.EventKeys");
        assert!(m.observe_all_events());
    }

    #[test]
    fn tolerates_empty_events() {
        let mut m = EventKeys::new("xana.EventKeys");
        let env = test_env();
        let mut evt = Event::new();
        m.event(&mut evt, &env).unwrap();
    }
}
