//! Module printing a separator line between events.

use tracing::info;
use xana_env::Env;
use xana_event::Event;
use xana_module::{Module, ModuleCore, ModuleError};

/// Emits a separator line before every event, useful between verbose dump
/// modules.
///
/// Configuration (class section `xana.PrintSeparator`):
///
/// | Key | Default | Meaning |
/// |-----|---------|---------|
/// | `width` | `64` | Length of the line |
/// | `glyph` | `=` | Character the line repeats |
pub struct PrintSeparator {
    core: ModuleCore,
    line: Option<String>,
}

impl PrintSeparator {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            core: ModuleCore::new(name),
            line: None,
        }
    }
}

impl Module for PrintSeparator {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn begin_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        let width = self.core.configurable().config_or::<usize>("width", 64)?;
        let glyph = self.core.configurable().config_str_or("glyph", "=");
        self.line = Some(glyph.repeat(width.max(1) / glyph.len().max(1)));
        Ok(())
    }

    fn event(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        if let Some(line) = &self.line {
            info!("{line}");
        }
        Ok(())
    }
}
