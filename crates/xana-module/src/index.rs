//! Random-access indexing interface for input modules.

use crate::ModuleError;
use xana_event::EventTime;

/// Random access over an indexed input.
///
/// Inputs that know their run list and event times up front expose this
/// through [`InputModule::index`](crate::InputModule::index); the run
/// iterator then pre-enumerates runs and drives [`set_run`](Index::set_run)
/// between them instead of scanning sequentially.
pub trait Index {
    /// Run numbers available in the input, in delivery order.
    fn runs(&self) -> Result<Vec<u32>, ModuleError>;

    /// Event timestamps of the current calibration cycle.
    fn run_times(&self) -> Result<Vec<EventTime>, ModuleError>;

    /// Repositions the stream to the event with the given timestamp.
    fn jump(&mut self, time: EventTime) -> Result<(), ModuleError>;

    /// Repositions the stream to the start of a run.
    fn set_run(&mut self, run: u32) -> Result<(), ModuleError>;

    /// Releases indexing resources once iteration is complete.
    fn end(&mut self) -> Result<(), ModuleError>;
}

/// Index implementation for inputs without random access.
///
/// Every method fails with [`ModuleError::UnsupportedIndex`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndex;

impl Index for NullIndex {
    fn runs(&self) -> Result<Vec<u32>, ModuleError> {
        Err(ModuleError::UnsupportedIndex)
    }

    fn run_times(&self) -> Result<Vec<EventTime>, ModuleError> {
        Err(ModuleError::UnsupportedIndex)
    }

    fn jump(&mut self, _time: EventTime) -> Result<(), ModuleError> {
        Err(ModuleError::UnsupportedIndex)
    }

    fn set_run(&mut self, _run: u32) -> Result<(), ModuleError> {
        Err(ModuleError::UnsupportedIndex)
    }

    fn end(&mut self) -> Result<(), ModuleError> {
        Err(ModuleError::UnsupportedIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_index_fails_everywhere() {
        let mut idx = NullIndex;
        assert!(matches!(idx.runs(), Err(ModuleError::UnsupportedIndex)));
        assert!(matches!(idx.run_times(), Err(ModuleError::UnsupportedIndex)));
        assert!(matches!(
            idx.jump(EventTime::new(0, 0)),
            Err(ModuleError::UnsupportedIndex)
        ));
        assert!(matches!(idx.set_run(1), Err(ModuleError::UnsupportedIndex)));
        assert!(matches!(idx.end(), Err(ModuleError::UnsupportedIndex)));
    }
}
