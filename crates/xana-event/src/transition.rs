//! Transition kinds emitted by input modules.

use serde::{Deserialize, Serialize};

/// One unit of the transition stream produced by an input module.
///
/// The first five variants denote positions in the run / calib-cycle / event
/// hierarchy and are re-emitted by the event loop. The last three are
/// flow-control verdicts consumed by the loop itself:
///
/// | Kind | Effect on the loop |
/// |------|--------------------|
/// | `Skip` | Drop the transition, poll the input again |
/// | `Stop` | Finish cleanly: close open scopes, run `end_job` |
/// | `Abort` | Fatal: raise without running closing hooks |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Opens the outermost hierarchy level.
    BeginRun,
    /// Opens a calibration cycle within a run.
    BeginCalibCycle,
    /// One event carrying per-shot detector data.
    DoEvent,
    /// Closes the current calibration cycle.
    EndCalibCycle,
    /// Closes the current run.
    EndRun,
    /// Input has nothing for this poll; not delivered downstream.
    Skip,
    /// Input is exhausted or was asked to finish.
    Stop,
    /// Input requests immediate termination without finalization.
    Abort,
}

impl TransitionKind {
    /// Returns `true` for the kinds that open or close a hierarchy scope.
    #[must_use]
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            Self::BeginRun | Self::BeginCalibCycle | Self::EndCalibCycle | Self::EndRun
        )
    }

    /// Returns `true` for the flow-control kinds never delivered to iterators.
    #[must_use]
    pub fn is_flow_control(&self) -> bool {
        matches!(self, Self::Skip | Self::Stop | Self::Abort)
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BeginRun => "begin-run",
            Self::BeginCalibCycle => "begin-calib-cycle",
            Self::DoEvent => "event",
            Self::EndCalibCycle => "end-calib-cycle",
            Self::EndRun => "end-run",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Abort => "abort",
        };
        f.write_str(name)
    }
}
