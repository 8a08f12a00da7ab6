//! Transition and event types for the xana framework.
//!
//! This crate holds the vocabulary shared by every other layer:
//!
//! - [`TransitionKind`] — one step of the run / calib-cycle / event hierarchy
//! - [`Event`] — the typed key/value container handed through the module chain
//! - [`EventId`] / [`EventTime`] — per-shot identification stamped by inputs
//! - [`Src`] — detector source addresses used as event-key qualifiers
//!
//! # Hierarchy
//!
//! ```text
//! BeginRun
//!   BeginCalibCycle
//!     DoEvent ... DoEvent
//!   EndCalibCycle
//! EndRun
//! ```
//!
//! Input modules emit [`TransitionKind`] values forming properly nested
//! brackets; the event loop re-emits the first five kinds to iterators and
//! consumes the flow-control kinds (`Skip`, `Stop`, `Abort`) itself.

mod event;
mod event_id;
mod transition;

pub use event::{Event, EventError, EventKey, Src};
pub use event_id::{EventId, EventTime};
pub use transition::TransitionKind;
