//! Lazy pull iterators over the transition stream.
//!
//! Three adapters wrap one shared [`EventLoop`](crate::EventLoop):
//!
//! - [`RunIter`] yields a [`Run`] per `BeginRun`;
//! - [`StepIter`] yields a [`Step`] per `BeginCalibCycle`;
//! - [`EventIter`] yields the events themselves.
//!
//! Each scope object is a factory for the iterator one level down, carrying
//! the stop kind that terminates it: a `Step`'s events end at
//! `EndCalibCycle`, a `Run`'s steps and events end at `EndRun`. A stop
//! transition consumed by a `StepIter` is pushed back to the loop so the
//! enclosing `RunIter` still observes the run boundary — no transition is
//! ever dropped.

use crate::event_loop::SharedLoop;
use crate::Result;
use std::sync::Arc;
use xana_env::Env;
use xana_event::{Event, TransitionKind};

/// Iterator over events, bounded by an optional stop kind.
pub struct EventIter {
    shared: SharedLoop,
    stop_kind: Option<TransitionKind>,
    finished: bool,
}

impl EventIter {
    pub(crate) fn new(shared: SharedLoop, stop_kind: Option<TransitionKind>) -> Self {
        Self {
            shared,
            stop_kind,
            finished: false,
        }
    }

    /// Pulls the next event; scope transitions pass through silently.
    ///
    /// Returns `None` once the stream ends or the stop kind is reached.
    pub fn next(&mut self) -> Result<Option<Event>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            let Some((kind, evt)) = self.shared.lock().next()? else {
                self.finished = true;
                return Ok(None);
            };
            if Some(kind) == self.stop_kind {
                self.finished = true;
                return Ok(None);
            }
            if kind == TransitionKind::DoEvent {
                return Ok(Some(evt));
            }
        }
    }
}

/// One calibration cycle; iterate its events with [`Step::events`].
pub struct Step {
    shared: SharedLoop,
}

impl Step {
    pub(crate) fn new(shared: SharedLoop) -> Self {
        Self { shared }
    }

    /// Events of this step, ending at its `EndCalibCycle`.
    #[must_use]
    pub fn events(&self) -> EventIter {
        EventIter::new(
            Arc::clone(&self.shared),
            Some(TransitionKind::EndCalibCycle),
        )
    }

    #[must_use]
    pub fn env(&self) -> Arc<Env> {
        self.shared.lock().env()
    }
}

/// Iterator over steps, bounded by an optional stop kind.
pub struct StepIter {
    shared: SharedLoop,
    stop_kind: Option<TransitionKind>,
    finished: bool,
}

impl StepIter {
    pub(crate) fn new(shared: SharedLoop, stop_kind: Option<TransitionKind>) -> Self {
        Self {
            shared,
            stop_kind,
            finished: false,
        }
    }

    /// Pulls until the next `BeginCalibCycle`.
    ///
    /// A transition matching the stop kind is pushed back for the enclosing
    /// iterator and terminates this one.
    pub fn next(&mut self) -> Result<Option<Step>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            let Some((kind, evt)) = self.shared.lock().next()? else {
                self.finished = true;
                return Ok(None);
            };
            if Some(kind) == self.stop_kind {
                self.shared.lock().putback((kind, evt));
                self.finished = true;
                return Ok(None);
            }
            if kind == TransitionKind::BeginCalibCycle {
                return Ok(Some(Step::new(Arc::clone(&self.shared))));
            }
        }
    }
}

/// One run; iterate its steps or events.
pub struct Run {
    shared: SharedLoop,
}

impl Run {
    pub(crate) fn new(shared: SharedLoop) -> Self {
        Self { shared }
    }

    /// Steps of this run, ending at its `EndRun`.
    #[must_use]
    pub fn steps(&self) -> StepIter {
        StepIter::new(Arc::clone(&self.shared), Some(TransitionKind::EndRun))
    }

    /// Events of this run across all its steps, ending at its `EndRun`.
    #[must_use]
    pub fn events(&self) -> EventIter {
        EventIter::new(Arc::clone(&self.shared), Some(TransitionKind::EndRun))
    }

    #[must_use]
    pub fn env(&self) -> Arc<Env> {
        self.shared.lock().env()
    }
}

// Cursor over the run list of an indexed input.
enum IndexCursor {
    Unprobed,
    Sequential,
    Runs(Vec<u32>, usize),
}

/// Iterator over runs.
///
/// When the input provides a random-access index, the iterator
/// pre-enumerates the published run list and drives `set_run` before pulling
/// each run, emitting exactly one [`Run`] per entry.
pub struct RunIter {
    shared: SharedLoop,
    cursor: IndexCursor,
    finished: bool,
}

impl RunIter {
    pub(crate) fn new(shared: SharedLoop) -> Self {
        Self {
            shared,
            cursor: IndexCursor::Unprobed,
            finished: false,
        }
    }

    /// Pulls until the next `BeginRun`.
    pub fn next(&mut self) -> Result<Option<Run>> {
        Ok(self.advance()?.map(|(run, _)| run))
    }

    /// Like [`next`](RunIter::next), also returning the `BeginRun` event.
    pub fn next_with_event(&mut self) -> Result<Option<(Run, Event)>> {
        self.advance()
    }

    fn advance(&mut self) -> Result<Option<(Run, Event)>> {
        if self.finished {
            return Ok(None);
        }

        if matches!(self.cursor, IndexCursor::Unprobed) {
            self.cursor = match self.shared.lock().index_runs()? {
                Some(runs) => IndexCursor::Runs(runs, 0),
                None => IndexCursor::Sequential,
            };
        }

        if let IndexCursor::Runs(runs, pos) = &mut self.cursor {
            if *pos >= runs.len() {
                self.finished = true;
                return Ok(None);
            }
            let run = runs[*pos];
            *pos += 1;
            self.shared.lock().index_set_run(run)?;
        }

        loop {
            let Some((kind, evt)) = self.shared.lock().next()? else {
                self.finished = true;
                return Ok(None);
            };
            if kind == TransitionKind::BeginRun {
                return Ok(Some((Run::new(Arc::clone(&self.shared)), evt)));
            }
        }
    }
}
