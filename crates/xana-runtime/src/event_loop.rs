//! The dispatcher state machine.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use xana_env::Env;
use xana_event::{Event, TransitionKind};
use xana_module::{Module, ModuleError, Verdict};

/// One delivered transition: its kind and the event that went through the
/// module chain for it.
pub type Transition = (TransitionKind, Event);

/// The event-loop handle shared between a data source and its iterators.
pub type SharedLoop = Arc<Mutex<EventLoop>>;

/// How deep into the hierarchy the loop has entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LoopState {
    None,
    Configured,
    Running,
    Scanning,
}

impl LoopState {
    fn down(self) -> Self {
        match self {
            Self::Scanning => Self::Running,
            Self::Running => Self::Configured,
            Self::Configured | Self::None => Self::None,
        }
    }

    /// Transition kind delivered when this state is entered.
    fn open_kind(self) -> Option<TransitionKind> {
        match self {
            Self::Running => Some(TransitionKind::BeginRun),
            Self::Scanning => Some(TransitionKind::BeginCalibCycle),
            Self::Configured | Self::None => None,
        }
    }

    /// Transition kind delivered when this state is closed.
    fn close_kind(self) -> Option<TransitionKind> {
        match self {
            Self::Running => Some(TransitionKind::EndRun),
            Self::Scanning => Some(TransitionKind::EndCalibCycle),
            Self::Configured | Self::None => None,
        }
    }
}

/// Module hook selected for one chain dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    BeginJob,
    BeginRun,
    BeginCalibCycle,
    Event,
    EndCalibCycle,
    EndRun,
    EndJob,
}

impl Hook {
    fn open_for(state: LoopState) -> Self {
        match state {
            LoopState::Configured => Self::BeginJob,
            LoopState::Running => Self::BeginRun,
            LoopState::Scanning => Self::BeginCalibCycle,
            LoopState::None => unreachable!("no hook opens the idle state"),
        }
    }

    fn close_for(state: LoopState) -> Self {
        match state {
            LoopState::Configured => Self::EndJob,
            LoopState::Running => Self::EndRun,
            LoopState::Scanning => Self::EndCalibCycle,
            LoopState::None => unreachable!("no hook closes the idle state"),
        }
    }
}

fn invoke(
    module: &mut dyn Module,
    hook: Hook,
    evt: &mut Event,
    env: &Env,
) -> std::result::Result<(), ModuleError> {
    match hook {
        Hook::BeginJob => module.begin_job(evt, env),
        Hook::BeginRun => module.begin_run(evt, env),
        Hook::BeginCalibCycle => module.begin_calib_cycle(evt, env),
        Hook::Event => module.event(evt, env),
        Hook::EndCalibCycle => module.end_calib_cycle(evt, env),
        Hook::EndRun => module.end_run(evt, env),
        Hook::EndJob => module.end_job(evt, env),
    }
}

/// The core dispatcher.
///
/// Each [`next`](EventLoop::next) call advances the input by at least one
/// transition, dispatches it through the module chain, and returns the first
/// pending `(kind, event)` pair — or `None` once the stream is exhausted and
/// the shutdown unwind has run.
///
/// The loop maintains strict nesting: a transition that implies leaving one
/// or more levels first closes the still-open inner scopes (emitting their
/// paired closing transitions), and a transition that implies skipped levels
/// enters the missing intermediate states. An input that violates nesting is
/// therefore handled leniently rather than rejected.
pub struct EventLoop {
    input: Box<dyn xana_module::InputModule>,
    modules: Vec<Box<dyn Module>>,
    env: Arc<Env>,
    state: LoopState,
    queue: VecDeque<Transition>,
    putback_armed: bool,
    stopping: bool,
    finished: bool,
}

impl EventLoop {
    #[must_use]
    pub fn new(
        input: Box<dyn xana_module::InputModule>,
        modules: Vec<Box<dyn Module>>,
        env: Arc<Env>,
    ) -> Self {
        Self {
            input,
            modules,
            env,
            state: LoopState::None,
            queue: VecDeque::new(),
            putback_armed: false,
            stopping: false,
            finished: false,
        }
    }

    /// Wraps the loop for sharing between a data source and its iterators.
    #[must_use]
    pub fn into_shared(self) -> SharedLoop {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn env(&self) -> Arc<Env> {
        Arc::clone(&self.env)
    }

    /// Returns `true` once the stream is exhausted and finalized.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished && self.queue.is_empty()
    }

    /// Run list from the input's index, when it has one.
    pub fn index_runs(&mut self) -> Result<Option<Vec<u32>>> {
        match self.input.index() {
            None => Ok(None),
            Some(index) => Ok(Some(index.runs().map_err(Error::from)?)),
        }
    }

    /// Repositions an indexed input to the start of a run.
    pub fn index_set_run(&mut self, run: u32) -> Result<()> {
        match self.input.index() {
            None => Err(ModuleError::UnsupportedIndex.into()),
            Some(index) => {
                index.set_run(run)?;
                Ok(())
            }
        }
    }

    /// Returns an over-consumed transition to the stream.
    ///
    /// Iterators use this when the transition they pulled terminates their
    /// own level but belongs to the enclosing one. The slot is depth one: a
    /// second putback without an intervening [`next`](EventLoop::next) is an
    /// iterator bug and asserts.
    pub fn putback(&mut self, transition: Transition) {
        assert!(
            !self.putback_armed,
            "pushback slot already holds an unread transition"
        );
        self.putback_armed = true;
        self.queue.push_front(transition);
    }

    /// Advances the loop by one transition.
    ///
    /// # Errors
    ///
    /// [`Error::Abort`] when the input or a module requests abort, or any
    /// error a callback returns. After an abort no further hooks run.
    pub fn next(&mut self) -> Result<Option<Transition>> {
        self.putback_armed = false;

        if self.finished {
            return Ok(self.queue.pop_front());
        }

        if self.state == LoopState::None {
            let mut evt = Event::new();
            self.input.begin_job(&mut evt, &self.env)?;
            match self.new_state(LoopState::Configured, evt)? {
                Verdict::Abort => {
                    self.finished = true;
                    return Err(Error::Abort("module requested abort in begin_job".into()));
                }
                Verdict::Stop => self.stopping = true,
                _ => {}
            }
        }

        while !self.stopping && self.queue.is_empty() {
            let mut evt = Event::new();
            let istat = self.input.event(&mut evt, &self.env)?;
            trace!(status = %istat, "input transition");

            match istat {
                TransitionKind::Skip => continue,
                TransitionKind::Stop => break,
                TransitionKind::Abort => {
                    info!("input module requested abort");
                    self.finished = true;
                    return Err(Error::Abort("input module requested abort".into()));
                }
                TransitionKind::DoEvent => match self.call_chain(Hook::Event, &mut evt, false)? {
                    Verdict::Abort => {
                        self.finished = true;
                        return Err(Error::Abort("user module requested abort".into()));
                    }
                    Verdict::Stop => {
                        self.stopping = true;
                        break;
                    }
                    _ => self.queue.push_back((TransitionKind::DoEvent, evt)),
                },
                scope => {
                    let (unwind_to, new_state) = match scope {
                        TransitionKind::BeginRun => {
                            (LoopState::Configured, Some(LoopState::Running))
                        }
                        TransitionKind::BeginCalibCycle => {
                            (LoopState::Running, Some(LoopState::Scanning))
                        }
                        TransitionKind::EndCalibCycle => (LoopState::Running, None),
                        TransitionKind::EndRun => (LoopState::Configured, None),
                        _ => unreachable!("flow-control kinds are handled above"),
                    };

                    // The input's event goes with the level its transition
                    // names: the last close for end transitions, the opened
                    // state for begin transitions.
                    let (closing_evt, opening_evt) = if new_state.is_some() {
                        (None, Some(evt))
                    } else {
                        (Some(evt), None)
                    };

                    match self.unwind(unwind_to, closing_evt, false)? {
                        Verdict::Abort => {
                            self.finished = true;
                            return Err(Error::Abort("user module requested abort".into()));
                        }
                        Verdict::Stop => {
                            self.stopping = true;
                            break;
                        }
                        _ => {}
                    }

                    if let Some(state) = new_state {
                        match self.new_state(state, opening_evt.unwrap_or_default())? {
                            Verdict::Abort => {
                                self.finished = true;
                                return Err(Error::Abort("user module requested abort".into()));
                            }
                            Verdict::Stop => {
                                self.stopping = true;
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        if self.stopping || self.queue.is_empty() {
            self.finalize()?;
        }

        Ok(self.queue.pop_front())
    }

    // Input exhausted or a stop latched: run the shutdown unwind with
    // verdicts ignored and mark the loop terminated.
    fn finalize(&mut self) -> Result<()> {
        self.finished = true;
        let mut evt = Event::new();
        self.input.end_job(&mut evt, &self.env)?;
        self.unwind(LoopState::None, None, true)?;
        Ok(())
    }

    // Closes states until `to` is reached. `last_evt`, when given, is used
    // for the final close; inner levels get fresh events.
    fn unwind(
        &mut self,
        to: LoopState,
        mut last_evt: Option<Event>,
        ignore_status: bool,
    ) -> Result<Verdict> {
        while self.state > to {
            let final_close = self.state.down() == to;
            let evt = if final_close {
                last_evt.take().unwrap_or_default()
            } else {
                Event::new()
            };
            let stat = self.close_state(evt)?;
            if !ignore_status && stat != Verdict::Ok {
                return Ok(stat);
            }
        }
        Ok(Verdict::Ok)
    }

    fn close_state(&mut self, mut evt: Event) -> Result<Verdict> {
        trace!(state = ?self.state, "closing state");
        let stat = self.call_chain(Hook::close_for(self.state), &mut evt, true)?;
        if stat == Verdict::Ok {
            if let Some(kind) = self.state.close_kind() {
                self.queue.push_back((kind, evt));
            }
        }
        self.state = self.state.down();
        Ok(stat)
    }

    fn new_state(&mut self, state: LoopState, mut evt: Event) -> Result<Verdict> {
        trace!(state = ?state, "entering state");

        // Enter any missing intermediate state first, with its own event.
        if self.state < state.down() {
            let stat = self.new_state(state.down(), Event::new())?;
            if stat != Verdict::Ok {
                return Ok(stat);
            }
        }

        self.state = state;
        let stat = self.call_chain(Hook::open_for(state), &mut evt, true)?;
        if stat == Verdict::Ok {
            if let Some(kind) = state.open_kind() {
                self.queue.push_back((kind, evt));
            }
        }
        Ok(stat)
    }

    // Dispatches one hook over the module chain.
    //
    // Scope hooks run in status-ignoring mode (`ignore_skip`): every module
    // is called, skip verdicts are dropped, stop is latched into the
    // aggregate but iteration continues, abort breaks immediately. The event
    // hook runs in skip-respecting mode: once a module skips, later modules
    // are called only if they observe all events, and the event is marked.
    fn call_chain(&mut self, hook: Hook, evt: &mut Event, ignore_skip: bool) -> Result<Verdict> {
        let env = Arc::clone(&self.env);
        let mut stat = Verdict::Ok;

        if ignore_skip {
            for module in self.modules.iter_mut() {
                module.reset();
                invoke(module.as_mut(), hook, evt, &env)?;
                match module.verdict() {
                    Verdict::Ok => {}
                    Verdict::Skip => {
                        trace!(module = module.name(), "skip verdict ignored for scope hook");
                    }
                    Verdict::Stop => {
                        info!(module = module.name(), "module requested stop");
                        stat = Verdict::Stop;
                    }
                    Verdict::Abort => {
                        info!(module = module.name(), "module requested abort");
                        stat = Verdict::Abort;
                        break;
                    }
                }
            }
        } else {
            for module in self.modules.iter_mut() {
                module.reset();
                if stat == Verdict::Ok || module.observe_all_events() {
                    invoke(module.as_mut(), hook, evt, &env)?;
                }
                match module.verdict() {
                    Verdict::Ok => {}
                    Verdict::Skip => {
                        trace!(module = module.name(), "module requested skip");
                        if stat == Verdict::Ok {
                            stat = Verdict::Skip;
                        }
                        evt.mark_skipped();
                    }
                    Verdict::Stop => {
                        info!(module = module.name(), "module requested stop");
                        stat = Verdict::Stop;
                        break;
                    }
                    Verdict::Abort => {
                        info!(module = module.name(), "module requested abort");
                        stat = Verdict::Abort;
                        break;
                    }
                }
            }
        }

        Ok(stat)
    }
}

impl Drop for EventLoop {
    // Close all still-open scopes so modules see their end hooks on every
    // exit path, including an abandoned iterator.
    fn drop(&mut self) {
        if self.finished || self.state == LoopState::None {
            return;
        }
        debug!("event loop dropped mid-stream; closing open scopes");
        let mut evt = Event::new();
        if let Err(e) = self.input.end_job(&mut evt, &self.env) {
            warn!(error = %e, "input end_job failed during loop teardown");
        }
        if let Err(e) = self.unwind(LoopState::None, None, true) {
            warn!(error = %e, "module end hooks failed during loop teardown");
        }
        self.finished = true;
    }
}
