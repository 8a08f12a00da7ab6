//! Test doubles for exercising the event loop and dispatch logic.
//!
//! [`ScriptedInput`] replays a canned transition sequence; [`RecordingModule`]
//! journals every hook invocation into a shared [`CallLog`] and can be
//! programmed to return a verdict at a chosen point. Both are used by the
//! framework's own test suites and are exported for input-module and module
//! authors to test against.

use crate::{Index, InputModule, Module, ModuleCore, ModuleError, Verdict};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use xana_env::{AliasMap, ConfigStore, Env, ExpNameFromConfig};
use xana_event::{Event, EventId, EventTime, TransitionKind};

/// Shared journal of `module-name:hook` entries in invocation order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Creates an empty call log.
#[must_use]
pub fn new_call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Builds a throwaway environment backed by its own config store.
#[must_use]
pub fn test_env() -> Env {
    test_env_with_store(Arc::new(ConfigStore::new()))
}

/// Builds a throwaway environment over the given store.
#[must_use]
pub fn test_env_with_store(store: Arc<ConfigStore>) -> Env {
    Env::new(
        "test-job",
        Box::new(ExpNameFromConfig::new("TST", "tst00")),
        "",
        store,
        AliasMap::new(),
        -1,
    )
}

/// Index double that records `set_run` calls.
struct TestIndex {
    runs: Vec<u32>,
    set_runs: Arc<Mutex<Vec<u32>>>,
}

impl Index for TestIndex {
    fn runs(&self) -> Result<Vec<u32>, ModuleError> {
        Ok(self.runs.clone())
    }

    fn run_times(&self) -> Result<Vec<EventTime>, ModuleError> {
        Ok(Vec::new())
    }

    fn jump(&mut self, _time: EventTime) -> Result<(), ModuleError> {
        Err(ModuleError::UnsupportedIndex)
    }

    fn set_run(&mut self, run: u32) -> Result<(), ModuleError> {
        self.set_runs.lock().push(run);
        Ok(())
    }

    fn end(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Input module replaying a fixed transition sequence.
///
/// Each poll pops the next kind; once the sequence is exhausted every poll
/// returns `Stop`. `DoEvent` transitions are stamped with an [`EventId`]
/// whose run number counts `BeginRun` transitions and whose fiducial counter
/// is the event ordinal.
pub struct ScriptedInput {
    name: String,
    transitions: VecDeque<TransitionKind>,
    log: Option<CallLog>,
    index: Option<TestIndex>,
    run: i32,
    seq: u32,
}

impl ScriptedInput {
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = TransitionKind>) -> Self {
        Self {
            name: "Test.ScriptedInput".into(),
            transitions: kinds.into_iter().collect(),
            log: None,
            index: None,
            run: 0,
            seq: 0,
        }
    }

    /// Journals `begin_job`/`end_job` into the shared log.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Exposes a random-access index publishing the given run list.
    ///
    /// Returns the input and a handle to the journal of `set_run` calls.
    #[must_use]
    pub fn with_index(mut self, runs: Vec<u32>) -> (Self, Arc<Mutex<Vec<u32>>>) {
        let set_runs = Arc::new(Mutex::new(Vec::new()));
        self.index = Some(TestIndex {
            runs,
            set_runs: Arc::clone(&set_runs),
        });
        (self, set_runs)
    }

    fn record(&self, hook: &str) {
        if let Some(log) = &self.log {
            log.lock().push(format!("input:{hook}"));
        }
    }
}

impl InputModule for ScriptedInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.record("begin_job");
        Ok(())
    }

    fn event(&mut self, evt: &mut Event, _env: &Env) -> Result<TransitionKind, ModuleError> {
        let kind = self.transitions.pop_front().unwrap_or(TransitionKind::Stop);
        match kind {
            TransitionKind::BeginRun => self.run += 1,
            TransitionKind::DoEvent => {
                self.seq += 1;
                evt.put(EventId::new(
                    EventTime::new(self.seq, 0),
                    self.run,
                    self.seq,
                ))
                .map_err(|e| ModuleError::other(e.to_string()))?;
            }
            _ => {}
        }
        Ok(kind)
    }

    fn end_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.record("end_job");
        Ok(())
    }

    fn index(&mut self) -> Option<&mut dyn Index> {
        self.index.as_mut().map(|i| i as &mut dyn Index)
    }

    fn supports_skip_events(&self) -> bool {
        true
    }
}

/// Module journaling every hook call, optionally returning planned verdicts.
///
/// Observations outlive the module (it is boxed into the data source) through
/// the shared [`CallLog`] and the dirty-entry flag, which records whether any
/// hook ever started with a verdict other than `Ok` — i.e. whether the
/// dispatcher failed to reset between calls.
pub struct RecordingModule {
    core: ModuleCore,
    log: CallLog,
    observe_all: bool,
    event_count: usize,
    event_plan: HashMap<usize, Verdict>,
    hook_plan: HashMap<&'static str, Verdict>,
    dirty_entry: Arc<AtomicBool>,
}

impl RecordingModule {
    #[must_use]
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            core: ModuleCore::with_store(name, Arc::new(ConfigStore::new())),
            log,
            observe_all: false,
            event_count: 0,
            event_plan: HashMap::new(),
            hook_plan: HashMap::new(),
            dirty_entry: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the module as interested in every event regardless of skips.
    #[must_use]
    pub fn observe_all(mut self) -> Self {
        self.observe_all = true;
        self
    }

    /// Returns the given verdict from the `n`-th `event` call (1-based).
    #[must_use]
    pub fn verdict_at_event(mut self, n: usize, verdict: Verdict) -> Self {
        self.event_plan.insert(n, verdict);
        self
    }

    /// Returns the given verdict from the named scope hook.
    #[must_use]
    pub fn verdict_at_hook(mut self, hook: &'static str, verdict: Verdict) -> Self {
        self.hook_plan.insert(hook, verdict);
        self
    }

    /// Handle to the flag raised when a hook starts with a stale verdict.
    #[must_use]
    pub fn dirty_entry_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dirty_entry)
    }

    fn enter(&mut self, hook: &'static str) {
        if self.core.verdict() != Verdict::Ok {
            self.dirty_entry.store(true, Ordering::SeqCst);
        }
        self.log
            .lock()
            .push(format!("{}:{hook}", self.core.name()));
        if let Some(verdict) = self.hook_plan.get(hook) {
            self.apply(*verdict);
        }
    }

    fn apply(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Ok => {}
            Verdict::Skip => self.core.skip(),
            Verdict::Stop => self.core.stop(),
            Verdict::Abort => self.core.abort(),
        }
    }
}

impl Module for RecordingModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn observe_all_events(&self) -> bool {
        self.observe_all
    }

    fn begin_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("begin_job");
        Ok(())
    }

    fn begin_run(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("begin_run");
        Ok(())
    }

    fn begin_calib_cycle(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("begin_calib_cycle");
        Ok(())
    }

    fn event(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("event");
        self.event_count += 1;
        if let Some(verdict) = self.event_plan.get(&self.event_count) {
            self.apply(*verdict);
        }
        Ok(())
    }

    fn end_calib_cycle(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("end_calib_cycle");
        Ok(())
    }

    fn end_run(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("end_run");
        Ok(())
    }

    fn end_job(&mut self, _evt: &mut Event, _env: &Env) -> Result<(), ModuleError> {
        self.enter("end_job");
        Ok(())
    }
}
