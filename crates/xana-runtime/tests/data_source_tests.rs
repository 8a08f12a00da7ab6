//! Iterator behavior over canned transition sequences.

use std::sync::Arc;
use xana_event::TransitionKind::{self, *};
use xana_module::testing::{test_env, ScriptedInput};
use xana_module::Module;
use xana_runtime::DataSource;

fn data_source(kinds: &[TransitionKind]) -> DataSource {
    data_source_with(kinds, Vec::new())
}

fn data_source_with(kinds: &[TransitionKind], modules: Vec<Box<dyn Module>>) -> DataSource {
    DataSource::new(
        Box::new(ScriptedInput::new(kinds.iter().copied())),
        modules,
        Arc::new(test_env()),
    )
}

const ONE_RUN_ONE_STEP: &[TransitionKind] =
    &[BeginRun, BeginCalibCycle, DoEvent, DoEvent, EndCalibCycle, EndRun];

const ONE_RUN_TWO_STEPS: &[TransitionKind] = &[
    BeginRun,
    BeginCalibCycle,
    DoEvent,
    DoEvent,
    EndCalibCycle,
    BeginCalibCycle,
    DoEvent,
    DoEvent,
    EndCalibCycle,
    EndRun,
];

const TWO_RUNS: &[TransitionKind] = &[
    BeginRun,
    BeginCalibCycle,
    DoEvent,
    DoEvent,
    EndCalibCycle,
    EndRun,
    BeginRun,
    BeginCalibCycle,
    DoEvent,
    DoEvent,
    EndCalibCycle,
    EndRun,
];

fn count_events(iter: &mut xana_runtime::EventIter) -> usize {
    let mut count = 0;
    while iter.next().unwrap().is_some() {
        count += 1;
    }
    count
}

#[test]
fn events_single_step() {
    let ds = data_source(ONE_RUN_ONE_STEP);
    let mut events = ds.events();
    assert_eq!(count_events(&mut events), 2);
    // the iterator stays exhausted
    assert!(events.next().unwrap().is_none());
}

#[test]
fn events_two_steps() {
    let ds = data_source(ONE_RUN_TWO_STEPS);
    assert_eq!(count_events(&mut ds.events()), 4);
}

#[test]
fn events_two_runs() {
    let ds = data_source(TWO_RUNS);
    assert_eq!(count_events(&mut ds.events()), 4);
}

#[test]
fn steps_single() {
    let ds = data_source(ONE_RUN_ONE_STEP);
    let mut steps = ds.steps();
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_none());
}

#[test]
fn steps_two_in_one_run() {
    let ds = data_source(ONE_RUN_TWO_STEPS);
    let mut steps = ds.steps();
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_none());
}

#[test]
fn steps_cross_run_boundaries() {
    let ds = data_source(TWO_RUNS);
    let mut steps = ds.steps();
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_none());
}

#[test]
fn runs_single() {
    let ds = data_source(ONE_RUN_ONE_STEP);
    let mut runs = ds.runs();
    assert!(runs.next().unwrap().is_some());
    assert!(runs.next().unwrap().is_none());
}

#[test]
fn runs_two() {
    let ds = data_source(TWO_RUNS);
    let mut runs = ds.runs();
    assert!(runs.next().unwrap().is_some());
    assert!(runs.next().unwrap().is_some());
    assert!(runs.next().unwrap().is_none());
}

#[test]
fn step_events_end_at_calib_cycle() {
    let ds = data_source(ONE_RUN_TWO_STEPS);
    let mut steps = ds.steps();

    let step = steps.next().unwrap().unwrap();
    assert_eq!(count_events(&mut step.events()), 2);

    let step = steps.next().unwrap().unwrap();
    assert_eq!(count_events(&mut step.events()), 2);

    assert!(steps.next().unwrap().is_none());
}

#[test]
fn run_events_cross_steps() {
    let ds = data_source(ONE_RUN_TWO_STEPS);
    let mut runs = ds.runs();

    let run = runs.next().unwrap().unwrap();
    // all four events of the run, crossing the step boundary
    assert_eq!(count_events(&mut run.events()), 4);
    assert!(runs.next().unwrap().is_none());
}

#[test]
fn full_nesting_two_runs_two_steps() {
    let sequence: Vec<TransitionKind> = [ONE_RUN_TWO_STEPS, ONE_RUN_TWO_STEPS].concat();
    let ds = data_source(&sequence);
    let mut runs = ds.runs();

    for _ in 0..2 {
        let run = runs.next().unwrap().unwrap();
        let mut steps = run.steps();
        for _ in 0..2 {
            let step = steps.next().unwrap().unwrap();
            assert_eq!(count_events(&mut step.events()), 2);
        }
        assert!(steps.next().unwrap().is_none());
    }
    assert!(runs.next().unwrap().is_none());
}

#[test]
fn run_boundary_survives_step_iteration() {
    // A StepIter that hits EndRun pushes it back so the enclosing RunIter
    // still sees the run close and can find the next run.
    let ds = data_source(TWO_RUNS);
    let mut runs = ds.runs();

    let run = runs.next().unwrap().unwrap();
    let mut steps = run.steps();
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_none());

    let run = runs.next().unwrap().unwrap();
    let mut steps = run.steps();
    assert!(steps.next().unwrap().is_some());
    assert!(steps.next().unwrap().is_none());

    assert!(runs.next().unwrap().is_none());
}

#[test]
fn partially_consumed_step_does_not_break_iteration() {
    let ds = data_source(ONE_RUN_TWO_STEPS);
    let mut steps = ds.steps();

    let step = steps.next().unwrap().unwrap();
    let mut events = step.events();
    // consume only the first event of the step
    assert!(events.next().unwrap().is_some());
    drop(events);

    // the next step is still found
    let step = steps.next().unwrap().unwrap();
    assert_eq!(count_events(&mut step.events()), 2);
    assert!(steps.next().unwrap().is_none());
}

#[test]
fn events_carry_ids_through_the_chain() {
    let ds = data_source(ONE_RUN_ONE_STEP);
    let mut events = ds.events();

    let evt = events.next().unwrap().unwrap();
    let id = evt.get::<xana_event::EventId>().unwrap();
    assert_eq!(id.run(), 1);
    assert_eq!(id.fiducials(), 1);

    let evt = events.next().unwrap().unwrap();
    assert_eq!(evt.get::<xana_event::EventId>().unwrap().fiducials(), 2);
}

#[test]
fn run_iter_with_index_drives_set_run() {
    let (input, set_runs) =
        ScriptedInput::new(TWO_RUNS.iter().copied()).with_index(vec![7, 9]);
    let ds = DataSource::new(Box::new(input), Vec::new(), Arc::new(test_env()));

    let mut runs = ds.runs();
    let mut seen = 0;
    while runs.next().unwrap().is_some() {
        seen += 1;
    }

    // one run emitted per published entry, each preceded by its set_run
    assert_eq!(seen, 2);
    assert_eq!(*set_runs.lock(), vec![7, 9]);
}

#[test]
fn next_with_event_exposes_begin_run_payload() {
    let ds = data_source(ONE_RUN_ONE_STEP);
    let mut runs = ds.runs();
    let (run, evt) = runs.next_with_event().unwrap().unwrap();
    // the BeginRun event reached the module chain but carries no event id
    assert!(evt.get::<xana_event::EventId>().is_none());
    assert_eq!(count_events(&mut run.events()), 2);
}
