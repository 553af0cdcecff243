// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// ---
// Counter invariants, checked over arbitrary runs. For each run, every test case gets one of the
// fixture outcomes, and the engine notifications for the cases are delivered one case at a time.
// ---

use crate::fixtures::*;
use proptest::prelude::*;
use std::time::Duration;
use test_strategy::proptest;
use testrun_aggregate::{
    case::CaseStatus,
    collector::{EngineEvent, ResultCollector},
};

fn run_outcomes(outcomes: &[FixtureOutcome], repeat_finish: bool) -> ResultCollector {
    let collector = ResultCollector::default();
    for (index, outcome) in outcomes.iter().enumerate() {
        let id = case_id("org.example.PropertyTest", &format!("case_{index}"));
        for event in outcome.events(&id) {
            collector
                .handle_event(event)
                .expect("fixture events follow the engine contract");
        }
        if repeat_finish && outcome.is_started() {
            // A duplicate terminal notification is absorbed.
            collector
                .handle_event(EngineEvent::TestFinished { id })
                .expect("duplicate finish is absorbed");
        }
    }
    collector
}

#[proptest(cases = 64)]
fn counters_match_outcomes(
    #[strategy(prop::collection::vec(any::<FixtureOutcome>(), 0..48))] outcomes: Vec<FixtureOutcome>,
    repeat_finish: bool,
) {
    let collector = run_outcomes(&outcomes, repeat_finish);
    let aggregate = collector.aggregate();

    let started = outcomes.iter().filter(|outcome| outcome.is_started()).count();
    let failures = outcomes.iter().filter(|outcome| outcome.is_failure()).count();
    let errors = outcomes.iter().filter(|outcome| outcome.is_error()).count();
    let ignored = outcomes.len() - started;

    prop_assert_eq!(aggregate.run_count(), started);
    prop_assert_eq!(aggregate.test_case_results().len(), started);
    prop_assert_eq!(aggregate.failure_count(), failures);
    prop_assert_eq!(aggregate.error_count(), errors);
    prop_assert_eq!(aggregate.ignore_count(), ignored);
    prop_assert_eq!(aggregate.ignored_case_results().len(), ignored);

    let results = aggregate.test_case_results();
    let without_failure = results
        .iter()
        .filter(|case| case.failure_cause().is_none())
        .count();
    prop_assert_eq!(
        aggregate.failure_count() + aggregate.error_count() + without_failure,
        aggregate.run_count()
    );
    prop_assert!(results.iter().all(|case| case.is_finished()));
    prop_assert!(results.iter().all(|case| case.status() != CaseStatus::Running));
}

#[proptest(cases = 16)]
fn run_time_is_monotonic_then_fixed(
    #[strategy(prop::collection::vec(any::<FixtureOutcome>(), 0..8))] outcomes: Vec<FixtureOutcome>,
) {
    let collector = run_outcomes(&outcomes, false);
    let aggregate = collector.aggregate();

    let mut previous = aggregate.run_time();
    for _ in 0..3 {
        let current = aggregate.run_time();
        prop_assert!(current >= previous);
        previous = current;
    }

    collector
        .handle_event(EngineEvent::RunFinished)
        .expect("first run finish succeeds");
    let fixed = aggregate.run_time();
    prop_assert!(fixed >= previous);
    std::thread::sleep(Duration::from_millis(1));
    prop_assert_eq!(aggregate.run_time(), fixed);
    prop_assert_eq!(
        aggregate.finish_time(),
        Some(aggregate.start_time() + fixed)
    );
}
