// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, eyre};
use pretty_assertions::assert_eq;
use std::{collections::BTreeSet, sync::Arc, thread};
use testrun_aggregate::{
    aggregate::RunAggregate,
    case::TestCaseId,
    collector::{EngineEvent, ResultCollector, RunMeta},
};

const CASE_COUNT: usize = 100;
const WORKERS: usize = 4;

/// Returns the outcome for the test case with the given index. Every fifth test case fails an
/// assertion, every seventh errors (unless it also fails an assertion).
fn outcome_for(index: usize) -> FixtureOutcome {
    if index % 5 == 0 {
        FixtureOutcome::AssertionFailure
    } else if index % 7 == 0 {
        FixtureOutcome::Error
    } else {
        FixtureOutcome::Pass
    }
}

fn ids_for_worker(worker: usize) -> impl Iterator<Item = (usize, TestCaseId)> {
    (worker..CASE_COUNT).step_by(WORKERS).map(move |index| {
        (
            index,
            case_id(
                &format!("org.example.Worker{worker}Test"),
                &format!("case_{index}"),
            ),
        )
    })
}

fn expected_counts() -> (usize, usize) {
    let failures = (0..CASE_COUNT)
        .filter(|&index| outcome_for(index).is_failure())
        .count();
    let errors = (0..CASE_COUNT)
        .filter(|&index| outcome_for(index).is_error())
        .count();
    (failures, errors)
}

fn check_aggregate(aggregate: &RunAggregate) {
    let (failures, errors) = expected_counts();
    assert_eq!(aggregate.run_count(), CASE_COUNT);
    assert_eq!(aggregate.failure_count(), failures);
    assert_eq!(aggregate.error_count(), errors);
    assert_eq!(aggregate.ignore_count(), 0);

    let results = aggregate.test_case_results();
    assert_eq!(results.len(), CASE_COUNT);
    let distinct: BTreeSet<_> = results.iter().map(|case| case.id().clone()).collect();
    assert_eq!(distinct.len(), CASE_COUNT, "no test case was recorded twice");
    assert!(
        results.iter().all(|case| case.is_finished()),
        "every test case finished"
    );
}

#[test]
fn concurrent_handlers_from_threads() -> Result<()> {
    test_init();

    let collector = Arc::new(ResultCollector::default());
    collector.on_run_started(RunMeta {
        expected_count: Some(CASE_COUNT),
    });

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let collector = Arc::clone(&collector);
            thread::spawn(move || -> Result<()> {
                for (index, id) in ids_for_worker(worker) {
                    for event in outcome_for(index).events(&id) {
                        collector.handle_event(event)?;
                    }
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| eyre!("worker thread panicked"))??;
    }

    collector.on_run_finished()?;
    check_aggregate(&collector.aggregate());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_senders_through_channel() -> Result<()> {
    test_init();

    let (sender, task) = ResultCollector::default().into_channel();
    let aggregate = task.aggregate();
    let collector_handle = tokio::spawn(task.run());

    sender.send(EngineEvent::RunStarted {
        meta: RunMeta {
            expected_count: Some(CASE_COUNT),
        },
    })?;

    // Engine threads are plain OS threads, each with their own clone of the sender.
    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let sender = sender.clone();
            thread::spawn(move || -> Result<()> {
                for (index, id) in ids_for_worker(worker) {
                    for event in outcome_for(index).events(&id) {
                        sender.send(event)?;
                    }
                }
                Ok(())
            })
        })
        .collect();
    for worker in workers {
        worker
            .join()
            .map_err(|_| eyre!("worker thread panicked"))??;
    }

    sender.send(EngineEvent::RunFinished)?;
    drop(sender);

    let outcome = collector_handle.await?;
    assert_eq!(outcome.rejected, Vec::new());
    assert!(Arc::ptr_eq(&outcome.aggregate, &aggregate));
    check_aggregate(&aggregate);
    assert!(aggregate.is_finished());
    Ok(())
}

#[test]
fn concurrent_duplicate_starts_count_once() -> Result<()> {
    test_init();

    let collector = Arc::new(ResultCollector::default());
    let id = case_id("org.example.RaceTest", "raced");

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let collector = Arc::clone(&collector);
            let id = id.clone();
            thread::spawn(move || collector.on_test_started(id).is_ok())
        })
        .collect();
    let mut accepted = 0;
    for handle in handles {
        if handle.join().map_err(|_| eyre!("worker thread panicked"))? {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1, "exactly one start is accepted");

    // Racing terminal notifications finish the test case exactly once.
    let finish_handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let collector = Arc::clone(&collector);
            let id = id.clone();
            thread::spawn(move || collector.on_test_finished(&id))
        })
        .collect();
    for handle in finish_handles {
        handle
            .join()
            .map_err(|_| eyre!("worker thread panicked"))??;
    }

    let aggregate = collector.aggregate();
    assert_eq!(aggregate.run_count(), 1);
    assert_eq!(aggregate.test_case_results().len(), 1);
    assert!(aggregate.test_case_results()[0].is_finished());
    Ok(())
}
