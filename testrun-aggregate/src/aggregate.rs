// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The run-wide result record.
//!
//! The main structure in this module is [`RunAggregate`]. It is written only by the
//! [`ResultCollector`](crate::collector::ResultCollector) that owns it, and can be read at any
//! time, including while the run is still in progress.

use crate::{
    case::{CaseResult, CaseSnapshot},
    errors::RunAlreadyFinished,
    time::{StopwatchSnapshot, StopwatchStart, stopwatch},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::{
    sync::{
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Counters, timestamps and per-case results for one test run.
#[derive(Debug)]
pub struct RunAggregate {
    stopwatch: StopwatchStart,
    finish: OnceLock<StopwatchSnapshot>,
    expected_count: OnceLock<usize>,
    run_count: AtomicUsize,
    failure_count: AtomicUsize,
    error_count: AtomicUsize,
    ignore_count: AtomicUsize,
    // Appends to this sequence and increments of `run_count` happen under this lock.
    test_case_results: Mutex<Vec<Arc<CaseResult>>>,
    ignored_case_results: Mutex<Vec<Arc<CaseResult>>>,
}

impl RunAggregate {
    /// Creates a new aggregate for a run that starts now.
    pub(crate) fn new() -> Self {
        Self {
            stopwatch: stopwatch(),
            finish: OnceLock::new(),
            expected_count: OnceLock::new(),
            run_count: AtomicUsize::new(0),
            failure_count: AtomicUsize::new(0),
            error_count: AtomicUsize::new(0),
            ignore_count: AtomicUsize::new(0),
            test_case_results: Mutex::new(Vec::new()),
            ignored_case_results: Mutex::new(Vec::new()),
        }
    }

    /// Marks the run as finished now.
    ///
    /// The finish time is set at most once: later calls return an error and leave it unchanged.
    pub(crate) fn finish_running(&self) -> Result<DateTime<Local>, RunAlreadyFinished> {
        let mut newly_finished = false;
        let finish = self.finish.get_or_init(|| {
            newly_finished = true;
            self.stopwatch.snapshot()
        });

        if newly_finished {
            Ok(finish.end_time())
        } else {
            Err(RunAlreadyFinished::new(finish.end_time()))
        }
    }

    /// Records the number of tests the engine expects to run. Only the first value is kept.
    pub(crate) fn set_expected_count(&self, expected_count: usize) -> bool {
        self.expected_count.set(expected_count).is_ok()
    }

    /// Appends a started test case and increments `run_count` as one step.
    pub(crate) fn push_started(&self, case: Arc<CaseResult>) {
        let mut results = lock(&self.test_case_results);
        results.push(case);
        self.increment_run_count();
    }

    /// Appends an ignored test case and increments `ignore_count`.
    pub(crate) fn push_ignored(&self, case: Arc<CaseResult>) {
        let mut results = lock(&self.ignored_case_results);
        results.push(case);
        self.increment_ignore_count();
    }

    fn increment_run_count(&self) {
        self.run_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_error_count(&self) {
        self.error_count.fetch_add(1, Ordering::AcqRel);
    }

    fn increment_ignore_count(&self) {
        self.ignore_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the time at which the run started.
    pub fn start_time(&self) -> DateTime<Local> {
        self.stopwatch.start_time()
    }

    /// Returns the time at which the run finished, or `None` if it is still in progress.
    pub fn finish_time(&self) -> Option<DateTime<Local>> {
        self.finish.get().map(|finish| finish.end_time())
    }

    /// Returns true if the run has finished.
    pub fn is_finished(&self) -> bool {
        self.finish.get().is_some()
    }

    /// Returns the number of tests the engine announced at run start, if it did.
    pub fn expected_count(&self) -> Option<usize> {
        self.expected_count.get().copied()
    }

    /// Returns the number of test cases that were started.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::Acquire)
    }

    /// Returns the number of test cases that failed an assertion.
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Acquire)
    }

    /// Returns the number of test cases that failed with any other error.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Acquire)
    }

    /// Returns the number of test cases that were ignored.
    pub fn ignore_count(&self) -> usize {
        self.ignore_count.load(Ordering::Acquire)
    }

    /// Returns how long the run took, or has taken so far if it is still in progress.
    ///
    /// This is measured on the monotonic clock: while the run is in progress, repeated calls never
    /// go backwards, and once the run is finished the value is fixed.
    pub fn run_time(&self) -> Duration {
        match self.finish.get() {
            Some(finish) => finish.duration,
            None => self.stopwatch.snapshot().duration,
        }
    }

    /// Returns the started test cases, in the order they were started.
    ///
    /// This is a copy of the sequence at the time of the call. While the run is in progress, more
    /// test cases may be appended afterwards, and the returned test cases may still be updated.
    pub fn test_case_results(&self) -> Vec<Arc<CaseResult>> {
        lock(&self.test_case_results).clone()
    }

    /// Returns the ignored test cases, in the order they were reported.
    ///
    /// Ignored test cases are never started, so they are not part of
    /// [`test_case_results`](Self::test_case_results) or `run_count`.
    pub fn ignored_case_results(&self) -> Vec<Arc<CaseResult>> {
        lock(&self.ignored_case_results).clone()
    }

    /// Returns a serializable point-in-time view of the run.
    pub fn snapshot(&self) -> RunSnapshot {
        // Hold the lock while reading the counters, so that `run_count` matches the number of
        // test cases in the snapshot.
        let (run_count, test_cases) = {
            let results = lock(&self.test_case_results);
            let test_cases: Vec<_> = results.iter().map(|case| case.snapshot()).collect();
            (self.run_count(), test_cases)
        };
        let (ignore_count, ignored_cases) = {
            let results = lock(&self.ignored_case_results);
            let ignored_cases: Vec<_> = results.iter().map(|case| case.snapshot()).collect();
            (self.ignore_count(), ignored_cases)
        };

        let (finish_time, run_time) = match self.finish.get() {
            Some(finish) => (Some(finish.end_time()), finish.duration),
            None => (None, self.stopwatch.snapshot().duration),
        };

        RunSnapshot {
            start_time: self.start_time(),
            finish_time,
            run_time,
            expected_count: self.expected_count(),
            run_count,
            failure_count: self.failure_count(),
            error_count: self.error_count(),
            ignore_count,
            test_cases,
            ignored_cases,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The data behind these locks is append-only, so a panic while holding one can't leave it in
    // an inconsistent state.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A point-in-time copy of a [`RunAggregate`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSnapshot {
    /// The time at which the run started.
    pub start_time: DateTime<Local>,

    /// The time at which the run finished, if it has.
    pub finish_time: Option<DateTime<Local>>,

    /// How long the run took, or had taken so far when the snapshot was made.
    #[serde(with = "humantime_serde")]
    pub run_time: Duration,

    /// The number of tests the engine announced at run start, if it did.
    pub expected_count: Option<usize>,

    /// The number of test cases that were started.
    pub run_count: usize,

    /// The number of test cases that failed an assertion.
    pub failure_count: usize,

    /// The number of test cases that failed with any other error.
    pub error_count: usize,

    /// The number of test cases that were ignored.
    pub ignore_count: usize,

    /// The started test cases, in the order they were started.
    pub test_cases: Vec<CaseSnapshot>,

    /// The ignored test cases, in the order they were reported.
    pub ignored_cases: Vec<CaseSnapshot>,
}

impl RunSnapshot {
    /// Returns true if any test case failed or errored.
    #[inline]
    pub fn any_failed(&self) -> bool {
        self.failure_count > 0 || self.error_count > 0
    }

    /// Returns true if this run is considered a success.
    ///
    /// A run is considered failed if any of the following are true:
    /// * the run hasn't finished yet
    /// * any test case is still running
    /// * any test case failed or errored
    pub fn is_success(&self) -> bool {
        if self.finish_time.is_none() {
            return false;
        }
        if self.test_cases.iter().any(|case| case.finish_time.is_none()) {
            return false;
        }
        !self.any_failed()
    }

    /// Returns the number of started test cases that finished without a failure.
    pub fn passed_count(&self) -> usize {
        // Counters are read one at a time while a run is in progress, so saturate rather than
        // underflow.
        self.run_count
            .saturating_sub(self.failure_count)
            .saturating_sub(self.error_count)
    }
}
