// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EngineEvent, RunMeta};
use crate::{
    aggregate::RunAggregate,
    case::{CaseResult, CaseStatus, FailureCause, FailureClass, TestCaseId},
    config::{ClassificationConfig, CollectorConfig},
    errors::CollectorError,
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

/// Consumes engine notifications and maintains the [`RunAggregate`] for one run.
///
/// The collector is the only writer of the aggregate and of the test case results in it. All
/// notification handlers take `&self` and may be called concurrently from several threads, as
/// long as the notifications for any one test case arrive in order.
///
/// A notification that breaks the engine's contract (for example, finishing a test case that was
/// never started) is rejected with a [`CollectorError`]. Rejecting a notification leaves the
/// aggregate untouched and does not end the run.
#[derive(Debug)]
pub struct ResultCollector {
    classification: ClassificationConfig,
    aggregate: Arc<RunAggregate>,
    cases: DashMap<TestCaseId, Arc<CaseResult>>,
}

impl ResultCollector {
    /// Creates a new collector. The run's start time is set to now.
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            classification: config.classification().clone(),
            aggregate: Arc::new(RunAggregate::new()),
            cases: DashMap::new(),
        }
    }

    /// Returns a read handle to the aggregate.
    ///
    /// The handle can be read at any point, including while the run is in progress.
    pub fn aggregate(&self) -> Arc<RunAggregate> {
        Arc::clone(&self.aggregate)
    }

    /// Applies an engine notification.
    pub fn handle_event(&self, event: EngineEvent) -> Result<(), CollectorError> {
        match event {
            EngineEvent::RunStarted { meta } => {
                self.on_run_started(meta);
                Ok(())
            }
            EngineEvent::RunFinished => self.on_run_finished(),
            EngineEvent::TestStarted { id } => self.on_test_started(id),
            EngineEvent::TestFinished { id } => self.on_test_finished(&id),
            EngineEvent::TestFailure { id, cause } => self.on_test_failure(&id, cause),
            EngineEvent::TestAssumptionFailure { id, cause } => {
                self.on_test_assumption_failure(&id, cause)
            }
            EngineEvent::TestIgnored { id } => self.on_test_ignored(id),
        }
    }

    /// Called when the test run starts.
    pub fn on_run_started(&self, meta: RunMeta) {
        debug!(expected_count = ?meta.expected_count, "test run started");
        if let Some(expected_count) = meta.expected_count {
            if !self.aggregate.set_expected_count(expected_count) {
                warn!(
                    expected_count,
                    "test run started more than once, keeping the first expected count",
                );
            }
        }
    }

    /// Called when the test run finishes. Sets the run's finish time.
    pub fn on_run_finished(&self) -> Result<(), CollectorError> {
        let finish_time = self.aggregate.finish_running()?;

        let still_running = self
            .aggregate
            .test_case_results()
            .iter()
            .filter(|case| !case.is_finished())
            .count();
        if still_running > 0 {
            warn!(
                still_running,
                "test run finished while some test cases had not finished",
            );
        }

        debug!(
            %finish_time,
            run_time = ?self.aggregate.run_time(),
            run_count = self.aggregate.run_count(),
            failure_count = self.aggregate.failure_count(),
            error_count = self.aggregate.error_count(),
            ignore_count = self.aggregate.ignore_count(),
            "test run finished",
        );
        Ok(())
    }

    /// Called when a test case starts.
    pub fn on_test_started(&self, id: TestCaseId) -> Result<(), CollectorError> {
        match self.cases.entry(id) {
            Entry::Occupied(entry) => Err(CollectorError::AlreadyRegistered {
                id: entry.key().clone(),
                status: entry.get().status(),
            }),
            Entry::Vacant(entry) => {
                let case = Arc::new(CaseResult::started(entry.key().clone()));
                // Count the test case before other notifications can look it up, so that
                // failure_count + error_count never exceeds run_count.
                self.aggregate.push_started(Arc::clone(&case));
                debug!(id = %case.id(), "test started");
                entry.insert(case);
                Ok(())
            }
        }
    }

    /// Called when a test case finishes, whether or not it failed.
    pub fn on_test_finished(&self, id: &TestCaseId) -> Result<(), CollectorError> {
        let case = self.lookup_running(id)?;
        match case.finish_run() {
            Ok(_) => debug!(
                id = %id,
                status = %case.status(),
                time_taken = ?case.time_taken(),
                "test finished",
            ),
            // The failure notification already finished this test case.
            Err(_) if case.failure_class().is_some() => debug!(
                id = %id,
                status = %case.status(),
                time_taken = ?case.time_taken(),
                "test finished after failing",
            ),
            Err(error) => warn!(id = %id, %error, "test finished more than once, ignoring"),
        }
        Ok(())
    }

    /// Called when a test case fails.
    pub fn on_test_failure(
        &self,
        id: &TestCaseId,
        cause: FailureCause,
    ) -> Result<(), CollectorError> {
        self.handle_failure(id, cause, FailureNotification::Failure)
    }

    /// Called when a test case fails an assumption.
    ///
    /// Assumption failures are classified the same way as any other failure.
    pub fn on_test_assumption_failure(
        &self,
        id: &TestCaseId,
        cause: FailureCause,
    ) -> Result<(), CollectorError> {
        self.handle_failure(id, cause, FailureNotification::AssumptionFailure)
    }

    /// Called when a test case is skipped without being started.
    pub fn on_test_ignored(&self, id: TestCaseId) -> Result<(), CollectorError> {
        match self.cases.entry(id) {
            Entry::Occupied(entry) => Err(CollectorError::AlreadyRegistered {
                id: entry.key().clone(),
                status: entry.get().status(),
            }),
            Entry::Vacant(entry) => {
                let case = Arc::new(CaseResult::ignored(entry.key().clone()));
                self.aggregate.push_ignored(Arc::clone(&case));
                debug!(id = %case.id(), "test ignored");
                entry.insert(case);
                Ok(())
            }
        }
    }

    fn handle_failure(
        &self,
        id: &TestCaseId,
        cause: FailureCause,
        notification: FailureNotification,
    ) -> Result<(), CollectorError> {
        let case = self.lookup_running(id)?;
        let class = self.classification.classify(&cause);

        if let Err(rejected) = case.set_failure(class, cause) {
            warn!(
                id = %id,
                %notification,
                cause = %rejected,
                "test already has a recorded failure, ignoring",
            );
            return Ok(());
        }
        match class {
            FailureClass::Failure => self.aggregate.increment_failure_count(),
            FailureClass::Error => self.aggregate.increment_error_count(),
        }

        if let Err(error) = case.finish_run() {
            debug!(id = %id, %error, "failure reported after the test finished");
        }

        debug!(
            id = %id,
            %notification,
            ?class,
            cause = ?case.failure_cause(),
            "test failed",
        );
        Ok(())
    }

    fn lookup_running(&self, id: &TestCaseId) -> Result<Arc<CaseResult>, CollectorError> {
        // Clone the Arc out so that the map's shard lock isn't held past this point.
        let case = self
            .cases
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CollectorError::UnknownCase { id: id.clone() })?;
        if case.status() == CaseStatus::Ignored {
            return Err(CollectorError::CaseNotRunning { id: id.clone() });
        }
        Ok(case)
    }
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new(&CollectorConfig::default())
    }
}

#[derive(Copy, Clone, Debug)]
enum FailureNotification {
    Failure,
    AssumptionFailure,
}

impl fmt::Display for FailureNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure => f.write_str("failure"),
            Self::AssumptionFailure => f.write_str("assumption-failure"),
        }
    }
}
