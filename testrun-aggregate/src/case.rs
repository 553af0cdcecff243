// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test-case results.
//!
//! The main structure in this module is [`CaseResult`], which records the outcome and timing of
//! a single test case. A `CaseResult` is created by the collector when the engine reports the case
//! as started or ignored, and is never removed afterwards.

use crate::{
    errors::CaseAlreadyFinished,
    time::{StopwatchStart, stopwatch},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use smol_str::SmolStr;
use std::{fmt, sync::OnceLock, time::Duration};

/// The identity of a test case: a qualified class name plus a method name.
///
/// Identities are compared by value, so two ids built separately from the same names refer to the
/// same test case.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseId {
    class_name: SmolStr,
    method_name: SmolStr,
}

impl TestCaseId {
    /// Creates a new test case identity.
    pub fn new(class_name: impl Into<SmolStr>, method_name: impl Into<SmolStr>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// Returns the qualified class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class_name, self.method_name)
    }
}

/// What the engine said about the kind of a failure cause.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CauseKind {
    /// An expectation mismatch raised by the test framework's own assertion mechanism.
    Assertion,

    /// Any other raised condition: an unexpected exception, a panic, an infrastructure fault.
    Other,

    /// The engine did not say. Resolved using the configured assertion type names.
    Unclassified,
}

/// How a failed test case is counted in the aggregate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureClass {
    /// Counted in `failure_count`.
    Failure,

    /// Counted in `error_count`.
    Error,
}

/// A description of why a test case failed, as reported by the engine.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FailureCause {
    kind: CauseKind,
    type_name: Option<SmolStr>,
    message: Option<String>,
    trace: Option<String>,
}

impl FailureCause {
    /// Creates a new failure cause of the given kind, with no further details.
    pub fn new(kind: CauseKind) -> Self {
        Self {
            kind,
            type_name: None,
            message: None,
            trace: None,
        }
    }

    /// Creates an assertion-style failure cause with the given message.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(CauseKind::Assertion).with_message(message)
    }

    /// Creates a non-assertion failure cause of the given type.
    pub fn error(type_name: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self::new(CauseKind::Other)
            .with_type_name(type_name)
            .with_message(message)
    }

    /// Sets the type name of the raised condition, e.g. `java.lang.IllegalStateException`.
    pub fn with_type_name(mut self, type_name: impl Into<SmolStr>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Sets the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the stack trace or backtrace.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Returns the kind reported by the engine.
    pub fn kind(&self) -> CauseKind {
        self.kind
    }

    /// Returns the type name of the raised condition, if known.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the stack trace, if any.
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.type_name, &self.message) {
            (Some(type_name), Some(message)) => write!(f, "{type_name}: {message}"),
            (Some(type_name), None) => write!(f, "{type_name}"),
            (None, Some(message)) => write!(f, "{message}"),
            (None, None) => write!(f, "(no description)"),
        }
    }
}

/// The status of a test case, derived from what has been recorded for it so far.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    /// Started, with no terminal notification yet.
    Running,

    /// Finished without a failure.
    Passed,

    /// A failure classified as [`FailureClass::Failure`] was recorded.
    Failed,

    /// A failure classified as [`FailureClass::Error`] was recorded.
    Errored,

    /// Skipped without ever being started.
    Ignored,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// The outcome and timing of one test case.
///
/// Fields that are written during the run (finish time, failure) are write-once. Readers may
/// observe a record before it is complete; `None` from an accessor means "not known yet".
#[derive(Debug)]
pub struct CaseResult {
    id: TestCaseId,
    start: Option<StopwatchStart>,
    finish: OnceLock<CaseFinish>,
    failure: OnceLock<RecordedFailure>,
}

#[derive(Clone, Debug)]
struct CaseFinish {
    finish_time: DateTime<Local>,
    time_taken: Option<Duration>,
}

#[derive(Clone, Debug)]
struct RecordedFailure {
    class: FailureClass,
    cause: FailureCause,
}

impl CaseResult {
    /// Creates a result for a test case that starts now.
    pub(crate) fn started(id: TestCaseId) -> Self {
        Self {
            id,
            start: Some(stopwatch()),
            finish: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    /// Creates a result for a test case that was skipped without being started.
    ///
    /// Ignored test cases are terminal as soon as they are reported, so the finish time is set to
    /// now.
    pub(crate) fn ignored(id: TestCaseId) -> Self {
        Self {
            id,
            start: None,
            finish: OnceLock::from(CaseFinish {
                finish_time: Local::now(),
                time_taken: None,
            }),
            failure: OnceLock::new(),
        }
    }

    /// Marks this test case as finished now, returning the finish time.
    ///
    /// Only the first call has an effect. Later calls leave the finish time unchanged and return
    /// an error carrying the original finish time.
    pub(crate) fn finish_run(&self) -> Result<DateTime<Local>, CaseAlreadyFinished> {
        let mut newly_finished = false;
        let finish = self.finish.get_or_init(|| {
            newly_finished = true;
            match &self.start {
                Some(start) => {
                    let snapshot = start.snapshot();
                    CaseFinish {
                        finish_time: snapshot.end_time(),
                        time_taken: Some(snapshot.duration),
                    }
                }
                // Only reachable for ignored cases, which are created finished.
                None => CaseFinish {
                    finish_time: Local::now(),
                    time_taken: None,
                },
            }
        });

        if newly_finished {
            Ok(finish.finish_time)
        } else {
            Err(CaseAlreadyFinished::new(self.id.clone(), finish.finish_time))
        }
    }

    /// Records the failure for this test case.
    ///
    /// Only the first failure is kept: if one was already recorded, the new cause is handed back.
    pub(crate) fn set_failure(
        &self,
        class: FailureClass,
        cause: FailureCause,
    ) -> Result<(), FailureCause> {
        self.failure
            .set(RecordedFailure { class, cause })
            .map_err(|rejected| rejected.cause)
    }

    /// Returns the identity of this test case.
    pub fn id(&self) -> &TestCaseId {
        &self.id
    }

    /// Returns the qualified class name.
    pub fn class_name(&self) -> &str {
        self.id.class_name()
    }

    /// Returns the method name.
    pub fn method_name(&self) -> &str {
        self.id.method_name()
    }

    /// Returns the time at which the test case started, or `None` if it was never started.
    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.start.as_ref().map(|start| start.start_time())
    }

    /// Returns the time at which the test case finished, or `None` if it hasn't finished yet.
    pub fn finish_time(&self) -> Option<DateTime<Local>> {
        self.finish.get().map(|finish| finish.finish_time)
    }

    /// Returns how long the test case ran for.
    ///
    /// This is `None` for test cases that haven't finished yet, and for ignored test cases.
    pub fn time_taken(&self) -> Option<Duration> {
        self.finish.get().and_then(|finish| finish.time_taken)
    }

    /// Returns true if a finish time has been recorded.
    pub fn is_finished(&self) -> bool {
        self.finish.get().is_some()
    }

    /// Returns the recorded failure cause, if any.
    pub fn failure_cause(&self) -> Option<&FailureCause> {
        self.failure.get().map(|failure| &failure.cause)
    }

    /// Returns how the recorded failure was classified, if any.
    pub fn failure_class(&self) -> Option<FailureClass> {
        self.failure.get().map(|failure| failure.class)
    }

    /// Returns the current status of this test case.
    pub fn status(&self) -> CaseStatus {
        if self.start.is_none() {
            return CaseStatus::Ignored;
        }
        match self.failure_class() {
            Some(FailureClass::Failure) => CaseStatus::Failed,
            Some(FailureClass::Error) => CaseStatus::Errored,
            None if self.is_finished() => CaseStatus::Passed,
            None => CaseStatus::Running,
        }
    }

    /// Returns a serializable copy of everything recorded so far.
    pub fn snapshot(&self) -> CaseSnapshot {
        CaseSnapshot {
            id: self.id.clone(),
            status: self.status(),
            start_time: self.start_time(),
            finish_time: self.finish_time(),
            time_taken: self.time_taken(),
            failure_class: self.failure_class(),
            failure_cause: self.failure_cause().cloned(),
        }
    }
}

/// A point-in-time copy of a [`CaseResult`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CaseSnapshot {
    /// The identity of the test case.
    #[serde(flatten)]
    pub id: TestCaseId,

    /// The status of the test case.
    pub status: CaseStatus,

    /// The start time, if the test case was started.
    pub start_time: Option<DateTime<Local>>,

    /// The finish time, if the test case has finished.
    pub finish_time: Option<DateTime<Local>>,

    /// How long the test case ran for.
    #[serde(with = "humantime_serde")]
    pub time_taken: Option<Duration>,

    /// How the failure was classified, if the test case failed.
    pub failure_class: Option<FailureClass>,

    /// The failure cause, if the test case failed.
    pub failure_cause: Option<FailureCause>,
}
