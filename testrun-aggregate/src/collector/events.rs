// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::case::{FailureCause, TestCaseId};

/// A lifecycle notification from the test-execution engine.
///
/// Events are produced by the engine and consumed by a
/// [`ResultCollector`](super::ResultCollector).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineEvent {
    /// The test run started.
    RunStarted {
        /// Information about the run.
        meta: RunMeta,
    },

    /// The test run finished.
    RunFinished,

    /// A test case started running.
    TestStarted {
        /// The test case that started.
        id: TestCaseId,
    },

    /// A test case finished running, whether or not it failed.
    TestFinished {
        /// The test case that finished.
        id: TestCaseId,
    },

    /// A test case failed.
    TestFailure {
        /// The test case that failed.
        id: TestCaseId,

        /// Why it failed.
        cause: FailureCause,
    },

    /// A test case failed an assumption.
    TestAssumptionFailure {
        /// The test case whose assumption failed.
        id: TestCaseId,

        /// The assumption failure.
        cause: FailureCause,
    },

    /// A test case was skipped without being started.
    TestIgnored {
        /// The test case that was ignored.
        id: TestCaseId,
    },
}

impl EngineEvent {
    /// Returns the test case this event is about, or `None` for run-level events.
    pub fn id(&self) -> Option<&TestCaseId> {
        match self {
            Self::RunStarted { .. } | Self::RunFinished => None,
            Self::TestStarted { id }
            | Self::TestFinished { id }
            | Self::TestFailure { id, .. }
            | Self::TestAssumptionFailure { id, .. }
            | Self::TestIgnored { id } => Some(id),
        }
    }
}

/// Information the engine provides when a run starts.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunMeta {
    /// The number of tests the engine expects to run, if known.
    pub expected_count: Option<usize>,
}
