// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Once;
use test_strategy::Arbitrary;
use testrun_aggregate::{
    case::{CauseKind, FailureCause, TestCaseId},
    collector::EngineEvent,
};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Either of these can fail if another test binary in the same process already installed
        // its hooks; that's fine.
        let _ = color_eyre::install();
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

pub(crate) fn case_id(class_name: &str, method_name: &str) -> TestCaseId {
    TestCaseId::new(class_name, method_name)
}

/// What the engine reports for a single test case.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Arbitrary)]
pub(crate) enum FixtureOutcome {
    Pass,
    AssertionFailure,
    Error,
    AssumptionFailure,
    Ignored,
}

impl FixtureOutcome {
    /// Returns the notifications the engine sends for a test case with this outcome.
    pub(crate) fn events(self, id: &TestCaseId) -> Vec<EngineEvent> {
        let started = EngineEvent::TestStarted { id: id.clone() };
        let finished = EngineEvent::TestFinished { id: id.clone() };
        match self {
            Self::Pass => vec![started, finished],
            Self::AssertionFailure => vec![
                started,
                EngineEvent::TestFailure {
                    id: id.clone(),
                    cause: FailureCause::assertion("expected:<1> but was:<2>")
                        .with_type_name("java.lang.AssertionError"),
                },
                finished,
            ],
            Self::Error => vec![
                started,
                EngineEvent::TestFailure {
                    id: id.clone(),
                    cause: FailureCause::error("java.lang.IllegalStateException", "not ready")
                        .with_trace("at org.example.Fixture.run(Fixture.java:10)"),
                },
                finished,
            ],
            Self::AssumptionFailure => vec![
                started,
                EngineEvent::TestAssumptionFailure {
                    id: id.clone(),
                    cause: FailureCause::new(CauseKind::Unclassified)
                        .with_type_name("org.junit.AssumptionViolatedException"),
                },
                finished,
            ],
            Self::Ignored => vec![EngineEvent::TestIgnored { id: id.clone() }],
        }
    }

    pub(crate) fn is_started(self) -> bool {
        !matches!(self, Self::Ignored)
    }

    pub(crate) fn is_failure(self) -> bool {
        matches!(self, Self::AssertionFailure)
    }

    pub(crate) fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::AssumptionFailure)
    }
}
