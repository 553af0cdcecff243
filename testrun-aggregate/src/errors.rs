// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testrun-aggregate.

use crate::case::{CaseStatus, TestCaseId};
use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use config::ConfigError;
use std::fmt;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse testrun-aggregate config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An engine notification that the collector refused to apply.
///
/// Each of these fails only the notification that caused it: the run keeps going, and the
/// aggregate is left exactly as it was before the notification arrived.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollectorError {
    /// A notification arrived for a test case that was never started or ignored.
    #[error("received a notification for test case `{id}`, which was never started")]
    UnknownCase {
        /// The identity carried by the notification.
        id: TestCaseId,
    },

    /// A running-state notification (finish or failure) arrived for an ignored test case.
    #[error("test case `{id}` was ignored, so it cannot finish or fail")]
    CaseNotRunning {
        /// The identity carried by the notification.
        id: TestCaseId,
    },

    /// A test case was started or ignored more than once.
    #[error("test case `{id}` was already registered (current status: {status})")]
    AlreadyRegistered {
        /// The identity carried by the notification.
        id: TestCaseId,

        /// The status of the test case when the duplicate notification arrived.
        status: CaseStatus,
    },

    /// The run was reported as finished more than once.
    #[error(transparent)]
    RunAlreadyFinished(#[from] RunAlreadyFinished),

    /// The collector task has gone away and can no longer receive events.
    #[error("the result collector is no longer accepting events")]
    Closed,
}

/// Returned by [`CaseResult::finish_run`](crate::case::CaseResult::finish_run) when the test case
/// has already been finished.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("test case `{id}` already finished at {finish_time}")]
pub struct CaseAlreadyFinished {
    id: TestCaseId,
    finish_time: DateTime<Local>,
}

impl CaseAlreadyFinished {
    pub(crate) fn new(id: TestCaseId, finish_time: DateTime<Local>) -> Self {
        Self { id, finish_time }
    }

    /// Returns the identity of the test case.
    pub fn id(&self) -> &TestCaseId {
        &self.id
    }

    /// Returns the finish time recorded by the first call, which is left unchanged.
    pub fn finish_time(&self) -> DateTime<Local> {
        self.finish_time
    }
}

/// Returned by [`RunAggregate::finish_running`](crate::aggregate::RunAggregate::finish_running)
/// when the run has already been finished.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub struct RunAlreadyFinished {
    finish_time: DateTime<Local>,
}

impl RunAlreadyFinished {
    pub(crate) fn new(finish_time: DateTime<Local>) -> Self {
        Self { finish_time }
    }

    /// Returns the finish time recorded by the first call, which is left unchanged.
    pub fn finish_time(&self) -> DateTime<Local> {
        self.finish_time
    }
}

impl fmt::Display for RunAlreadyFinished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the test run already finished at {}", self.finish_time)
    }
}
