// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Aggregates the outcome of a test run into a single queryable record.
//!
//! A test-execution engine reports lifecycle notifications (test started,
//! finished, failed, ignored, and so on) as [`EngineEvent`](collector::EngineEvent)s.
//! A [`ResultCollector`](collector::ResultCollector) consumes them, possibly
//! from several threads at once, and maintains a
//! [`RunAggregate`](aggregate::RunAggregate): run-wide counters, timestamps,
//! and one [`CaseResult`](case::CaseResult) per test case.
//!
//! The engine itself is not part of this crate: nothing here discovers,
//! schedules, retries, or runs tests.

pub mod aggregate;
pub mod case;
pub mod collector;
pub mod config;
pub mod errors;
mod time;
