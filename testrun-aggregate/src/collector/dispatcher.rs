// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-based event ingestion.
//!
//! Engines that deliver notifications from many threads (or that shouldn't block on the
//! collector) can send [`EngineEvent`]s through an [`EventSender`]. A single [`CollectorTask`]
//! drains the channel and applies the events in the order they were received.

use super::{EngineEvent, ResultCollector};
use crate::{aggregate::RunAggregate, errors::CollectorError};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error};

impl ResultCollector {
    /// Turns this collector into a channel: a sender for the engine side, and a task that applies
    /// the events.
    ///
    /// The task runs until every clone of the sender has been dropped.
    pub fn into_channel(self) -> (EventSender, CollectorTask) {
        let (sender, receiver) = unbounded_channel();
        (
            EventSender { sender },
            CollectorTask {
                collector: self,
                receiver,
            },
        )
    }
}

/// The engine side of a collector channel.
///
/// Senders are cheap to clone and can be used from any thread, inside or outside an async
/// runtime.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: UnboundedSender<EngineEvent>,
}

impl EventSender {
    /// Sends an event to the collector task.
    ///
    /// Returns [`CollectorError::Closed`] if the task is no longer running.
    pub fn send(&self, event: EngineEvent) -> Result<(), CollectorError> {
        self.sender
            .send(event)
            .map_err(|_| CollectorError::Closed)
    }
}

/// The collector side of a collector channel.
#[derive(Debug)]
pub struct CollectorTask {
    collector: ResultCollector,
    receiver: UnboundedReceiver<EngineEvent>,
}

impl CollectorTask {
    /// Returns a read handle to the aggregate, for observing the run while it is in progress.
    pub fn aggregate(&self) -> Arc<RunAggregate> {
        self.collector.aggregate()
    }

    /// Runs the collector to completion, until every sender has been dropped.
    ///
    /// Rejected notifications are logged and returned in the outcome; they don't stop the task.
    pub async fn run(mut self) -> CollectorOutcome {
        let mut rejected = Vec::new();

        while let Some(event) = self.receiver.recv().await {
            if let Err(error) = self.collector.handle_event(event) {
                error!(%error, "rejected engine notification");
                rejected.push(error);
            }
        }

        debug!(
            rejected = rejected.len(),
            "all event senders dropped, collector task exiting",
        );
        CollectorOutcome {
            aggregate: self.collector.aggregate(),
            rejected,
        }
    }
}

/// The result of running a [`CollectorTask`] to completion.
#[derive(Debug)]
pub struct CollectorOutcome {
    /// The aggregate for the run.
    pub aggregate: Arc<RunAggregate>,

    /// The notifications that were rejected, in the order they were received.
    pub rejected: Vec<CollectorError>,
}
