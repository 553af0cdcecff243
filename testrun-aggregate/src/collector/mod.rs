// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The result collector.
//!
//! The main structure in this module is [`ResultCollector`]. Engine notifications reach it either
//! directly through [`ResultCollector::handle_event`], which may be called from any number of
//! threads, or through a channel via [`ResultCollector::into_channel`].

mod dispatcher;
mod events;
mod imp;

pub use dispatcher::*;
pub use events::*;
pub use imp::*;
