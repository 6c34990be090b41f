// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `graph` - declaration events
//! * `network` - compilation and run lifecycle
//! * `process` - events raised by processes and their port handles

use tracing::Span;

pub mod graph;
pub mod network;
pub mod process;

/// Emits a message as a `tracing` event carrying its fields.
pub trait StructuredLog {
    /// Log the message at its designated level.
    fn log(&self);

    /// A span scoped to the subject of the message.
    fn span(&self, _name: &str) -> Span {
        Span::none()
    }
}
