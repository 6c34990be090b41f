// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph declaration events.

use crate::errors::GraphError;
use crate::graph::{Direction, PortRef};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A process instance was registered with a graph.
///
/// # Log Level
/// `debug!` - Declaration detail
pub struct ProcessAdded<'a> {
    pub process: &'a str,
    pub port_count: usize,
}

impl Display for ProcessAdded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Process '{}' added with {} declared ports",
            self.process, self.port_count
        )
    }
}

impl StructuredLog for ProcessAdded<'_> {
    fn log(&self) {
        tracing::debug!(
            process = self.process,
            port_count = self.port_count,
            "{}", self
        );
    }
}

/// A validated connection was recorded.
///
/// # Log Level
/// `debug!` - Declaration detail
pub struct ConnectionDeclared<'a> {
    pub sender: &'a PortRef,
    pub receiver: &'a PortRef,
    pub buffer: Option<usize>,
}

impl Display for ConnectionDeclared<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.buffer {
            Some(buffer) => write!(
                f,
                "Connected '{}' -> '{}' (buffer {})",
                self.sender, self.receiver, buffer
            ),
            None => write!(f, "Connected '{}' -> '{}'", self.sender, self.receiver),
        }
    }
}

impl StructuredLog for ConnectionDeclared<'_> {
    fn log(&self) {
        tracing::debug!(
            sender = %self.sender,
            receiver = %self.receiver,
            buffer = ?self.buffer,
            "{}", self
        );
    }
}

/// An inner port was exported as a graph boundary port.
///
/// # Log Level
/// `debug!` - Declaration detail
pub struct PortExported<'a> {
    pub name: &'a str,
    pub inner: &'a PortRef,
    pub direction: Direction,
}

impl Display for PortExported<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let kind = match self.direction {
            Direction::Sink => "in-port",
            Direction::Source => "out-port",
        };
        write!(f, "Exported '{}' as {} '{}'", self.inner, kind, self.name)
    }
}

impl StructuredLog for PortExported<'_> {
    fn log(&self) {
        tracing::debug!(
            export = self.name,
            inner = %self.inner,
            direction = %self.direction,
            "{}", self
        );
    }
}

/// An initial packet was scheduled for delivery.
///
/// # Log Level
/// `debug!` - Declaration detail
pub struct InitialPacketDeclared<'a> {
    pub target: &'a PortRef,
    pub element: &'static str,
}

impl Display for InitialPacketDeclared<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Initial {} packet scheduled for '{}'",
            self.element, self.target
        )
    }
}

impl StructuredLog for InitialPacketDeclared<'_> {
    fn log(&self) {
        tracing::debug!(target_port = %self.target, element = self.element, "{}", self);
    }
}

/// A declaration call was refused; the graph is unchanged.
///
/// # Log Level
/// `warn!` - The caller asked for something invalid
pub struct DeclarationRejected<'a> {
    pub error: &'a GraphError,
}

impl Display for DeclarationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Declaration rejected: {}", self.error)
    }
}

impl StructuredLog for DeclarationRejected<'_> {
    fn log(&self) {
        tracing::warn!(error = %self.error, "{}", self);
    }
}
