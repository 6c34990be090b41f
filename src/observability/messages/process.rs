// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types raised from inside running processes.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A process asked for a port with a packet type other than the one it was wired with.
///
/// # Log Level
/// `warn!` - The process sees the port as unbound
pub struct PortTypeMismatch<'a> {
    pub process: &'a str,
    pub port: &'a str,
    pub bound: &'static str,
    pub requested: &'static str,
}

impl Display for PortTypeMismatch<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Process '{}' requested port '{}' as {}, but it carries {}",
            self.process, self.port, self.requested, self.bound
        )
    }
}

impl StructuredLog for PortTypeMismatch<'_> {
    fn log(&self) {
        tracing::warn!(
            process = self.process,
            port = self.port,
            bound = self.bound,
            requested = self.requested,
            "{}", self
        );
    }
}

/// Packets arriving on a port were discarded.
///
/// # Log Level
/// `debug!` - Expected when an input has no matching output
pub struct PacketsDropped<'a> {
    pub process: &'a str,
    pub port: &'a str,
    pub count: usize,
}

impl Display for PacketsDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Process '{}' dropped {} packets from port '{}'",
            self.process, self.count, self.port
        )
    }
}

impl StructuredLog for PacketsDropped<'_> {
    fn log(&self) {
        tracing::debug!(
            process = self.process,
            port = self.port,
            count = self.count,
            "{}", self
        );
    }
}

/// A received packet did not downcast to the port's element type and was skipped.
///
/// # Log Level
/// `warn!` - Only reachable through mistyped external transports
pub struct ForeignPacket<'a> {
    pub process: &'a str,
    pub port: &'a str,
    pub expected: &'static str,
}

impl Display for ForeignPacket<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Process '{}' skipped a packet on '{}' that is not {}",
            self.process, self.port, self.expected
        )
    }
}

impl StructuredLog for ForeignPacket<'_> {
    fn log(&self) {
        tracing::warn!(
            process = self.process,
            port = self.port,
            expected = self.expected,
            "{}", self
        );
    }
}
