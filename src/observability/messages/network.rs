// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for network compilation and run lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Compiling a graph into transports and tasks
//! * Process task start, finish and panic
//! * Transport close and writer accounting
//! * Network completion

use crate::errors::RunError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A graph was compiled into a runnable network.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkCompiled<'a> {
    pub scope: &'a str,
    pub processes: usize,
    pub transports: usize,
    pub initial_packets: usize,
}

impl Display for NetworkCompiled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compiled {} network: {} processes, {} transports, {} initial packets",
            self.scope, self.processes, self.transports, self.initial_packets
        )
    }
}

impl StructuredLog for NetworkCompiled<'_> {
    fn log(&self) {
        tracing::info!(
            scope = self.scope,
            processes = self.processes,
            transports = self.transports,
            initial_packets = self.initial_packets,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network",
            span_name = name,
            scope = self.scope,
            processes = self.processes,
        )
    }
}

/// A graph could not be compiled.
///
/// # Log Level
/// `error!` - The network will not run
pub struct CompilationFailed<'a> {
    pub scope: &'a str,
    pub error: &'a RunError,
}

impl Display for CompilationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to compile {} network: {}", self.scope, self.error)
    }
}

impl StructuredLog for CompilationFailed<'_> {
    fn log(&self) {
        tracing::error!(scope = self.scope, error = %self.error, "{}", self);
    }
}

/// A nested graph export has nothing bound to it in the parent and is left out.
///
/// # Log Level
/// `debug!` - Expected for partially wired subgraphs
pub struct ExportSkipped<'a> {
    pub name: &'a str,
}

impl Display for ExportSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Export '{}' is not wired by the parent graph", self.name)
    }
}

impl StructuredLog for ExportSkipped<'_> {
    fn log(&self) {
        tracing::debug!(export = self.name, "{}", self);
    }
}

/// A transport lost its last writer, or was closed explicitly.
///
/// # Log Level
/// `trace!` - High volume in large networks
pub struct TransportClosed {
    pub transport: u64,
}

impl Display for TransportClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Transport #{} closed", self.transport)
    }
}

impl StructuredLog for TransportClosed {
    fn log(&self) {
        tracing::trace!(transport = self.transport, "{}", self);
    }
}

/// More writers were released than were registered.
///
/// # Log Level
/// `warn!` - Accounting bug; the transport is already closed
pub struct WriterUnderflow {
    pub transport: u64,
}

impl Display for WriterUnderflow {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Transport #{} released a writer it never registered",
            self.transport
        )
    }
}

impl StructuredLog for WriterUnderflow {
    fn log(&self) {
        tracing::warn!(transport = self.transport, "{}", self);
    }
}

/// A process task started.
///
/// # Log Level
/// `debug!` - Task lifecycle
pub struct ProcessStarted<'a> {
    pub process: &'a str,
}

impl Display for ProcessStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Process '{}' started", self.process)
    }
}

impl StructuredLog for ProcessStarted<'_> {
    fn log(&self) {
        tracing::debug!(process = self.process, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("process", span_name = name, process = self.process)
    }
}

/// A process task returned from its activation routine.
///
/// # Log Level
/// `debug!` - Task lifecycle
pub struct ProcessFinished<'a> {
    pub process: &'a str,
    pub elapsed: Duration,
}

impl Display for ProcessFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Process '{}' finished in {:?}", self.process, self.elapsed)
    }
}

impl StructuredLog for ProcessFinished<'_> {
    fn log(&self) {
        tracing::debug!(
            process = self.process,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }
}

/// A process task panicked. Its writer leases were released during unwind.
///
/// # Log Level
/// `error!` - The process did not finish normally
pub struct ProcessPanicked<'a> {
    pub process: &'a str,
    pub reason: &'a str,
}

impl Display for ProcessPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Process '{}' panicked: {}", self.process, self.reason)
    }
}

impl StructuredLog for ProcessPanicked<'_> {
    fn log(&self) {
        tracing::error!(process = self.process, reason = self.reason, "{}", self);
    }
}

/// A process ended without panicking but could not do its work, e.g. a
/// subgraph whose nested network failed to compile.
///
/// # Log Level
/// `error!` - The run will not be reported clean
pub struct ProcessFailed<'a> {
    pub process: &'a str,
    pub reason: &'a str,
}

impl Display for ProcessFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Process '{}' failed: {}", self.process, self.reason)
    }
}

impl StructuredLog for ProcessFailed<'_> {
    fn log(&self) {
        tracing::error!(process = self.process, reason = self.reason, "{}", self);
    }
}

/// An initial packet could not be delivered.
///
/// # Log Level
/// `warn!` - Target closed or the run was cancelled
pub struct InitialPacketUndelivered<'a> {
    pub target: &'a str,
    pub reason: &'a str,
}

impl Display for InitialPacketUndelivered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Initial packet for '{}' was not delivered: {}",
            self.target, self.reason
        )
    }
}

impl StructuredLog for InitialPacketUndelivered<'_> {
    fn log(&self) {
        tracing::warn!(target_port = self.target, reason = self.reason, "{}", self);
    }
}

/// Every task ended and every bound output closed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkCompleted<'a> {
    pub scope: &'a str,
    pub processes: usize,
    pub panicked: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl Display for NetworkCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} network completed: {} processes ({} panicked, {} failed) in {:?}",
            self.scope, self.processes, self.panicked, self.failed, self.elapsed
        )
    }
}

impl StructuredLog for NetworkCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            scope = self.scope,
            processes = self.processes,
            panicked = self.panicked,
            failed = self.failed,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }
}
