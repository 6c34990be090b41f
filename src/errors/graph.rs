// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors returned by the graph declaration API.
//!
//! Every failing declaration leaves the graph untouched, so callers can report
//! the error and keep building.

use crate::graph::{ChannelDir, PortRef};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// The declaration call an error came from, used as the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    MapInPort,
    MapOutPort,
    AddIip,
    SetInPort,
    SetOutPort,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::MapInPort => "map_in_port",
            Operation::MapOutPort => "map_out_port",
            Operation::AddIip => "add_iip",
            Operation::SetInPort => "set_in_port",
            Operation::SetOutPort => "set_out_port",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A process with this name is already registered
    #[error("add: process '{0}' already exists")]
    DuplicateProcess(String),

    #[error("{op}: process '{process}' not found")]
    ProcessNotFound { op: Operation, process: String },

    /// The port is absent, or a keyed family was addressed without a key (or vice versa)
    #[error("{op}: process '{process}' does not have port '{port}'")]
    PortNotFound {
        op: Operation,
        process: String,
        port: String,
    },

    /// The member exists but cannot carry packets
    #[error("{op} '{process}.{port}': not a channel")]
    NotAChannel {
        op: Operation,
        process: String,
        port: String,
    },

    /// The port lacks the capability required at this end of the declaration
    #[error("{op} '{process}.{port}': channel does not support direction {missing}")]
    DirectionMismatch {
        op: Operation,
        process: String,
        port: String,
        missing: ChannelDir,
    },

    #[error("{op} '{sender}' -> '{receiver}': element type mismatch ({sent} vs {received})")]
    TypeMismatch {
        op: Operation,
        sender: PortRef,
        receiver: PortRef,
        sent: &'static str,
        received: &'static str,
    },

    /// An initial packet does not have the element type of its target port
    #[error("{op} '{target}': value of type {actual} does not match element type {expected}")]
    ValueTypeMismatch {
        op: Operation,
        target: PortRef,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{op}: port '{name}' is already exported")]
    DuplicateExport { op: Operation, name: String },

    #[error("{op}: graph does not export port '{name}'")]
    UnknownExport { op: Operation, name: String },

    #[error("{op}: exported port '{name}' is not an in-port")]
    NotAnInPort { op: Operation, name: String },

    #[error("{op}: exported port '{name}' is not an out-port")]
    NotAnOutPort { op: Operation, name: String },

    #[error("{op}: exported port '{name}' carries {expected}, transport carries {actual}")]
    ExportTypeMismatch {
        op: Operation,
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}
