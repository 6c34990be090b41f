// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::PortRef;
use thiserror::Error;

/// Errors raised while compiling a graph into a running network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// A top-level exported port has no external transport bound to it
    #[error("run: exported port '{0}' is not bound to a transport")]
    UnboundExport(String),

    /// Two exports landed in one port group but carry different external transports
    #[error("run: exports '{first}' and '{second}' share a port group but are bound to different transports")]
    ConflictingBindings { first: String, second: String },

    /// A recorded port no longer appears in its process's port table
    #[error("run: port '{0}' no longer resolves")]
    Unresolved(PortRef),
}
