// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{GraphError, Operation};
use crate::graph::port::{Direction, PortDescriptor, PortName};
use crate::graph::resolver::{resolve, ResolveError};
use crate::traits::Process;
use std::collections::BTreeMap;

/// Resolves one end of a declaration and checks it flows the `expected` way.
///
/// Checks run in a fixed order: process, port, transport capability, direction.
pub(crate) fn resolve_endpoint(
    processes: &BTreeMap<String, Box<dyn Process>>,
    op: Operation,
    process: &str,
    port: &str,
    expected: Direction,
) -> Result<PortDescriptor, GraphError> {
    let instance = processes
        .get(process)
        .ok_or_else(|| GraphError::ProcessNotFound {
            op,
            process: process.to_string(),
        })?;

    let descriptor = resolve(process, instance.as_ref(), &PortName::parse(port)).map_err(
        |err| match err {
            ResolveError::PortNotFound => GraphError::PortNotFound {
                op,
                process: process.to_string(),
                port: port.to_string(),
            },
            ResolveError::NotAChannel => GraphError::NotAChannel {
                op,
                process: process.to_string(),
                port: port.to_string(),
            },
        },
    )?;

    if descriptor.direction != expected {
        return Err(GraphError::DirectionMismatch {
            op,
            process: process.to_string(),
            port: port.to_string(),
            missing: expected.capability(),
        });
    }

    Ok(descriptor)
}
