// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Port resolution against a process's declared port table.
//!
//! A nested [`Graph`](crate::graph::Graph) publishes its exports as its port
//! table, so the same lookup serves ordinary processes and subgraphs.

use crate::graph::port::{PortDescriptor, PortKind, PortName, PortRef};
use crate::traits::Process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolveError {
    /// No port by that name, or the key does not fit the port's cardinality
    PortNotFound,
    NotAChannel,
}

pub(crate) fn resolve(
    process_name: &str,
    process: &dyn Process,
    port: &PortName,
) -> Result<PortDescriptor, ResolveError> {
    let specs = process.ports();
    let spec = specs
        .iter()
        .find(|spec| spec.name() == port.base())
        .ok_or(ResolveError::PortNotFound)?;

    match spec.kind() {
        PortKind::Field { .. } => Err(ResolveError::NotAChannel),
        PortKind::Channel {
            direction,
            element,
            keyed,
        } => {
            if *keyed != port.key().is_some() {
                return Err(ResolveError::PortNotFound);
            }
            Ok(PortDescriptor {
                port_ref: PortRef::new(process_name, port.clone()),
                direction: *direction,
                element: *element,
            })
        }
    }
}
