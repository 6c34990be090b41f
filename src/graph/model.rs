// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The graph declaration model.
//!
//! A [`Graph`] records named process instances, validated connections, boundary
//! exports, initial packets and externally bound transports. Nothing runs and no
//! transport is created until the graph is handed to [`run`](crate::engine::run).
//! Every declaration method validates first and only then mutates, so a failed
//! call leaves the graph exactly as it was.
//!
//! A graph is itself a [`Process`] whose ports are its exports, which is how
//! subgraphs are composed.

use async_trait::async_trait;
use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::engine::{Network, Packet, PortSet, RawTransport, Scope, Transport};
use crate::errors::{GraphError, Operation};
use crate::graph::port::{Direction, ElementType, PortRef, PortSpec};
use crate::graph::validation::resolve_endpoint;
use crate::observability::messages::graph::{
    ConnectionDeclared, DeclarationRejected, InitialPacketDeclared, PortExported, ProcessAdded,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Process;

/// A validated sender → receiver link. Records intent only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub sender: PortRef,
    pub receiver: PortRef,
    /// Requested capacity for the transport of this connection's port group.
    pub buffer: Option<usize>,
}

/// An inner port published under a graph-level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryExport {
    pub name: String,
    pub inner: PortRef,
    /// `Sink` for graph inputs, `Source` for graph outputs.
    pub direction: Direction,
    pub element: ElementType,
}

pub(crate) struct InitialPacket {
    pub(crate) target: PortRef,
    pub(crate) value: Packet,
}

/// Everything a network compiler needs, moved out of a graph.
pub(crate) struct GraphParts {
    pub(crate) processes: BTreeMap<String, Box<dyn Process>>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) exports: BTreeMap<String, BoundaryExport>,
    pub(crate) iips: Vec<InitialPacket>,
    pub(crate) bindings: HashMap<String, RawTransport>,
}

#[derive(Default)]
pub struct Graph {
    processes: BTreeMap<String, Box<dyn Process>>,
    connections: Vec<Connection>,
    exports: BTreeMap<String, BoundaryExport>,
    iips: Vec<InitialPacket>,
    bindings: HashMap<String, RawTransport>,
}

fn rejected(error: GraphError) -> GraphError {
    DeclarationRejected { error: &error }.log();
    error
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a process instance under a name unique within this graph.
    pub fn add<P: Process>(&mut self, name: &str, process: P) -> Result<(), GraphError> {
        if self.processes.contains_key(name) {
            return Err(rejected(GraphError::DuplicateProcess(name.to_string())));
        }
        ProcessAdded {
            process: name,
            port_count: process.ports().len(),
        }
        .log();
        self.processes.insert(name.to_string(), Box::new(process));
        Ok(())
    }

    /// Connects `sender.sport` to `receiver.rport`.
    ///
    /// Ports may be keyed (`Out[k]`). The sender end is checked first, then the
    /// receiver end, then the element types.
    pub fn connect(
        &mut self,
        sender: &str,
        sport: &str,
        receiver: &str,
        rport: &str,
    ) -> Result<(), GraphError> {
        self.connect_with(sender, sport, receiver, rport, None)
    }

    /// Like [`connect`](Graph::connect), with an explicit transport capacity.
    ///
    /// When several connections share a port group the largest buffer wins.
    pub fn connect_buf(
        &mut self,
        sender: &str,
        sport: &str,
        receiver: &str,
        rport: &str,
        buffer: usize,
    ) -> Result<(), GraphError> {
        self.connect_with(sender, sport, receiver, rport, Some(buffer))
    }

    fn connect_with(
        &mut self,
        sender: &str,
        sport: &str,
        receiver: &str,
        rport: &str,
        buffer: Option<usize>,
    ) -> Result<(), GraphError> {
        let op = Operation::Connect;
        let source = resolve_endpoint(&self.processes, op, sender, sport, Direction::Source)
            .map_err(rejected)?;
        let sink = resolve_endpoint(&self.processes, op, receiver, rport, Direction::Sink)
            .map_err(rejected)?;

        if source.element != sink.element {
            return Err(rejected(GraphError::TypeMismatch {
                op,
                sender: source.port_ref,
                receiver: sink.port_ref,
                sent: source.element.name(),
                received: sink.element.name(),
            }));
        }

        let connection = Connection {
            sender: source.port_ref,
            receiver: sink.port_ref,
            buffer,
        };
        ConnectionDeclared {
            sender: &connection.sender,
            receiver: &connection.receiver,
            buffer,
        }
        .log();
        self.connections.push(connection);
        Ok(())
    }

    /// Exports the inner sink `process.port` as the graph input `name`.
    pub fn map_in_port(&mut self, name: &str, process: &str, port: &str) -> Result<(), GraphError> {
        self.export(Operation::MapInPort, name, process, port, Direction::Sink)
    }

    /// Exports the inner source `process.port` as the graph output `name`.
    pub fn map_out_port(&mut self, name: &str, process: &str, port: &str) -> Result<(), GraphError> {
        self.export(Operation::MapOutPort, name, process, port, Direction::Source)
    }

    fn export(
        &mut self,
        op: Operation,
        name: &str,
        process: &str,
        port: &str,
        direction: Direction,
    ) -> Result<(), GraphError> {
        if self.exports.contains_key(name) {
            return Err(rejected(GraphError::DuplicateExport {
                op,
                name: name.to_string(),
            }));
        }
        let inner =
            resolve_endpoint(&self.processes, op, process, port, direction).map_err(rejected)?;

        PortExported {
            name,
            inner: &inner.port_ref,
            direction,
        }
        .log();
        self.exports.insert(
            name.to_string(),
            BoundaryExport {
                name: name.to_string(),
                inner: inner.port_ref,
                direction,
                element: inner.element,
            },
        );
        Ok(())
    }

    /// Schedules `value` to be sent once into the sink `process.port` when the network starts.
    pub fn add_iip<T: Send + 'static>(
        &mut self,
        process: &str,
        port: &str,
        value: T,
    ) -> Result<(), GraphError> {
        let op = Operation::AddIip;
        let target =
            resolve_endpoint(&self.processes, op, process, port, Direction::Sink).map_err(rejected)?;

        if !target.element.is::<T>() {
            return Err(rejected(GraphError::ValueTypeMismatch {
                op,
                target: target.port_ref,
                expected: target.element.name(),
                actual: type_name::<T>(),
            }));
        }

        InitialPacketDeclared {
            target: &target.port_ref,
            element: target.element.name(),
        }
        .log();
        self.iips.push(InitialPacket {
            target: target.port_ref,
            value: Box::new(value),
        });
        Ok(())
    }

    /// Binds an external transport the caller will write into to the graph input `name`.
    pub fn set_in_port<T: Send + 'static>(
        &mut self,
        name: &str,
        transport: &Transport<T>,
    ) -> Result<(), GraphError> {
        self.bind(Operation::SetInPort, name, Direction::Sink, transport)
    }

    /// Binds an external transport the caller will read from to the graph output `name`.
    ///
    /// The network closes it once every inner writer has finished.
    pub fn set_out_port<T: Send + 'static>(
        &mut self,
        name: &str,
        transport: &Transport<T>,
    ) -> Result<(), GraphError> {
        self.bind(Operation::SetOutPort, name, Direction::Source, transport)
    }

    fn bind<T: Send + 'static>(
        &mut self,
        op: Operation,
        name: &str,
        direction: Direction,
        transport: &Transport<T>,
    ) -> Result<(), GraphError> {
        let export = self.exports.get(name).ok_or_else(|| {
            rejected(GraphError::UnknownExport {
                op,
                name: name.to_string(),
            })
        })?;

        if export.direction != direction {
            let name = name.to_string();
            return Err(rejected(match direction {
                Direction::Sink => GraphError::NotAnInPort { op, name },
                Direction::Source => GraphError::NotAnOutPort { op, name },
            }));
        }
        if !export.element.is::<T>() {
            return Err(rejected(GraphError::ExportTypeMismatch {
                op,
                name: name.to_string(),
                expected: export.element.name(),
                actual: type_name::<T>(),
            }));
        }

        self.bindings
            .insert(name.to_string(), transport.raw().clone());
        Ok(())
    }

    /// The inner port an export forwards to.
    pub fn resolve_export(&self, name: &str) -> Option<&BoundaryExport> {
        self.exports.get(name)
    }

    pub fn contains(&self, process: &str) -> bool {
        self.processes.contains_key(process)
    }

    pub fn process_names(&self) -> impl Iterator<Item = &str> {
        self.processes.keys().map(String::as_str)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn exports(&self) -> impl Iterator<Item = &BoundaryExport> {
        self.exports.values()
    }

    pub fn iip_count(&self) -> usize {
        self.iips.len()
    }

    /// Number of process instances.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub(crate) fn into_parts(self) -> GraphParts {
        GraphParts {
            processes: self.processes,
            connections: self.connections,
            exports: self.exports,
            iips: self.iips,
            bindings: self.bindings,
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("processes", &self.processes.keys().collect::<Vec<_>>())
            .field("connections", &self.connections)
            .field("exports", &self.exports.values().collect::<Vec<_>>())
            .field("iips", &self.iips.len())
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Process for Graph {
    fn ports(&self) -> Vec<PortSpec> {
        self.exports
            .values()
            .map(|export| PortSpec::channel(&export.name, export.direction, export.element, false))
            .collect()
    }

    /// Runs the subgraph as a nested network over the transports the parent allocated.
    async fn run(&mut self, ports: PortSet) {
        let graph = std::mem::take(self);
        let boundary = ports.into_boundary();

        match Network::compile(
            graph,
            boundary.transports,
            &boundary.options,
            boundary.cancel,
            Scope::Nested,
        ) {
            Ok(network) => {
                let summary = network.start().await;
                if !summary.is_clean() {
                    let mut unclean = summary.panicked;
                    unclean.extend(summary.failed);
                    let reason = if unclean.is_empty() {
                        "nested network was interrupted".to_string()
                    } else {
                        format!("nested processes did not finish: {}", unclean.join(", "))
                    };
                    boundary.failures.record(&boundary.process, &reason);
                }
            }
            Err(error) => boundary.failures.record(&boundary.process, &error.to_string()),
        }

        drop(boundary.leases);
    }
}
