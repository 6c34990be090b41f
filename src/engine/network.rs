// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The network compiler and scheduler.
//!
//! Compiling a [`Graph`] happens in a fixed order:
//!
//! 1. Resolve every port referenced by a connection, initial packet or bound
//!    export, and group ports joined by connections.
//! 2. Allocate one transport per group, or reuse the external transport bound to
//!    an export in the group. A group fed by several bound input transports gets
//!    its own transport and one relay per input.
//! 3. Register writers: one lease per distinct source port, one per initial
//!    packet, one per relay. Writers into a caller's input transport hold shared
//!    leases and never close it. Internal groups that end up with no writer are
//!    closed right away.
//! 4. Hand each process a [`PortSet`] with its bindings.
//!
//! Starting the network spawns one task per process, relay and initial packet;
//! a supervisor task reports completion once all of them have ended and every
//! bound output transport has closed.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::NetworkOptions;
use crate::engine::completion::{Completion, FailureLog, NetworkSummary};
use crate::engine::grouping::PortGroups;
use crate::engine::ports::{Binding, PortSet};
use crate::engine::transport::{Packet, RawTransport, WriterLease};
use crate::errors::RunError;
use crate::graph::resolver::resolve;
use crate::graph::{Direction, ElementType, Graph, GraphParts, PortDescriptor, PortRef};
use crate::observability::messages::network::{
    CompilationFailed, ExportSkipped, InitialPacketUndelivered, NetworkCompiled,
    NetworkCompleted, ProcessFinished, ProcessPanicked, ProcessStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Process;

/// Whether a network is the outermost one or runs a subgraph inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    TopLevel,
    Nested,
}

impl Scope {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Scope::TopLevel => "top-level",
            Scope::Nested => "nested",
        }
    }
}

struct ProcessTask {
    name: String,
    process: Box<dyn Process>,
    ports: PortSet,
}

struct Delivery {
    target: PortRef,
    packet: Packet,
    lease: WriterLease,
}

struct Relay {
    from: RawTransport,
    lease: WriterLease,
}

struct BoundExport {
    name: String,
    inner: PortRef,
    direction: Direction,
    transport: RawTransport,
}

/// A compiled graph, ready to start. Runs once.
pub(crate) struct Network {
    scope: Scope,
    processes: Vec<ProcessTask>,
    deliveries: Vec<Delivery>,
    relays: Vec<Relay>,
    watched: Vec<RawTransport>,
    transports: usize,
    cancel: CancellationToken,
    failures: FailureLog,
}

fn describe(
    processes: &BTreeMap<String, Box<dyn Process>>,
    descriptors: &mut HashMap<PortRef, PortDescriptor>,
    port: &PortRef,
) -> Result<(), RunError> {
    if descriptors.contains_key(port) {
        return Ok(());
    }
    let process = processes
        .get(&port.process)
        .ok_or_else(|| RunError::Unresolved(port.clone()))?;
    let descriptor = resolve(&port.process, process.as_ref(), &port.port)
        .map_err(|_| RunError::Unresolved(port.clone()))?;
    descriptors.insert(port.clone(), descriptor);
    Ok(())
}

impl Network {
    /// Compiles `graph`, binding `external` transports to its exports by name.
    pub(crate) fn compile(
        graph: Graph,
        external: HashMap<String, RawTransport>,
        options: &NetworkOptions,
        cancel: CancellationToken,
        scope: Scope,
    ) -> Result<Self, RunError> {
        Self::build(graph.into_parts(), external, options, cancel, scope).map_err(|error| {
            CompilationFailed {
                scope: scope.as_str(),
                error: &error,
            }
            .log();
            error
        })
    }

    fn build(
        parts: GraphParts,
        external: HashMap<String, RawTransport>,
        options: &NetworkOptions,
        cancel: CancellationToken,
        scope: Scope,
    ) -> Result<Self, RunError> {
        let GraphParts {
            processes,
            connections,
            exports,
            iips,
            mut bindings,
        } = parts;
        bindings.extend(external);
        let strict = scope == Scope::TopLevel && options.require_bound_exports;

        let mut descriptors = HashMap::new();
        let mut groups = PortGroups::new();

        for connection in &connections {
            describe(&processes, &mut descriptors, &connection.sender)?;
            describe(&processes, &mut descriptors, &connection.receiver)?;
            groups.union(&connection.sender, &connection.receiver);
        }
        for iip in &iips {
            describe(&processes, &mut descriptors, &iip.target)?;
            groups.insert(&iip.target);
        }

        let mut bound = Vec::new();
        for export in exports.values() {
            match bindings.get(&export.name) {
                Some(transport) => {
                    describe(&processes, &mut descriptors, &export.inner)?;
                    groups.insert(&export.inner);
                    bound.push(BoundExport {
                        name: export.name.clone(),
                        inner: export.inner.clone(),
                        direction: export.direction,
                        transport: transport.clone(),
                    });
                }
                None if strict => return Err(RunError::UnboundExport(export.name.clone())),
                None => ExportSkipped { name: &export.name }.log(),
            }
        }

        let grouping = groups.finish();
        let group_count = grouping.len();

        let mut external_of: Vec<Vec<&BoundExport>> = vec![Vec::new(); group_count];
        for export in &bound {
            let group = grouping
                .group_of(&export.inner)
                .ok_or_else(|| RunError::Unresolved(export.inner.clone()))?;
            // Several inputs can feed one group; an output transport cannot be shared.
            let clash = external_of[group].iter().find(|seen| {
                seen.transport.id() != export.transport.id()
                    && (seen.direction == Direction::Source || export.direction == Direction::Source)
            });
            if let Some(first) = clash {
                return Err(RunError::ConflictingBindings {
                    first: first.name.clone(),
                    second: export.name.clone(),
                });
            }
            external_of[group].push(export);
        }

        let mut requested: Vec<Option<usize>> = vec![None; group_count];
        for connection in &connections {
            if let (Some(buffer), Some(group)) =
                (connection.buffer, grouping.group_of(&connection.sender))
            {
                requested[group] = Some(requested[group].map_or(buffer, |seen| seen.max(buffer)));
            }
        }

        let mut transports = Vec::with_capacity(group_count);
        let mut caller_owned = vec![false; group_count];
        let mut relays = Vec::new();
        for (group, members) in grouping.members.iter().enumerate() {
            let mut distinct: Vec<&RawTransport> = Vec::new();
            for export in &external_of[group] {
                if distinct.iter().all(|seen| seen.id() != export.transport.id()) {
                    distinct.push(&export.transport);
                }
            }

            let transport = if distinct.len() == 1 {
                caller_owned[group] = external_of[group]
                    .iter()
                    .any(|export| export.direction == Direction::Sink);
                distinct[0].clone()
            } else {
                // groups are never empty
                let element = members
                    .iter()
                    .find_map(|port| descriptors.get(port))
                    .map_or_else(ElementType::of::<()>, |descriptor| descriptor.element);
                let transport =
                    RawTransport::new(requested[group].unwrap_or(options.default_buffer), element);
                for from in distinct {
                    relays.push(Relay {
                        from: from.clone(),
                        lease: transport.lease(),
                    });
                }
                transport
            };
            transports.push(transport);
        }

        let writer = |group: usize| {
            if caller_owned[group] {
                transports[group].share()
            } else {
                transports[group].lease()
            }
        };

        let failures = FailureLog::default();
        let mut port_sets: BTreeMap<String, PortSet> = processes
            .keys()
            .map(|name| {
                (
                    name.clone(),
                    PortSet::new(
                        name.as_str(),
                        cancel.clone(),
                        options.clone(),
                        failures.clone(),
                    ),
                )
            })
            .collect();

        for (group, members) in grouping.members.iter().enumerate() {
            for port in members {
                let descriptor = descriptors
                    .get(port)
                    .ok_or_else(|| RunError::Unresolved(port.clone()))?;
                let binding = match descriptor.direction {
                    Direction::Sink => Binding::Input(transports[group].clone()),
                    Direction::Source => Binding::Output(writer(group)),
                };
                port_sets
                    .get_mut(&port.process)
                    .ok_or_else(|| RunError::Unresolved(port.clone()))?
                    .bind(port.port.clone(), binding);
            }
        }

        let mut deliveries = Vec::with_capacity(iips.len());
        for iip in iips {
            let group = grouping
                .group_of(&iip.target)
                .ok_or_else(|| RunError::Unresolved(iip.target.clone()))?;
            deliveries.push(Delivery {
                lease: writer(group),
                target: iip.target,
                packet: iip.value,
            });
        }

        for (group, transport) in transports.iter().enumerate() {
            if external_of[group].is_empty() && transport.writers() == 0 {
                transport.shut();
            }
        }

        let watched = match scope {
            Scope::TopLevel => bound
                .iter()
                .filter(|export| export.direction == Direction::Source)
                .map(|export| export.transport.clone())
                .collect(),
            Scope::Nested => Vec::new(),
        };

        let processes: Vec<ProcessTask> = processes
            .into_iter()
            .filter_map(|(name, process)| {
                port_sets.remove(&name).map(|ports| ProcessTask {
                    name,
                    process,
                    ports,
                })
            })
            .collect();

        NetworkCompiled {
            scope: scope.as_str(),
            processes: processes.len(),
            transports: group_count,
            initial_packets: deliveries.len(),
        }
        .log();

        Ok(Self {
            scope,
            processes,
            deliveries,
            relays,
            watched,
            transports: group_count,
            cancel,
            failures,
        })
    }

    /// Spawns every task and returns the completion signal.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start(self) -> Completion {
        let Network {
            scope,
            processes,
            deliveries,
            relays,
            watched,
            transports,
            cancel,
            failures,
        } = self;
        let started = Instant::now();
        let process_count = processes.len();
        let initial_packets = deliveries.len();

        let mut tasks = Vec::with_capacity(process_count);
        for ProcessTask {
            name,
            mut process,
            ports,
        } in processes
        {
            let span = ProcessStarted { process: &name }.span("process");
            let task_name = name.clone();
            let handle = tokio::spawn(
                async move {
                    ProcessStarted { process: &task_name }.log();
                    let begun = Instant::now();
                    process.run(ports).await;
                    ProcessFinished {
                        process: &task_name,
                        elapsed: begun.elapsed(),
                    }
                    .log();
                }
                .instrument(span),
            );
            tasks.push((name, handle));
        }

        let mut feeders = Vec::with_capacity(initial_packets);
        for Delivery {
            target,
            packet,
            lease,
        } in deliveries
        {
            let cancel = cancel.clone();
            feeders.push(tokio::spawn(async move {
                if let Err(error) = lease.transport().send_until(packet, &cancel).await {
                    InitialPacketUndelivered {
                        target: &target.to_string(),
                        reason: &error.to_string(),
                    }
                    .log();
                }
                drop(lease);
            }));
        }

        for Relay { from, lease } in relays {
            let cancel = cancel.clone();
            feeders.push(tokio::spawn(async move {
                while let Some(packet) = from.recv_until(&cancel).await {
                    if lease.transport().send_until(packet, &cancel).await.is_err() {
                        break;
                    }
                }
                drop(lease);
            }));
        }

        let (done, receiver) = oneshot::channel();
        tokio::spawn(async move {
            let mut panicked = Vec::new();
            for (name, handle) in tasks {
                if let Err(error) = handle.await {
                    let reason = if error.is_panic() {
                        panic_message(error.into_panic())
                    } else {
                        "task cancelled".to_string()
                    };
                    ProcessPanicked {
                        process: &name,
                        reason: &reason,
                    }
                    .log();
                    panicked.push(name);
                }
            }

            // Every reader is gone; packets still waiting to be sent or relayed have no destination.
            for feeder in feeders {
                if !feeder.is_finished() {
                    feeder.abort();
                }
                let _ = feeder.await;
            }

            for transport in &watched {
                transport.closed().await;
            }

            let summary = NetworkSummary {
                processes: process_count,
                initial_packets,
                transports,
                panicked,
                failed: failures.take(),
                elapsed: started.elapsed(),
                interrupted: false,
            };
            NetworkCompleted {
                scope: scope.as_str(),
                processes: summary.processes,
                panicked: summary.panicked.len(),
                failed: summary.failed.len(),
                elapsed: summary.elapsed,
            }
            .log();
            let _ = done.send(summary);
        });

        Completion::new(receiver)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Compiles and starts `graph` with default options.
///
/// Fails if a top-level export has no transport bound to it. The returned
/// [`Completion`] resolves once the network has finished. Must be called from
/// within a Tokio runtime.
pub fn run(graph: Graph) -> Result<Completion, RunError> {
    run_with(graph, &NetworkOptions::default())
}

pub fn run_with(graph: Graph, options: &NetworkOptions) -> Result<Completion, RunError> {
    run_until(graph, options, CancellationToken::new())
}

/// Like [`run_with`], stopping cooperatively once `cancel` fires: receives report
/// end of input and sends fail with [`SendError::Cancelled`](crate::errors::SendError::Cancelled).
pub fn run_until(
    graph: Graph,
    options: &NetworkOptions,
    cancel: CancellationToken,
) -> Result<Completion, RunError> {
    Network::compile(graph, HashMap::new(), options, cancel, Scope::TopLevel).map(Network::start)
}
