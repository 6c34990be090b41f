// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Port handles handed to a running process.
//!
//! The network compiler gives every process a [`PortSet`] holding the transports
//! bound to its connected ports. A process takes typed [`InPort`]s and
//! [`OutPort`]s out of it by name; ports that were never connected are simply
//! absent. Dropping an `OutPort`, or the `PortSet` still holding it, releases
//! that port's writer lease.

use std::collections::HashMap;
use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;

use crate::config::NetworkOptions;
use crate::engine::completion::FailureLog;
use crate::engine::transport::{RawTransport, WriterLease};
use crate::errors::SendError;
use crate::graph::{ElementType, PortName};
use crate::observability::messages::process::{ForeignPacket, PortTypeMismatch};
use crate::observability::messages::StructuredLog;

pub(crate) enum Binding {
    Input(RawTransport),
    Output(WriterLease),
}

impl Binding {
    fn element(&self) -> ElementType {
        match self {
            Binding::Input(transport) => transport.element(),
            Binding::Output(lease) => lease.transport().element(),
        }
    }
}

/// The transports a nested graph inherits from its parent.
pub(crate) struct Boundary {
    pub(crate) process: String,
    pub(crate) transports: HashMap<String, RawTransport>,
    pub(crate) leases: Vec<WriterLease>,
    pub(crate) cancel: CancellationToken,
    pub(crate) options: NetworkOptions,
    pub(crate) failures: FailureLog,
}

pub struct PortSet {
    process: String,
    bindings: HashMap<PortName, Binding>,
    cancel: CancellationToken,
    options: NetworkOptions,
    failures: FailureLog,
}

impl PortSet {
    pub(crate) fn new(
        process: impl Into<String>,
        cancel: CancellationToken,
        options: NetworkOptions,
        failures: FailureLog,
    ) -> Self {
        Self {
            process: process.into(),
            bindings: HashMap::new(),
            cancel,
            options,
            failures,
        }
    }

    pub(crate) fn bind(&mut self, port: PortName, binding: Binding) {
        self.bindings.insert(port, binding);
    }

    /// Name of the process these ports belong to.
    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of ports still held.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Takes the input port `name` (plain or `base[key]`).
    ///
    /// `None` if the port is not connected or carries something other than `T`.
    pub fn input<T: Send + 'static>(&mut self, name: &str) -> Option<InPort<T>> {
        let port = PortName::parse(name);
        match self.take::<T>(&port)? {
            Binding::Input(transport) => Some(self.in_port(port, transport)),
            other => {
                self.bindings.insert(port, other);
                None
            }
        }
    }

    /// Takes the output port `name` (plain or `base[key]`).
    pub fn output<T: Send + 'static>(&mut self, name: &str) -> Option<OutPort<T>> {
        let port = PortName::parse(name);
        match self.take::<T>(&port)? {
            Binding::Output(lease) => Some(self.out_port(port, lease)),
            other => {
                self.bindings.insert(port, other);
                None
            }
        }
    }

    /// Takes every connected member of the keyed input family `base`, ordered by key.
    pub fn keyed_inputs<T: Send + 'static>(&mut self, base: &str) -> Vec<(String, InPort<T>)> {
        self.keyed_names(base, true)
            .into_iter()
            .filter_map(|(key, port)| {
                let name = port.to_string();
                self.input::<T>(&name).map(|input| (key, input))
            })
            .collect()
    }

    /// Takes every connected member of the keyed output family `base`, ordered by key.
    pub fn keyed_outputs<T: Send + 'static>(&mut self, base: &str) -> Vec<(String, OutPort<T>)> {
        self.keyed_names(base, false)
            .into_iter()
            .filter_map(|(key, port)| {
                let name = port.to_string();
                self.output::<T>(&name).map(|output| (key, output))
            })
            .collect()
    }

    fn keyed_names(&self, base: &str, inputs: bool) -> Vec<(String, PortName)> {
        let mut names: Vec<_> = self
            .bindings
            .iter()
            .filter(|(port, binding)| {
                port.base() == base && matches!(binding, Binding::Input(_)) == inputs
            })
            .filter_map(|(port, _)| port.key().map(|key| (key.to_string(), port.clone())))
            .collect();
        names.sort();
        names
    }

    fn take<T: Send + 'static>(&mut self, port: &PortName) -> Option<Binding> {
        let element = self.bindings.get(port)?.element();
        if !element.is::<T>() {
            PortTypeMismatch {
                process: &self.process,
                port: &port.to_string(),
                bound: element.name(),
                requested: std::any::type_name::<T>(),
            }
            .log();
            return None;
        }
        self.bindings.remove(port)
    }

    fn in_port<T>(&self, port: PortName, transport: RawTransport) -> InPort<T> {
        InPort {
            process: self.process.clone(),
            port,
            transport,
            cancel: self.cancel.clone(),
            _marker: PhantomData,
        }
    }

    fn out_port<T>(&self, port: PortName, lease: WriterLease) -> OutPort<T> {
        OutPort {
            port,
            lease,
            cancel: self.cancel.clone(),
            _marker: PhantomData,
        }
    }

    /// Hands the remaining bindings to a nested graph, keyed by export name.
    ///
    /// Output leases are returned alongside so the caller holds them until the
    /// nested network has finished.
    pub(crate) fn into_boundary(self) -> Boundary {
        let mut transports = HashMap::with_capacity(self.bindings.len());
        let mut leases = Vec::new();
        for (port, binding) in self.bindings {
            match binding {
                Binding::Input(transport) => {
                    transports.insert(port.to_string(), transport);
                }
                Binding::Output(lease) => {
                    transports.insert(port.to_string(), lease.transport().clone());
                    leases.push(lease);
                }
            }
        }
        Boundary {
            process: self.process,
            transports,
            leases,
            cancel: self.cancel,
            options: self.options,
            failures: self.failures,
        }
    }
}

impl std::fmt::Debug for PortSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ports: Vec<_> = self.bindings.keys().map(ToString::to_string).collect();
        ports.sort();
        f.debug_struct("PortSet")
            .field("process", &self.process)
            .field("ports", &ports)
            .finish()
    }
}

/// Receiving end of a connected input port.
pub struct InPort<T> {
    process: String,
    port: PortName,
    transport: RawTransport,
    cancel: CancellationToken,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for InPort<T> {
    fn clone(&self) -> Self {
        Self {
            process: self.process.clone(),
            port: self.port.clone(),
            transport: self.transport.clone(),
            cancel: self.cancel.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> InPort<T> {
    /// Next packet, or `None` once every writer has finished and the queue is
    /// drained, or the run is cancelled.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let packet = self.transport.recv_until(&self.cancel).await?;
            match packet.downcast::<T>() {
                Ok(value) => return Some(*value),
                Err(_) => ForeignPacket {
                    process: &self.process,
                    port: &self.port.to_string(),
                    expected: std::any::type_name::<T>(),
                }
                .log(),
            }
        }
    }

    pub fn name(&self) -> &PortName {
        &self.port
    }
}

/// Sending end of a connected output port. Holds one writer lease.
pub struct OutPort<T> {
    port: PortName,
    lease: WriterLease,
    cancel: CancellationToken,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> OutPort<T> {
    pub async fn send(&self, value: T) -> Result<(), SendError> {
        self.lease
            .transport()
            .send_until(Box::new(value), &self.cancel)
            .await
    }

    /// Releases this writer now instead of when the process returns.
    pub fn close(self) {
        drop(self);
    }

    pub fn name(&self) -> &PortName {
        &self.port
    }
}
