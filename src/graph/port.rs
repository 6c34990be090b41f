// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Port vocabulary shared by the declaration model and the network compiler.
//!
//! A process publishes its ports as a table of [`PortSpec`]s. Each channel port
//! has a fixed [`Direction`] and [`ElementType`]; keyed ports form an open-ended
//! family addressed with the textual form `base[key]` (for example `In[e1]`).
//! Members that are visible by name but cannot carry packets are declared as
//! fields so that wiring them is rejected with a precise diagnostic.

use std::any::{type_name, TypeId};
use std::fmt::{self, Display, Formatter};

/// Which way packets flow through a port, from the owning process's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The process writes packets out of the port.
    Source,
    /// The process reads packets from the port.
    Sink,
}

impl Direction {
    /// The channel capability a port must offer to be used in this direction.
    pub fn capability(self) -> ChannelDir {
        match self {
            Direction::Source => ChannelDir::Send,
            Direction::Sink => ChannelDir::Recv,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Source => write!(f, "source"),
            Direction::Sink => write!(f, "sink"),
        }
    }
}

/// Send/receive capability of a channel, rendered in channel-type notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelDir {
    Send,
    Recv,
}

impl Display for ChannelDir {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChannelDir::Send => write!(f, "chan<-"),
            ChannelDir::Recv => write!(f, "<-chan"),
        }
    }
}

/// Runtime tag for the type of packets a port carries.
#[derive(Clone, Copy)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    pub fn of<T: Send + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ElementType {}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ElementType({})", self.name)
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// What a named member of a process is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    /// A transport-capable port. `keyed` ports are addressed as `name[key]`.
    Channel {
        direction: Direction,
        element: ElementType,
        keyed: bool,
    },
    /// A member that is visible by name but cannot carry packets.
    Field { type_name: &'static str },
}

/// One entry of a process's port table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    name: String,
    kind: PortKind,
}

impl PortSpec {
    pub fn input<T: Send + 'static>(name: impl Into<String>) -> Self {
        Self::channel(name, Direction::Sink, ElementType::of::<T>(), false)
    }

    pub fn output<T: Send + 'static>(name: impl Into<String>) -> Self {
        Self::channel(name, Direction::Source, ElementType::of::<T>(), false)
    }

    pub fn keyed_input<T: Send + 'static>(name: impl Into<String>) -> Self {
        Self::channel(name, Direction::Sink, ElementType::of::<T>(), true)
    }

    pub fn keyed_output<T: Send + 'static>(name: impl Into<String>) -> Self {
        Self::channel(name, Direction::Source, ElementType::of::<T>(), true)
    }

    /// A named member that is not a channel.
    pub fn field<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Field {
                type_name: type_name::<T>(),
            },
        }
    }

    pub fn channel(
        name: impl Into<String>,
        direction: Direction,
        element: ElementType,
        keyed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Channel {
                direction,
                element,
                keyed,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PortKind {
        &self.kind
    }
}

/// A port name as written in declarations: a base name plus an optional key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortName {
    base: String,
    key: Option<String>,
}

impl PortName {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            key: None,
        }
    }

    pub fn keyed(base: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            key: Some(key.into()),
        }
    }

    /// Parses `base` or `base[key]`.
    ///
    /// Text that does not follow the keyed form is kept whole as the base name,
    /// so it simply fails to resolve later on.
    pub fn parse(raw: &str) -> Self {
        if let Some(stripped) = raw.strip_suffix(']') {
            if let Some((base, key)) = stripped.split_once('[') {
                if !base.is_empty() && !key.is_empty() && !key.contains(|c: char| c == '[' || c == ']') {
                    return Self::keyed(base, key);
                }
            }
        }
        Self::new(raw)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl Display for PortName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]", self.base, key),
            None => f.write_str(&self.base),
        }
    }
}

/// A `(process, port)` address inside one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub process: String,
    pub port: PortName,
}

impl PortRef {
    pub fn new(process: impl Into<String>, port: PortName) -> Self {
        Self {
            process: process.into(),
            port,
        }
    }
}

impl Display for PortRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.process, self.port)
    }
}

/// The result of resolving a port: where it is, which way it flows, what it carries.
///
/// The `port_ref` is the identity used to share transports between connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub port_ref: PortRef,
    pub direction: Direction,
    pub element: ElementType,
}
