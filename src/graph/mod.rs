// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod model;
mod port;
pub(crate) mod resolver;
mod validation;

pub use model::{BoundaryExport, Connection, Graph};
pub use port::{
    ChannelDir, Direction, ElementType, PortDescriptor, PortKind, PortName, PortRef, PortSpec,
};
pub(crate) use model::GraphParts;
