// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod completion;
mod grouping;
mod network;
mod ports;
mod transport;
#[cfg(test)]
mod integration_tests;

pub use completion::{Completion, NetworkSummary};
pub use network::{run, run_until, run_with};
pub use ports::{InPort, OutPort, PortSet};
pub use transport::Transport;

pub(crate) use network::{Network, Scope};
pub(crate) use transport::{Packet, RawTransport};
