// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;
mod network;
mod transport;

pub use config::ConfigError;
pub use graph::{GraphError, Operation};
pub use network::RunError;
pub use transport::SendError;
