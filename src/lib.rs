// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod components; // reference processes
pub mod config;     // network options
pub mod engine;     // network compiler, transports, scheduling
pub mod errors;     // error handling
pub mod graph;      // declaration model + port resolution
pub mod observability;
pub mod traits;     // the Process capability

pub use config::NetworkOptions;
pub use engine::{run, run_until, run_with, Completion, NetworkSummary, Transport};
pub use errors::{GraphError, RunError, SendError};
pub use graph::Graph;
pub use traits::Process;
