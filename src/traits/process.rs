use async_trait::async_trait;

use crate::engine::PortSet;
use crate::graph::PortSpec;

/// A unit of computation that can be placed in a graph.
///
/// The engine only looks at the port table and calls [`run`](Process::run) once.
/// `run` should return when the process's inputs are exhausted; every output
/// handle it still holds is released when the `PortSet` (or the handle taken
/// from it) is dropped, which is what lets downstream processes finish.
#[async_trait]
pub trait Process: Send + 'static {
    /// Ports this process exposes, by name.
    fn ports(&self) -> Vec<PortSpec>;

    async fn run(&mut self, ports: PortSet);
}
