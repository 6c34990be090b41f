// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use tokio::task::JoinSet;

use crate::engine::PortSet;
use crate::graph::PortSpec;
use crate::observability::messages::{process::PacketsDropped, StructuredLog};
use crate::traits::Process;

/// Router - forwards each keyed input `In[k]` to the output with the same key, `Out[k]`.
///
/// Keys are open-ended: whichever members the graph connects are routed. Packets on
/// an input with no matching output are drained and dropped.
pub struct Router<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Router<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> Process for Router<T> {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::keyed_input::<T>("In"),
            PortSpec::keyed_output::<T>("Out"),
        ]
    }

    async fn run(&mut self, mut ports: PortSet) {
        let inputs = ports.keyed_inputs::<T>("In");
        let mut outputs: HashMap<_, _> = ports.keyed_outputs::<T>("Out").into_iter().collect();
        let process = ports.process().to_string();
        drop(ports);

        let mut lanes = JoinSet::new();
        for (key, input) in inputs {
            match outputs.remove(&key) {
                Some(output) => {
                    lanes.spawn(async move {
                        while let Some(value) = input.recv().await {
                            if output.send(value).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                None => {
                    let process = process.clone();
                    lanes.spawn(async move {
                        let mut count = 0;
                        while input.recv().await.is_some() {
                            count += 1;
                        }
                        PacketsDropped {
                            process: &process,
                            port: &input.name().to_string(),
                            count,
                        }
                        .log();
                    });
                }
            }
        }
        // outputs with no matching input close here
        drop(outputs);

        while lanes.join_next().await.is_some() {}
    }
}
