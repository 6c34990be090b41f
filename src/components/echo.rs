// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::engine::PortSet;
use crate::graph::PortSpec;
use crate::traits::Process;

/// Echo - copies every packet from `In` to `Out` unchanged
pub struct Echo<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Echo<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> Default for Echo<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> Process for Echo<T> {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input::<T>("In"), PortSpec::output::<T>("Out")]
    }

    async fn run(&mut self, mut ports: PortSet) {
        let Some(input) = ports.input::<T>("In") else {
            return;
        };
        let output = ports.output::<T>("Out");

        while let Some(value) = input.recv().await {
            // Keep draining even with no downstream so upstream writers never block.
            if let Some(output) = &output {
                if output.send(value).await.is_err() {
                    break;
                }
            }
        }
    }
}
