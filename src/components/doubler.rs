// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::PortSet;
use crate::graph::PortSpec;
use crate::traits::Process;

/// Doubler - multiplies each integer from `In` by two and sends it to `Out`
#[derive(Debug, Default)]
pub struct Doubler;

impl Doubler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Process for Doubler {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input::<i32>("In"), PortSpec::output::<i32>("Out")]
    }

    async fn run(&mut self, mut ports: PortSet) {
        let Some(input) = ports.input::<i32>("In") else {
            return;
        };
        let output = ports.output::<i32>("Out");

        while let Some(value) = input.recv().await {
            let Some(output) = &output else {
                continue;
            };
            if output.send(value.wrapping_mul(2)).await.is_err() {
                break;
            }
        }
    }
}
