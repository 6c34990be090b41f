// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Options that shape how a graph is compiled into a network.
///
/// Every field is optional in YAML and falls back to its default.
///
/// # Fields
/// * `default_buffer` - Transport capacity for port groups whose connections did
///   not request one with `connect_buf` (at least 1)
/// * `require_bound_exports` - Refuse to run a top-level graph whose exports have
///   no external transport bound (defaults to true)
///
/// # Example
/// ```yaml
/// default_buffer: 16
/// require_bound_exports: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkOptions {
    pub default_buffer: usize,
    pub require_bound_exports: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            default_buffer: DEFAULT_BUFFER_SIZE,
            require_bound_exports: true,
        }
    }
}

impl NetworkOptions {
    pub fn with_default_buffer(mut self, buffer: usize) -> Self {
        self.default_buffer = buffer;
        self
    }

    pub fn with_require_bound_exports(mut self, required: bool) -> Self {
        self.require_bound_exports = required;
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.default_buffer < MIN_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "default_buffer must be at least {}, got {}",
                MIN_BUFFER_SIZE, self.default_buffer
            )));
        }
        Ok(self)
    }
}

/// Parse options from YAML text. Blank input yields the defaults.
pub fn parse_options(content: &str) -> Result<NetworkOptions, ConfigError> {
    if content.trim().is_empty() {
        return Ok(NetworkOptions::default());
    }
    let options: NetworkOptions = serde_yaml::from_str(content)?;
    options.validate()
}

/// Load options from a YAML file
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<NetworkOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_options(&content)
}
