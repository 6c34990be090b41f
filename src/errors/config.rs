// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while loading [`NetworkOptions`](crate::config::NetworkOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The options file could not be read
    #[error("failed to read network options: {0}")]
    Io(#[from] std::io::Error),

    /// The options file is not valid YAML for the options schema
    #[error("failed to parse network options: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The options parsed but hold an unusable value
    #[error("invalid network options: {0}")]
    Invalid(String),
}
