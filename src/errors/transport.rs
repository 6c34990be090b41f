// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Why a packet could not be handed to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("send on a closed transport")]
    Closed,

    #[error("send cancelled")]
    Cancelled,
}
