// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Small reference processes.

pub mod doubler;
pub mod echo;
pub mod router;

pub use doubler::*;
pub use echo::*;
pub use router::*;
