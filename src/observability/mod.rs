// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout flowgraph. Message types follow a struct-based pattern with a
//! `Display` implementation for the human-readable text and a
//! [`StructuredLog`](messages::StructuredLog) implementation that emits the event
//! with its fields attached.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::graph` - graph declaration events and rejected declarations
//! * `messages::network` - network compilation, task lifecycle and transport close
//! * `messages::process` - events raised from inside running processes
//!
//! # Usage
//!
//! ```rust
//! use flowgraph::observability::messages::network::ProcessStarted;
//! use flowgraph::observability::messages::StructuredLog;
//!
//! ProcessStarted { process: "doubler" }.log();
//! ```

pub mod messages;
