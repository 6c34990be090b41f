// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::observability::messages::network::ProcessFailed;
use crate::observability::messages::StructuredLog;

/// What happened during one network run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSummary {
    pub processes: usize,
    pub initial_packets: usize,
    pub transports: usize,
    /// Names of processes whose task panicked.
    pub panicked: Vec<String>,
    /// Names of processes that returned but reported a failure, such as a
    /// subgraph that could not compile or did not finish clean.
    pub failed: Vec<String>,
    pub elapsed: Duration,
    /// The supervisor went away before reporting, e.g. the runtime shut down.
    pub interrupted: bool,
}

impl NetworkSummary {
    pub(crate) fn interrupted() -> Self {
        Self {
            interrupted: true,
            ..Self::default()
        }
    }

    /// Every process returned normally and none reported a failure.
    pub fn is_clean(&self) -> bool {
        self.panicked.is_empty() && self.failed.is_empty() && !self.interrupted
    }
}

/// Failures reported by processes of one network run, collected for its summary.
#[derive(Debug, Clone, Default)]
pub(crate) struct FailureLog(Arc<Mutex<Vec<String>>>);

impl FailureLog {
    pub(crate) fn record(&self, process: &str, reason: &str) {
        ProcessFailed { process, reason }.log();
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(process.to_string());
    }

    pub(crate) fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Resolves once every process and initial-packet task has ended and every
/// externally bound output transport is closed.
#[must_use = "a network keeps running in the background; await the completion to observe it"]
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<NetworkSummary>,
}

impl Completion {
    pub(crate) fn new(receiver: oneshot::Receiver<NetworkSummary>) -> Self {
        Self { receiver }
    }
}

impl Future for Completion {
    type Output = NetworkSummary;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|summary| summary.unwrap_or_else(|_| NetworkSummary::interrupted()))
    }
}
