// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shared packet transports.
//!
//! One transport backs every port group of a running network. It is a bounded
//! multi-producer queue whose receiving half sits behind an async mutex, so any
//! number of writers feed any number of competing readers and every packet is
//! taken by exactly one reader.
//!
//! Writers are counted with leases. The release that takes the count from one to
//! zero closes the transport, and closing happens exactly once no matter how many
//! writers race to finish. A transport the caller owns, such as an input bound to
//! an exported port, is written through shared leases that are counted but never
//! close it; its owner does.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use crate::config::consts::DEFAULT_BUFFER_SIZE;
use crate::errors::SendError;
use crate::graph::ElementType;
use crate::observability::messages::network::{TransportClosed, WriterUnderflow};
use crate::observability::messages::process::ForeignPacket;
use crate::observability::messages::StructuredLog;

/// A type-erased value in flight between processes.
pub(crate) type Packet = Box<dyn Any + Send>;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

struct Shared {
    id: u64,
    capacity: usize,
    element: ElementType,
    sender: Mutex<Option<mpsc::Sender<Packet>>>,
    receiver: AsyncMutex<mpsc::Receiver<Packet>>,
    writers: AtomicUsize,
    closed: watch::Sender<bool>,
}

/// Untyped handle used inside the engine.
#[derive(Clone)]
pub(crate) struct RawTransport(Arc<Shared>);

impl RawTransport {
    pub(crate) fn new(capacity: usize, element: ElementType) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (closed, _) = watch::channel(false);
        Self(Arc::new(Shared {
            id: NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            element,
            sender: Mutex::new(Some(tx)),
            receiver: AsyncMutex::new(rx),
            writers: AtomicUsize::new(0),
            closed,
        }))
    }

    pub(crate) fn id(&self) -> u64 {
        self.0.id
    }

    pub(crate) fn capacity(&self) -> usize {
        self.0.capacity
    }

    pub(crate) fn element(&self) -> ElementType {
        self.0.element
    }

    fn sender_slot(&self) -> MutexGuard<'_, Option<mpsc::Sender<Packet>>> {
        self.0.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends a packet, blocking while the queue is full, until `cancel` fires.
    pub(crate) async fn send_until(
        &self,
        packet: Packet,
        cancel: &CancellationToken,
    ) -> Result<(), SendError> {
        // Clone outside the await so close() never waits on a blocked sender.
        let sender = self.sender_slot().clone().ok_or(SendError::Closed)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SendError::Cancelled),
            sent = sender.send(packet) => sent.map_err(|_| SendError::Closed),
        }
    }

    /// Takes the next packet, or `None` once the transport is closed and drained
    /// or `cancel` fires.
    pub(crate) async fn recv_until(&self, cancel: &CancellationToken) -> Option<Packet> {
        let mut receiver = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            guard = self.0.receiver.lock() => guard,
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            packet = receiver.recv() => packet,
        }
    }

    /// Closes the transport. Returns `false` if it was already closed.
    pub(crate) fn shut(&self) -> bool {
        let taken = self.sender_slot().take();
        match taken {
            Some(sender) => {
                drop(sender);
                self.0.closed.send_replace(true);
                TransportClosed { transport: self.id() }.log();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.0.closed.borrow()
    }

    /// Resolves once the transport has been closed.
    pub(crate) async fn closed(&self) {
        let mut watcher = self.0.closed.subscribe();
        // The watch sender lives in `Shared`, which `self` keeps alive.
        let _ = watcher.wait_for(|closed| *closed).await;
    }

    /// Registers one more writer. The last lease released closes the transport.
    pub(crate) fn lease(&self) -> WriterLease {
        self.register(true)
    }

    /// Registers a writer into a transport someone else closes.
    pub(crate) fn share(&self) -> WriterLease {
        self.register(false)
    }

    fn register(&self, closes: bool) -> WriterLease {
        self.0.writers.fetch_add(1, Ordering::AcqRel);
        WriterLease {
            transport: self.clone(),
            closes,
        }
    }

    pub(crate) fn writers(&self) -> usize {
        self.0.writers.load(Ordering::Acquire)
    }

    fn release_writer(&self, closes: bool) {
        match self
            .0
            .writers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) if closes => {
                self.shut();
            }
            Ok(_) => {}
            Err(_) => WriterUnderflow { transport: self.id() }.log(),
        }
    }
}

/// One registered writer of a transport. Dropping it releases the writer.
pub(crate) struct WriterLease {
    transport: RawTransport,
    closes: bool,
}

impl WriterLease {
    pub(crate) fn transport(&self) -> &RawTransport {
        &self.transport
    }
}

impl Drop for WriterLease {
    fn drop(&mut self) {
        self.transport.release_writer(self.closes);
    }
}

/// A typed, cloneable transport handle for feeding a graph's inputs and reading
/// its outputs from outside the network.
///
/// Bind it with [`Graph::set_in_port`](crate::graph::Graph::set_in_port) or
/// [`Graph::set_out_port`](crate::graph::Graph::set_out_port). The caller closes
/// input transports with [`close`](Transport::close); the network closes output
/// transports once their inner writers are done.
pub struct Transport<T> {
    raw: RawTransport,
    cancel: CancellationToken,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Transport<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            cancel: self.cancel.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> Transport<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// A transport holding up to `capacity` packets (at least one) before senders block.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: RawTransport::new(capacity, ElementType::of::<T>()),
            cancel: CancellationToken::new(),
            _marker: PhantomData,
        }
    }

    pub async fn send(&self, value: T) -> Result<(), SendError> {
        self.raw.send_until(Box::new(value), &self.cancel).await
    }

    /// Next value, or `None` once the transport is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let packet = self.raw.recv_until(&self.cancel).await?;
            match packet.downcast::<T>() {
                Ok(value) => return Some(*value),
                Err(_) => ForeignPacket {
                    process: "external",
                    port: &format!("transport#{}", self.raw.id()),
                    expected: std::any::type_name::<T>(),
                }
                .log(),
            }
        }
    }

    /// Closes the transport; readers drain what is queued and then see the end.
    pub fn close(&self) {
        self.raw.shut();
    }

    pub fn is_closed(&self) -> bool {
        self.raw.is_closed()
    }

    /// Resolves once the transport has been closed.
    pub async fn closed(&self) {
        self.raw.closed().await
    }

    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    pub(crate) fn raw(&self) -> &RawTransport {
        &self.raw
    }
}

impl<T: Send + 'static> Default for Transport<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Transport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.raw.id())
            .field("element", &self.raw.element())
            .field("capacity", &self.raw.capacity())
            .field("closed", &self.raw.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn values_flow_until_closed() {
        let transport = Transport::<i32>::with_capacity(4);
        transport.send(1).await.unwrap();
        transport.send(2).await.unwrap();
        transport.close();

        assert!(transport.is_closed());
        assert_eq!(transport.send(3).await, Err(SendError::Closed));
        assert_eq!(transport.recv().await, Some(1));
        assert_eq!(transport.recv().await, Some(2));
        assert_eq!(transport.recv().await, None);
    }

    #[test]
    fn capacity_is_at_least_one() {
        assert_eq!(Transport::<i32>::with_capacity(0).capacity(), 1);
        assert_eq!(Transport::<i32>::new().capacity(), DEFAULT_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn last_lease_closes_exactly_once() {
        let raw = RawTransport::new(1, ElementType::of::<i32>());
        let first = raw.lease();
        let second = raw.lease();
        assert_eq!(raw.writers(), 2);

        drop(first);
        assert!(!raw.is_closed());
        drop(second);
        assert!(raw.is_closed());
        assert_eq!(raw.writers(), 0);
        assert!(!raw.shut());
    }

    #[test]
    fn shared_leases_leave_closing_to_the_owner() {
        let raw = RawTransport::new(1, ElementType::of::<i32>());
        let shared = raw.share();
        assert_eq!(raw.writers(), 1);

        drop(shared);
        assert_eq!(raw.writers(), 0);
        assert!(!raw.is_closed());
        assert!(raw.shut());
    }

    #[tokio::test]
    async fn foreign_packets_are_skipped() {
        let transport = Transport::<i32>::with_capacity(4);
        let cancel = CancellationToken::new();
        transport
            .raw()
            .send_until(Box::new("not a number"), &cancel)
            .await
            .unwrap();
        transport.send(7).await.unwrap();
        transport.close();

        assert_eq!(transport.recv().await, Some(7));
        assert_eq!(transport.recv().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_writers_close_once() {
        let raw = RawTransport::new(64, ElementType::of::<usize>());
        let leases: Vec<_> = (0..16).map(|_| raw.lease()).collect();

        let mut tasks = Vec::new();
        for (index, lease) in leases.into_iter().enumerate() {
            tasks.push(tokio::spawn(async move {
                let cancel = CancellationToken::new();
                lease
                    .transport()
                    .send_until(Box::new(index), &cancel)
                    .await
                    .unwrap();
                drop(lease);
            }));
        }

        let reader = raw.clone();
        let drain = tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let mut seen = 0;
            while reader.recv_until(&cancel).await.is_some() {
                seen += 1;
            }
            seen
        });

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(drain.await.unwrap(), 16);
        assert!(raw.is_closed());
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let transport = Transport::<String>::new();
        let waiter = transport.clone();
        let handle = tokio::spawn(async move { waiter.closed().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        transport.close();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_ends_blocked_operations() {
        let raw = RawTransport::new(1, ElementType::of::<i32>());
        let cancel = CancellationToken::new();
        raw.send_until(Box::new(1), &cancel).await.unwrap();

        cancel.cancel();
        assert_eq!(
            raw.send_until(Box::new(2), &cancel).await,
            Err(SendError::Cancelled)
        );
        assert!(raw.recv_until(&cancel).await.is_none());
    }
}
