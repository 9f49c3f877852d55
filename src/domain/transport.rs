// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the duplex frame channel the runner talks to. It
//! intentionally avoids any reference to sockets or framing: a transport moves
//! opaque byte frames in both directions over one logical connection, and
//! nothing more. Correlation, bootstrap and timeouts are handled above it.
//!
//! Concrete implementations live under `src/transport/`.

use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::sync::lock_ignore_poison;
use crate::{Result, RpcError};

/// Flavor of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// In-process channel pair (tests, local execution).
    Memory,

    /// Connection-oriented: one TCP stream, length-delimited frames.
    Tcp,

    /// Connectionless: one UDP datagram per frame.
    Udp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Memory => "memory",
            TransportKind::Tcp => "tcp",
            TransportKind::Udp => "udp",
        };
        f.write_str(s)
    }
}

/// Shared base state for all transport implementations.
///
/// Holds the two frame queues every transport needs so that the default
/// `Transport` methods (`send`, `receive`, `close`) can delegate here. A
/// concrete transport only implements `run`, which pumps the queues to and
/// from its socket.
///
/// ```ignore
/// struct TcpTransport {
///     base: TransportBase,
///     // ... socket specific fields
/// }
///
/// impl Transport for TcpTransport {
///     fn base(&self) -> &TransportBase { &self.base }
///     async fn run(&self, cancel: CancellationToken) -> Result<()> { ... }
/// }
/// ```
pub struct TransportBase {
    /// Identifier used in log lines (`service:instance`).
    pub transport_id: String,
    /// Transport flavor.
    pub kind: TransportKind,
    /// Remote address this transport talks to.
    pub peer: String,

    outbound_tx: mpsc::Sender<Bytes>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
    inbound_tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Bytes>>>,
}

impl TransportBase {
    /// Create a new base with bounded queues of `capacity` frames each.
    pub fn new(
        transport_id: impl Into<String>,
        kind: TransportKind,
        peer: impl Into<String>,
        capacity: usize,
    ) -> Self {
        // ---
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity.max(1));
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity.max(1));

        Self {
            transport_id: transport_id.into(),
            kind,
            peer: peer.into(),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
        }
    }

    /// Queue one frame for the connection driver.
    pub async fn enqueue(&self, frame: Bytes) -> Result<()> {
        self.outbound_tx
            .send(frame)
            .await
            .map_err(|_| RpcError::ConnectionLost)
    }

    /// Take the outbound queue. Only the first `run` gets it.
    pub fn take_outbound(&self) -> Result<mpsc::Receiver<Bytes>> {
        lock_ignore_poison(&self.outbound_rx)
            .take()
            .ok_or_else(|| RpcError::Transport(format!("{}: already running", self.transport_id)))
    }

    /// A sender feeding the inbound frame stream.
    ///
    /// Fails once the transport has been closed.
    pub fn inbound_sender(&self) -> Result<mpsc::Sender<Bytes>> {
        lock_ignore_poison(&self.inbound_tx)
            .clone()
            .ok_or(RpcError::ConnectionLost)
    }

    /// Open the inbound frame stream.
    ///
    /// Only one [`FrameInbox`] is live at a time; a second call waits until
    /// the first inbox is dropped and then resumes the same stream.
    pub async fn inbox(&self) -> FrameInbox {
        FrameInbox {
            inbox: self.inbound_rx.clone().lock_owned().await,
        }
    }

    /// Drop the base's own inbound sender so the stream ends once every
    /// driver-held sender is gone.
    pub fn shutdown(&self) {
        lock_ignore_poison(&self.inbound_tx).take();
    }
}

/// Handle over the inbound frame stream of a transport.
///
/// The stream yields frames in arrival order and returns `None` once the
/// transport has been closed and all buffered frames are drained.
pub struct FrameInbox {
    inbox: OwnedMutexGuard<mpsc::Receiver<Bytes>>,
}

impl FrameInbox {
    /// Receive the next inbound frame.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.inbox.recv().await
    }

    /// Take the next buffered frame without waiting.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.inbox.try_recv().ok()
    }
}

/// Duplex frame transport.
///
/// Implementations must ensure that:
/// - `send()` only enqueues; the frame is written by `run()`. It may wait
///   when the outbound queue is full.
/// - `receive()` yields frames in the order they were read off the wire.
/// - `run()` drives the connection until `cancel` fires (returning `Ok`) or
///   the connection fails (returning the error).
///
/// The memory transport is the reference implementation of these semantics.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Returns a reference to the shared base state.
    fn base(&self) -> &TransportBase;

    /// Identifier used in log lines.
    fn transport_id(&self) -> &str {
        &self.base().transport_id
    }

    /// Transport flavor.
    fn kind(&self) -> TransportKind {
        self.base().kind
    }

    /// Enqueue one outbound frame.
    async fn send(&self, frame: Bytes) -> Result<()> {
        self.base().enqueue(frame).await
    }

    /// Open the inbound frame stream.
    async fn receive(&self) -> Result<FrameInbox> {
        Ok(self.base().inbox().await)
    }

    /// Drive the underlying connection until cancelled or failed.
    async fn run(&self, cancel: CancellationToken) -> Result<()>;

    /// Close the transport and release any associated resources.
    async fn close(&self) -> Result<()> {
        self.base().shutdown();
        Ok(())
    }
}

/// Shared transport pointer.
///
/// `Arc<dyn Transport>`: cheap to clone, every clone shares the same
/// connection.
pub type TransportPtr = Arc<dyn Transport>;
