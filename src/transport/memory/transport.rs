// src/transport/memory/transport.rs

//! In-memory transport implementation.
//!
//! Two bounded channels stand in for the wire. The transport side embeds a
//! [`TransportBase`]; the remote side is handed to the caller as a
//! [`MemoryRemote`].

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::sync::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    Result,
    RpcError,
    SdkConfig,
    Transport,
    TransportBase,
    TransportKind,
    TransportPtr,
};

struct MemoryTransport {
    // ---
    base: TransportBase,
    wire: Mutex<Option<mpsc::Sender<Bytes>>>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---

    fn base(&self) -> &TransportBase {
        &self.base
    }

    /// Move queued frames to the remote until cancelled.
    ///
    /// Fails with `ConnectionLost` as soon as the remote handle is dropped.
    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        // ---
        let mut outbound = self.base.take_outbound()?;
        let wire = lock_ignore_poison(&self.wire)
            .take()
            .ok_or(RpcError::ConnectionLost)?;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log_debug!("{}: cancelled", self.base.transport_id);
                    return Ok(());
                }
                _ = wire.closed() => return Err(RpcError::ConnectionLost),
                frame = outbound.recv() => {
                    let Some(frame) = frame else { return Ok(()) };
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        sent = wire.send(frame) => sent.map_err(|_| RpcError::ConnectionLost)?,
                    }
                }
            }
        }
    }
}

/// The far end of an in-memory transport.
///
/// Dropping it is the in-memory equivalent of the peer closing the socket.
pub struct MemoryRemote {
    // ---
    inbound: mpsc::Sender<Bytes>,
    outbound: mpsc::Receiver<Bytes>,
}

impl MemoryRemote {
    // ---

    /// Deliver one frame to the SDK side.
    pub async fn send(&self, frame: impl Into<Bytes>) -> Result<()> {
        self.inbound
            .send(frame.into())
            .await
            .map_err(|_| RpcError::ConnectionLost)
    }

    /// Next frame written by the SDK side, `None` once the transport is gone.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }
}

/// Create a new in-memory transport and the handle for its far end.
///
/// This transport is always available and requires no external resources.
pub fn create_transport(config: &SdkConfig) -> Result<(TransportPtr, MemoryRemote)> {
    // ---
    let (wire_tx, wire_rx) = mpsc::channel(config.queue_capacity);

    let base = TransportBase::new(
        config.identity().to_string(),
        TransportKind::Memory,
        "memory",
        config.queue_capacity,
    );
    let remote = MemoryRemote {
        inbound: base.inbound_sender()?,
        outbound: wire_rx,
    };

    let transport = MemoryTransport {
        base,
        wire: Mutex::new(Some(wire_tx)),
    };

    Ok((Arc::new(transport), remote))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn config() -> SdkConfig {
        SdkConfig::new("svc-a", "1", 1, "127.0.0.1:3001")
    }

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        // ---
        let (transport, mut remote) = create_transport(&config()).unwrap();
        let cancel = CancellationToken::new();
        let driver = tokio::spawn({
            let (transport, cancel) = (transport.clone(), cancel.clone());
            async move { transport.run(cancel).await }
        });

        transport.send(Bytes::from_static(b"one")).await.unwrap();
        transport.send(Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(remote.recv().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(remote.recv().await.unwrap(), Bytes::from_static(b"two"));

        remote.send(&b"back"[..]).await.unwrap();
        let mut inbox = transport.receive().await.unwrap();
        assert_eq!(inbox.recv().await.unwrap(), Bytes::from_static(b"back"));

        cancel.cancel();
        driver.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropped_remote_is_connection_lost() {
        // ---
        let (transport, remote) = create_transport(&config()).unwrap();
        drop(remote);

        let result = timeout(Duration::from_secs(1), transport.run(CancellationToken::new()))
            .await
            .unwrap();
        assert!(matches!(result, Err(RpcError::ConnectionLost)));
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        // ---
        let (transport, _remote) = create_transport(&config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        transport.run(cancel.clone()).await.unwrap();
        assert!(matches!(
            transport.run(cancel).await,
            Err(RpcError::Transport(_))
        ));
    }
}
