// src/transport/udp/transport.rs

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    log_warn,
    Result,
    RpcError,
    SdkConfig,
    Transport,
    TransportBase,
    TransportKind,
    TransportPtr,
};

struct UdpTransport {
    // ---
    base: TransportBase,
    socket: UdpSocket,
    max_datagram_size: usize,
}

impl UdpTransport {
    // ---

    async fn write_datagrams(&self, mut outbound: mpsc::Receiver<Bytes>) -> Result<()> {
        // ---
        while let Some(frame) = outbound.recv().await {
            if frame.len() > self.max_datagram_size {
                log_error!(
                    "{}: dropping {}-byte frame, limit is {}",
                    self.base.transport_id,
                    frame.len(),
                    self.max_datagram_size
                );
                continue;
            }
            match self.socket.send(&frame).await {
                Ok(_) => {}
                Err(err) if is_transient(&err) => {
                    log_warn!("{}: datagram to {} lost: {err}", self.base.transport_id, self.base.peer);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn read_datagrams(&self, inbound: mpsc::Sender<Bytes>) -> Result<()> {
        // ---
        let mut buf = vec![0u8; self.max_datagram_size];
        loop {
            let len = match self.socket.recv(&mut buf).await {
                Ok(len) => len,
                Err(err) if is_transient(&err) => {
                    log_warn!("{}: receive from {} failed: {err}", self.base.transport_id, self.base.peer);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if inbound.send(Bytes::copy_from_slice(&buf[..len])).await.is_err() {
                return Ok(());
            }
        }
    }
}

// Errors that cost a datagram, not the association. A connected socket
// reports an ICMP port-unreachable from the peer as `ConnectionRefused`.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    // ---

    fn base(&self) -> &TransportBase {
        &self.base
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        // ---
        let outbound = self.base.take_outbound()?;
        let inbound = self.base.inbound_sender()?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(()),
            result = self.write_datagrams(outbound) => result,
            result = self.read_datagrams(inbound) => result,
        };

        log_debug!("{}: stopped talking to {}", self.base.transport_id, self.base.peer);
        result
    }
}

/// Bind an ephemeral local port and associate it with `address`.
pub async fn create_transport(config: &SdkConfig, address: &str) -> Result<TransportPtr> {
    // ---
    let peer: SocketAddr = tokio::net::lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| RpcError::InvalidAddress(address.to_string()))?;

    let local: SocketAddr = if peer.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(peer).await?;

    log_info!("udp transport bound to {} for {peer}", socket.local_addr()?);

    let transport = UdpTransport {
        base: TransportBase::new(
            config.identity().to_string(),
            TransportKind::Udp,
            peer.to_string(),
            config.queue_capacity,
        ),
        socket,
        max_datagram_size: config.max_datagram_size,
    };

    Ok(Arc::new(transport))
}
