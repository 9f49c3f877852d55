// src/transport/tcp/transport.rs

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

use crate::sync::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    log_info,
    Result,
    RpcError,
    SdkConfig,
    Transport,
    TransportBase,
    TransportKind,
    TransportPtr,
};

type Wire = Framed<TcpStream, LengthDelimitedCodec>;

struct TcpTransport {
    // ---
    base: TransportBase,
    wire: Mutex<Option<Wire>>,
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    // ---

    fn base(&self) -> &TransportBase {
        &self.base
    }

    /// Pump frames between the queues and the socket.
    ///
    /// Reading and writing run side by side so a full inbound queue never
    /// holds up outbound frames.
    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        // ---
        let outbound = self.base.take_outbound()?;
        let inbound = self.base.inbound_sender()?;
        let wire = lock_ignore_poison(&self.wire)
            .take()
            .ok_or(RpcError::ConnectionLost)?;
        let (sink, stream) = wire.split();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(()),
            result = write_frames(sink, outbound) => result,
            result = read_frames(stream, inbound) => result,
        };

        log_debug!("{}: connection to {} closed", self.base.transport_id, self.base.peer);
        result
    }
}

async fn write_frames(mut sink: SplitSink<Wire, Bytes>, mut outbound: mpsc::Receiver<Bytes>) -> Result<()> {
    // ---
    while let Some(frame) = outbound.recv().await {
        sink.send(frame).await?;
    }
    Ok(())
}

async fn read_frames(mut stream: SplitStream<Wire>, inbound: mpsc::Sender<Bytes>) -> Result<()> {
    // ---
    while let Some(frame) = stream.next().await {
        if inbound.send(frame?.freeze()).await.is_err() {
            return Ok(());
        }
    }
    Err(RpcError::ConnectionLost)
}

/// Connect to `address` and wrap the stream in a transport.
pub async fn create_transport(config: &SdkConfig, address: &str) -> Result<TransportPtr> {
    // ---
    let stream = TcpStream::connect(address)
        .await
        .map_err(|err| RpcError::Transport(format!("connect {address}: {err}")))?;
    stream.set_nodelay(true)?;

    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(config.max_frame_length)
        .new_codec();

    log_info!("tcp transport connected to {address}");

    let transport = TcpTransport {
        base: TransportBase::new(
            config.identity().to_string(),
            TransportKind::Tcp,
            address,
            config.queue_capacity,
        ),
        wire: Mutex::new(Some(Framed::new(stream, codec))),
    };

    Ok(Arc::new(transport))
}
