// tests/transport_memory.rs

use bytes::Bytes;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use call_sdk::{
    // ---
    create_memory_transport,
    RpcError,
    SdkConfig,
    TransportKind,
};

fn config() -> SdkConfig {
    SdkConfig::new("mem", "1", 1, "127.0.0.1:1")
}

#[tokio::test]
async fn memory_frames_keep_order_in_both_directions() {
    // ---
    // Arrange
    // ---
    let (transport, mut remote) =
        create_memory_transport(&config()).expect("failed to create memory transport");
    assert_eq!(transport.kind(), TransportKind::Memory);
    assert_eq!(transport.transport_id(), "mem:1");

    let cancel = CancellationToken::new();
    let driver = tokio::spawn({
        let (transport, cancel) = (transport.clone(), cancel.clone());
        async move { transport.run(cancel).await }
    });

    // ---
    // Act
    // ---
    for i in 0..5u8 {
        transport.send(Bytes::from(vec![i])).await.expect("send failed");
        remote.send(Bytes::from(vec![100 + i])).await.expect("inject failed");
    }

    // ---
    // Assert
    // ---
    for i in 0..5u8 {
        let frame = timeout(Duration::from_secs(1), remote.recv())
            .await
            .expect("timed out")
            .expect("transport gone");
        assert_eq!(frame.as_ref(), &[i]);
    }

    let mut inbox = transport.receive().await.expect("receive failed");
    for i in 0..5u8 {
        let frame = inbox.recv().await.expect("inbox closed");
        assert_eq!(frame.as_ref(), &[100 + i]);
    }

    cancel.cancel();
    driver.await.expect("driver panicked").expect("driver failed");
}

#[tokio::test]
async fn memory_inbox_resumes_after_drop() {
    // ---
    let (transport, remote) = create_memory_transport(&config()).unwrap();

    remote.send(Bytes::from_static(b"a")).await.unwrap();
    remote.send(Bytes::from_static(b"b")).await.unwrap();

    let mut inbox = transport.receive().await.unwrap();
    assert_eq!(inbox.recv().await.unwrap(), Bytes::from_static(b"a"));
    drop(inbox);

    let mut inbox = transport.receive().await.unwrap();
    assert_eq!(inbox.recv().await.unwrap(), Bytes::from_static(b"b"));
}

#[tokio::test]
async fn memory_send_fails_once_driver_is_gone() {
    // ---
    let (transport, _remote) = create_memory_transport(&config()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    // A finished run drops the outbound queue
    transport.run(cancel).await.unwrap();
    transport.close().await.unwrap();

    let err = transport.send(Bytes::from_static(b"late")).await.unwrap_err();
    assert!(matches!(err, RpcError::ConnectionLost));
}
