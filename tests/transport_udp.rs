// tests/transport_udp.rs

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::{timeout, Duration};

use call_sdk::{
    // ---
    create_transport,
    decode,
    encode,
    Identity,
    Message,
    RegisterRequest,
    Request,
    Sdk,
    SdkConfig,
    TransportKind,
};

const WAIT: Duration = Duration::from_secs(2);

async fn peer() -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
    let address = socket.local_addr().expect("local addr").to_string();
    (socket, address)
}

fn udp_config(address: String) -> SdkConfig {
    SdkConfig::new("svc-a", "1", 2, address).with_transport_kind(TransportKind::Udp)
}

#[tokio::test]
async fn udp_round_trip_through_sdk() {
    // ---
    let (socket, address) = peer().await;
    let sdk = Sdk::connect(udp_config(address)).await.expect("create");

    let runner = tokio::spawn({
        let sdk = sdk.clone();
        async move { sdk.run().await }
    });

    let mut buf = vec![0u8; 65_536];

    // Registration: one datagram
    let (len, client) = timeout(WAIT, socket.recv_from(&mut buf)).await.unwrap().unwrap();
    let record: RegisterRequest = decode(&buf[..len]).expect("record");
    assert_eq!(record.weight, 2);
    socket.send_to(br#"{"success":true}"#, client).await.unwrap();
    timeout(WAIT, sdk.wait_serving()).await.unwrap().unwrap();

    let call = tokio::spawn({
        let sdk = sdk.clone();
        async move { sdk.send(Request::new("user-service", Bytes::from_static(b"ping"))).await }
    });

    let (len, _) = timeout(WAIT, socket.recv_from(&mut buf)).await.unwrap().unwrap();
    let request: Message = decode(&buf[..len]).expect("message");
    let reply = request.reply(&Identity::new("user-service", "1"), Ok(Bytes::from_static(b"pong")));
    socket.send_to(&encode(&reply).unwrap(), client).await.unwrap();

    let response = timeout(WAIT, call).await.unwrap().unwrap().unwrap();
    assert!(response.success);
    assert_eq!(response.payload, Bytes::from_static(b"pong"));

    sdk.shutdown();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn udp_override_creates_udp_transport() {
    // ---
    // Only the socket association happens at creation, nothing is sent
    let config = SdkConfig::new("svc-a", "1", 1, "127.0.0.1:9").with_transport_kind(TransportKind::Udp);
    let transport = create_transport(&config).await.unwrap();
    assert_eq!(transport.kind(), TransportKind::Udp);
}

#[tokio::test]
async fn udp_oversized_frame_is_dropped() {
    // ---
    let (socket, address) = peer().await;
    let transport = create_transport(&udp_config(address).with_max_datagram_size(16))
        .await
        .unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    let driver = tokio::spawn({
        let (transport, cancel) = (transport.clone(), cancel.clone());
        async move { transport.run(cancel).await }
    });

    transport.send(Bytes::from(vec![7u8; 64])).await.unwrap();
    transport.send(Bytes::from_static(b"small")).await.unwrap();

    let mut buf = [0u8; 128];
    let (len, _) = timeout(WAIT, socket.recv_from(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf[..len], b"small");

    cancel.cancel();
    driver.await.unwrap().unwrap();
}

#[tokio::test]
async fn udp_refused_datagram_is_not_fatal() {
    // ---
    // Nobody listens yet: the first datagram draws a port-unreachable
    let address = {
        let (socket, address) = peer().await;
        drop(socket);
        address
    };
    let transport = create_transport(&udp_config(address.clone())).await.unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    let driver = tokio::spawn({
        let (transport, cancel) = (transport.clone(), cancel.clone());
        async move { transport.run(cancel).await }
    });

    transport.send(Bytes::from_static(b"too early")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!driver.is_finished(), "refused datagram ended the transport");

    // The peer comes up late; later datagrams get through
    let socket = UdpSocket::bind(&address).await.expect("rebind");
    let mut buf = [0u8; 64];
    let mut received = None;
    for _ in 0..10 {
        transport.send(Bytes::from_static(b"hello")).await.unwrap();
        if let Ok(Ok((len, _))) = timeout(Duration::from_millis(200), socket.recv_from(&mut buf)).await {
            received = Some(buf[..len].to_vec());
            break;
        }
    }
    assert_eq!(received.as_deref(), Some(&b"hello"[..]));
    assert!(!driver.is_finished());

    cancel.cancel();
    timeout(WAIT, driver).await.unwrap().unwrap().unwrap();
}
