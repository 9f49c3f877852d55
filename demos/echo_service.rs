//! Echo service example.
//!
//! Registers as `echo` instance `1` with the routing tier at `BOOTSTRAP_ADDR`
//! (default `127.0.0.1:3001`) and answers every request with its own payload.
//! If `PING_SERVICE` is set, it also sends one request to that service once
//! registered and prints the answer.
//!
//! Run with: RUST_LOG=call_sdk=debug cargo run --example echo_service
//!
//! Requires: a routing tier listening on `BOOTSTRAP_ADDR`. Private addresses
//! are reached over UDP, anything else over TCP.
use std::time::Duration;

use bytes::Bytes;
use call_sdk::{Request, Sdk, SdkConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let address = std::env::var("BOOTSTRAP_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".to_string());

    let config = SdkConfig::new("echo", "1", 1, address).with_bootstrap_timeout(Duration::from_secs(5));
    let sdk = Sdk::connect(config).await?;

    sdk.register_handler(|payload: Bytes| async move { Ok::<_, std::convert::Infallible>(payload) });

    // Setup signal handling for graceful shutdown
    let sdk_clone = sdk.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Received Ctrl+C, shutting down...");
        }
        sdk_clone.shutdown();
    });

    if let Ok(target) = std::env::var("PING_SERVICE") {
        let sdk = sdk.clone();
        tokio::spawn(async move {
            let request = Request::new(target, Bytes::from_static(b"ping"));
            match sdk.send_with_timeout(request, Duration::from_secs(5)).await {
                Ok(response) => println!(
                    "{}:{} answered success={} payload={:?}",
                    response.service_name, response.instance, response.success, response.payload
                ),
                Err(err) => println!("ping failed: {err}"),
            }
        });
    }

    // Blocks until shutdown() is called or the connection fails
    sdk.run().await?;

    Ok(())
}
