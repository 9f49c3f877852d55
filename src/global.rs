//! Process-wide facade.
//!
//! Most services hold exactly one [`Sdk`]. These free functions keep it in a
//! process global so call sites need not thread a handle through. Everything
//! here delegates to the [`Sdk`] created by [`initialize`]; before that call
//! every function fails with `NotInitialized`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::{
    // ---
    Request,
    Response,
    Result,
    RpcError,
    Sdk,
    SdkConfig,
};

static SDK: OnceCell<Sdk> = OnceCell::const_new();

/// Create the process-wide SDK.
///
/// The first successful call wins; later calls return the existing handle and
/// ignore their config. Concurrent first calls connect only once.
///
/// # Errors
///
/// Transport creation errors. A failed call leaves the facade uninitialized,
/// so it can be retried.
pub async fn initialize(config: SdkConfig) -> Result<Sdk> {
    SDK.get_or_try_init(|| Sdk::connect(config)).await.cloned()
}

/// The process-wide SDK, if [`initialize`] has succeeded.
pub fn global() -> Result<&'static Sdk> {
    SDK.get().ok_or(RpcError::NotInitialized)
}

/// Run the process-wide SDK. See [`Sdk::run`].
pub async fn run() -> Result<()> {
    global()?.run().await
}

/// Stop the process-wide SDK. See [`Sdk::shutdown`].
pub fn shutdown() -> Result<()> {
    global()?.shutdown();
    Ok(())
}

/// See [`Sdk::send`].
pub async fn send(request: Request) -> Result<Response> {
    global()?.send(request).await
}

/// See [`Sdk::send_with_timeout`].
pub async fn send_with_timeout(request: Request, timeout: Duration) -> Result<Response> {
    global()?.send_with_timeout(request, timeout).await
}

/// See [`Sdk::send_with_cancellation`].
pub async fn send_with_cancellation(request: Request, cancel: &CancellationToken) -> Result<Response> {
    global()?.send_with_cancellation(request, cancel).await
}

/// See [`Sdk::register_handler`].
pub fn register_handler<F, Fut, E>(handler: F) -> Result<bool>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Ok(global()?.register_handler(handler))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::TransportKind;

    // The global is process-wide, so everything that touches it lives in one
    // test.
    #[tokio::test]
    async fn test_facade_lifecycle() {
        // ---
        assert!(matches!(global(), Err(RpcError::NotInitialized)));
        assert!(matches!(shutdown(), Err(RpcError::NotInitialized)));
        assert!(matches!(
            send(Request::new("svc-b", Bytes::new())).await,
            Err(RpcError::NotInitialized)
        ));
        assert!(matches!(
            register_handler(|p: Bytes| async move { Ok::<_, String>(p) }),
            Err(RpcError::NotInitialized)
        ));

        // Nothing listens here; a UDP transport needs no peer to be created.
        let config = |name: &str, instance: &str| {
            SdkConfig::new(name, instance, 1, "127.0.0.1:3001").with_transport_kind(TransportKind::Udp)
        };
        let first = initialize(config("svc-a", "1")).await.unwrap();
        let second = initialize(config("svc-z", "9")).await.unwrap();

        assert_eq!(first.identity().to_string(), "svc-a:1");
        assert_eq!(second.identity().to_string(), "svc-a:1");
        assert!(register_handler(|p: Bytes| async move { Ok::<_, String>(p) }).unwrap());
        assert!(!register_handler(|p: Bytes| async move { Ok::<_, String>(p) }).unwrap());
        assert!(shutdown().is_ok());
    }
}
