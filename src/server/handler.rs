use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

/// Outcome of one handler call: the reply payload, or the error text reported
/// to the remote caller.
pub(crate) type HandlerOutput = std::result::Result<Bytes, String>;

/// Type-erased async handler function
///
/// Takes the request payload and returns the reply payload or the error text.
/// Wrapped in Arc for cheap cloning into spawned tasks.
pub(crate) type BoxedHandler =
    Arc<dyn Fn(Bytes) -> Pin<Box<dyn Future<Output = HandlerOutput> + Send>> + Send + Sync>;

/// Wrap an application handler into a type-erased handler
///
/// Any error type that implements `Display` is accepted; its text becomes the
/// reply's `description`.
pub(crate) fn wrap_handler<F, Fut, E>(handler: F) -> BoxedHandler
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    // ---
    Arc::new(move |payload: Bytes| {
        let fut = handler(payload);
        Box::pin(async move { fut.await.map_err(|err| err.to_string()) })
            as Pin<Box<dyn Future<Output = HandlerOutput> + Send>>
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_wrapped_handler_maps_errors_to_text() {
        // ---
        let handler = wrap_handler(|payload: Bytes| async move {
            if payload.is_empty() {
                Err("empty payload")
            } else {
                Ok(payload)
            }
        });

        assert_eq!(
            handler(Bytes::from_static(b"x")).await,
            Ok(Bytes::from_static(b"x"))
        );
        assert_eq!(handler(Bytes::new()).await, Err("empty payload".to_string()));
    }
}
