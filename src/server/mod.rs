//! Inbound request handling.
//!
//! One application handler per process, registered once. Requests surfaced by
//! the runner are handed to it one at a time, in arrival order, and each
//! outcome is turned into a reply and queued for outbound forwarding.
mod handler;

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use handler::{wrap_handler, BoxedHandler, HandlerOutput};

use crate::protocol::Message;
use crate::runner::Runner;
use crate::{log_debug, log_info, log_warn, Sdk};

/// Description reported when the handler panics.
pub const HANDLER_PANICKED: &str = "handler panicked";

impl Sdk {
    // ---

    /// Register the handler for inbound requests.
    ///
    /// The first registration wins; later calls return `false` and drop their
    /// handler. Until a handler is registered, inbound requests are answered
    /// with `success = false` and the description `"no handler registered"`.
    ///
    /// The handler receives the request payload. `Ok(payload)` becomes a
    /// successful reply; `Err(e)` becomes a failed reply whose description is
    /// `e.to_string()`. Calls are sequential, in arrival order.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn register_handler<F, Fut, E>(&self, handler: F) -> bool
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        // ---
        let Some(requests) = self.runner().attach_handler() else {
            log_debug!("handler already registered, ignoring");
            return false;
        };

        spawn_dispatch(self.runner().clone(), requests, wrap_handler(handler));
        log_info!("{} handler registered", self.identity());
        true
    }
}

/// Start the task that feeds `requests` to `handler`.
///
/// The task ends once the runner has stopped or replies can no longer be
/// submitted.
pub(crate) fn spawn_dispatch(
    runner: Arc<Runner>,
    mut requests: mpsc::UnboundedReceiver<Message>,
    handler: BoxedHandler,
) -> JoinHandle<()> {
    // ---
    tokio::spawn(async move {
        loop {
            let request = tokio::select! {
                biased;
                _ = runner.stopped() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let outcome = invoke(&handler, &request).await;
            let reply = request.reply(runner.identity(), outcome);

            if runner.submit(reply).await.is_err() {
                log_debug!("runner gone, dropping reply for {}", request.id);
                break;
            }
        }
        log_debug!("handler dispatch finished");
    })
}

// Runs the handler on its own task so a panic becomes a failure reply instead
// of ending dispatch.
async fn invoke(handler: &BoxedHandler, request: &Message) -> HandlerOutput {
    // ---
    let call = handler(request.payload.clone());
    match tokio::spawn(call).await {
        Ok(outcome) => outcome,
        Err(err) => {
            log_warn!("handler failed on request {}: {err}", request.id);
            Err(HANDLER_PANICKED.to_string())
        }
    }
}
