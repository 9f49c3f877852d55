//! Request API.
//!
//! Each call builds a request [`Message`], registers it, writes it, and waits
//! on its delivery slot. Timeouts and cancellation only stop the wait: the
//! registry entry stays until the reaper removes it, so a late response is
//! absorbed by the slot without affecting anyone else.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::protocol::Message;
use crate::{
    // ---
    Request,
    Response,
    Result,
    RpcError,
    Sdk,
};

impl Sdk {
    // ---

    /// Send `request` and wait for its response.
    ///
    /// Waits for the runner to reach `Serving` before writing. A response with
    /// `success == false` is returned as `Ok`.
    ///
    /// # Errors
    ///
    /// - `NotServing` if the runner stopped before the request was written
    /// - `Expired` if the reaper evicted the request before a response arrived
    /// - transport or encoding errors from writing the request
    pub async fn send(&self, request: Request) -> Result<Response> {
        // ---
        let message = Message::request(self.runner().ids(), request);
        let slot = self.runner().request(message).await?;
        await_response(slot).await
    }

    /// [`send`](Self::send), giving up with `Timeout` after `timeout`.
    pub async fn send_with_timeout(&self, request: Request, timeout: Duration) -> Result<Response> {
        time::timeout(timeout, self.send(request))
            .await
            .map_err(|_| RpcError::Timeout)?
    }

    /// [`send`](Self::send), giving up with `Cancelled` once `cancel` fires.
    pub async fn send_with_cancellation(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        // ---
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RpcError::Cancelled),
            response = self.send(request) => response,
        }
    }
}

async fn await_response(slot: oneshot::Receiver<Message>) -> Result<Response> {
    // The registry only drops an unresolved slot when it expires.
    slot.await
        .map(Message::into_response)
        .map_err(|_| RpcError::Expired)
}
