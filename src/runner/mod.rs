//! Correlation engine.
//!
//! The [`Runner`] owns the connection for the life of the process. It performs
//! the registration handshake, then multiplexes every logical exchange over the
//! one transport:
//!
//! - inbound frames are decoded; responses are matched to a pending request by
//!   message id, requests are queued for the application handler
//! - handler replies are encoded and written in submission order
//! - the reaper sweeps the [`FutureRegistry`] on a fixed cadence
//!
//! ## Lifecycle
//!
//! `Idle → Bootstrapping → Serving → Draining → Stopped`
//!
//! A runner runs once. Cancellation and transport failure both end in
//! `Stopped`; pending requests are left unresolved and their callers keep
//! waiting until their own timeout, cancellation, or the age ceiling.

mod reaper;
mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use registry::{FutureRegistry, SweepStats};

use crate::protocol::{decode, encode, Message, RegisterRequest, RegisterResponse};
use crate::sync::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    log_warn,
    FrameInbox,
    IdGenerator,
    Identity,
    Result,
    RpcError,
    SdkConfig,
    TransportPtr,
};

/// Description carried by the failure reply sent when a request arrives and
/// no handler has been registered.
pub const NO_HANDLER: &str = "no handler registered";

/// Lifecycle state of the correlation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerState {
    /// Created, `run()` not called yet.
    Idle,
    /// Registration sent, waiting for the reply.
    Bootstrapping,
    /// Registered; requests and responses flow.
    Serving,
    /// Stopping: duties halted, transport being closed.
    Draining,
    /// Finished. A runner never leaves this state.
    Stopped,
}

pub(crate) struct Runner {
    // ---
    config: Arc<SdkConfig>,
    ids: IdGenerator,
    transport: TransportPtr,
    registry: Arc<FutureRegistry>,
    state: watch::Sender<RunnerState>,

    outbound_tx: mpsc::Sender<Message>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Message>>>,

    // Unbounded: a handler blocked on a nested call must not stall dispatch.
    requests_tx: mpsc::UnboundedSender<Message>,
    requests_rx: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    handler_attached: AtomicBool,
}

impl Runner {
    // ---

    pub(crate) fn new(config: Arc<SdkConfig>, transport: TransportPtr) -> Self {
        // ---
        let (state, _) = watch::channel(RunnerState::Idle);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.queue_capacity);
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();

        Self {
            ids: IdGenerator::new(config.identity()),
            config,
            transport,
            registry: Arc::new(FutureRegistry::new()),
            state,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            requests_tx,
            requests_rx: Mutex::new(Some(requests_rx)),
            handler_attached: AtomicBool::new(false),
        }
    }

    pub(crate) fn identity(&self) -> &Identity {
        self.ids.identity()
    }

    pub(crate) fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub(crate) fn registry(&self) -> &FutureRegistry {
        &self.registry
    }

    pub(crate) fn state(&self) -> RunnerState {
        *self.state.borrow()
    }

    /// Wait until the runner is serving.
    ///
    /// Fails with `NotServing` if the runner stops without ever serving, or
    /// has already stopped.
    pub(crate) async fn wait_serving(&self) -> Result<()> {
        // ---
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| !matches!(s, RunnerState::Idle | RunnerState::Bootstrapping))
            .await
            .map_err(|_| RpcError::NotServing)?;

        match *state {
            RunnerState::Serving => Ok(()),
            _ => Err(RpcError::NotServing),
        }
    }

    /// Resolves once the runner reaches `Stopped`.
    pub(crate) async fn stopped(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == RunnerState::Stopped).await;
    }

    /// Register `message` as pending and write it to the transport.
    ///
    /// Waits for `Serving` first. Returns the slot the response will be
    /// delivered into.
    pub(crate) async fn request(&self, message: Message) -> Result<oneshot::Receiver<Message>> {
        // ---
        self.wait_serving().await?;

        let slot = self.registry.register(message.id.clone())?;
        let frame = encode(&message)?;

        // A failed write leaves the entry to the age ceiling.
        self.transport.send(frame).await?;

        log_debug!("sent request {} to {}", message.id, message.to_service);
        Ok(slot)
    }

    /// Queue a handler reply for outbound forwarding.
    pub(crate) async fn submit(&self, reply: Message) -> Result<()> {
        self.outbound_tx
            .send(reply)
            .await
            .map_err(|_| RpcError::ConnectionLost)
    }

    /// Take the inbound request queue. Only the first caller gets it; from
    /// then on requests are delivered to it instead of being rejected.
    pub(crate) fn attach_handler(&self) -> Option<mpsc::UnboundedReceiver<Message>> {
        // ---
        let requests = lock_ignore_poison(&self.requests_rx).take()?;
        self.handler_attached.store(true, Ordering::Release);
        Some(requests)
    }

    /// Drive the connection until `cancel` fires or the transport fails.
    ///
    /// Returns `Ok` on cancellation, the bootstrap error if registration is
    /// rejected, or the transport error that ended the connection.
    pub(crate) async fn run(&self, cancel: CancellationToken) -> Result<()> {
        // ---
        let started = self.state.send_if_modified(|state| {
            if *state == RunnerState::Idle {
                *state = RunnerState::Bootstrapping;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(RpcError::AlreadyStarted);
        }

        let mut driver = Driver::spawn(self.transport.clone(), cancel.child_token());
        let result = self.drive(&cancel, &mut driver).await;

        self.state.send_replace(RunnerState::Draining);
        driver.stop().await;
        if let Err(err) = self.transport.close().await {
            log_warn!("closing {} failed: {err}", self.transport.transport_id());
        }
        self.state.send_replace(RunnerState::Stopped);

        match &result {
            Ok(()) => log_info!("{} stopped", self.identity()),
            Err(err) => log_error!("{} stopped: {err}", self.identity()),
        }
        result
    }

    async fn drive(&self, cancel: &CancellationToken, driver: &mut Driver) -> Result<()> {
        // ---
        let outbound = lock_ignore_poison(&self.outbound_rx)
            .take()
            .ok_or(RpcError::AlreadyStarted)?;
        let mut inbox = self.transport.receive().await?;

        if !self.bootstrap(cancel, driver, &mut inbox).await? {
            return Ok(());
        }

        self.state.send_replace(RunnerState::Serving);
        log_info!(
            "{} registered over {} ({})",
            self.identity(),
            self.transport.kind(),
            self.transport.transport_id()
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(()),
            err = driver.exited() => Err(err),
            result = self.forward_outbound(outbound) => result,
            result = self.dispatch_inbound(&mut inbox) => result,
            _ = reaper::reap(&self.registry, self.config.reaper_interval, self.config.max_future_age) => Ok(()),
        };

        if result.is_err() {
            self.drain_inbound(&mut inbox);
        }
        result
    }

    /// Send the registration record and wait for exactly one reply.
    ///
    /// `Ok(false)` means cancelled before the reply arrived.
    async fn bootstrap(
        &self,
        cancel: &CancellationToken,
        driver: &mut Driver,
        inbox: &mut FrameInbox,
    ) -> Result<bool> {
        // ---
        let record = RegisterRequest::from(self.config.as_ref());
        log_debug!(
            "registering {}:{} weight {}",
            record.service_name,
            record.instance,
            record.weight
        );
        self.transport.send(encode(&record)?).await?;

        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(false),
            err = driver.exited() => return Err(err),
            frame = next_frame(inbox, self.config.bootstrap_timeout) => frame?,
        };

        let reply: RegisterResponse = decode(&frame)
            .map_err(|err| RpcError::Bootstrap(format!("undecodable registration reply: {err}")))?;

        if !reply.success {
            return Err(RpcError::Bootstrap(reply.description));
        }
        Ok(true)
    }

    async fn forward_outbound(&self, mut outbound: mpsc::Receiver<Message>) -> Result<()> {
        // ---
        while let Some(reply) = outbound.recv().await {
            let frame = match encode(&reply) {
                Ok(frame) => frame,
                Err(err) => {
                    log_error!("dropping reply {}: {err}", reply.id);
                    continue;
                }
            };
            self.transport.send(frame).await?;
        }
        Ok(())
    }

    async fn dispatch_inbound(&self, inbox: &mut FrameInbox) -> Result<()> {
        // ---
        while let Some(frame) = inbox.recv().await {
            self.dispatch_frame(&frame).await?;
        }
        Err(RpcError::ConnectionLost)
    }

    /// Dispatch frames the transport read before the connection ended.
    ///
    /// Responses among them still reach their callers; requests are dropped
    /// since no reply can be written anymore.
    fn drain_inbound(&self, inbox: &mut FrameInbox) {
        // ---
        let mut drained = 0usize;
        while let Some(frame) = inbox.try_recv() {
            match decode::<Message>(&frame) {
                Ok(message) if !message.is_request => {
                    let id = message.id.clone();
                    if self.registry.resolve(&id, message) {
                        drained += 1;
                    }
                }
                _ => {}
            }
        }
        if drained > 0 {
            log_debug!("resolved {drained} buffered responses after the connection ended");
        }
    }

    async fn dispatch_frame(&self, frame: &Bytes) -> Result<()> {
        // ---
        let message: Message = match decode(frame) {
            Ok(message) => message,
            Err(err) => {
                log_warn!("dropping undecodable frame ({} bytes): {err}", frame.len());
                return Ok(());
            }
        };

        if message.is_request {
            self.deliver_request(message).await
        } else {
            let id = message.id.clone();
            if !self.registry.resolve(&id, message) {
                log_debug!("dropping unmatched response {id}");
            }
            Ok(())
        }
    }

    /// Hand `message` to the handler queue without waiting, or answer it
    /// with a `NO_HANDLER` failure.
    async fn deliver_request(&self, message: Message) -> Result<()> {
        // ---
        let message = if self.handler_attached.load(Ordering::Acquire) {
            match self.requests_tx.send(message) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(message)) => message,
            }
        } else {
            message
        };

        log_warn!("rejecting request {} from {}: {NO_HANDLER}", message.id, message.from_service);
        let reply = message.reply(self.identity(), Err(NO_HANDLER.to_string()));
        self.submit(reply).await
    }
}

async fn next_frame(inbox: &mut FrameInbox, limit: Option<Duration>) -> Result<Bytes> {
    // ---
    let frame = match limit {
        Some(limit) => tokio::time::timeout(limit, inbox.recv())
            .await
            .map_err(|_| RpcError::Bootstrap(format!("no registration reply within {limit:?}")))?,
        None => inbox.recv().await,
    };
    frame.ok_or(RpcError::ConnectionLost)
}

/// The spawned `Transport::run` task.
struct Driver {
    handle: Option<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
}

impl Driver {
    // ---

    fn spawn(transport: TransportPtr, cancel: CancellationToken) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move { transport.run(token).await });
        Self {
            handle: Some(handle),
            cancel,
        }
    }

    /// Resolves with the reason the transport stopped on its own. Never
    /// resolves twice.
    async fn exited(&mut self) -> RpcError {
        // ---
        let Some(handle) = self.handle.as_mut() else {
            return std::future::pending().await;
        };
        let outcome = handle.await;
        self.handle = None;

        match outcome {
            // Stopping without being asked is a lost connection.
            Ok(Ok(())) => RpcError::ConnectionLost,
            Ok(Err(err)) => err,
            Err(join) => RpcError::Transport(format!("transport task failed: {join}")),
        }
    }

    async fn stop(&mut self) {
        // ---
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log_debug!("transport stopped with: {err}"),
                Err(join) => log_warn!("transport task failed: {join}"),
            }
        }
    }
}
