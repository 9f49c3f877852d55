//! The SDK handle.
//!
//! [`Sdk`] ties one [`Runner`] to the request API (`send*`, see `client.rs`)
//! and the inbound handler (`register_handler`, see `server/`). It is cheap to
//! clone; every clone drives and observes the same connection.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::runner::Runner;
use crate::{
    // ---
    create_transport,
    FutureRegistry,
    Identity,
    Result,
    RunnerState,
    SdkConfig,
    TransportPtr,
};

/// One registered service instance talking to the routing tier.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use call_sdk::{Request, Sdk, SdkConfig};
///
/// # async fn example() -> call_sdk::Result<()> {
/// let sdk = Sdk::connect(SdkConfig::new("svc-a", "1", 3, "10.0.0.5:3001")).await?;
///
/// sdk.register_handler(|payload: Bytes| async move {
///     Ok::<_, std::convert::Infallible>(payload)
/// });
///
/// let runner = tokio::spawn({
///     let sdk = sdk.clone();
///     async move { sdk.run().await }
/// });
///
/// let response = sdk.send(Request::new("user-service", &b"{\"id\":3}"[..])).await?;
/// println!("{} answered: {}", response.service_name, response.success);
///
/// sdk.shutdown();
/// runner.await.ok();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Sdk {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    config: Arc<SdkConfig>,
    runner: Arc<Runner>,
    shutdown: CancellationToken,
}

impl Sdk {
    // ---

    /// Build an SDK over an already created transport.
    pub fn new(config: SdkConfig, transport: TransportPtr) -> Self {
        // ---
        let config = Arc::new(config);
        let runner = Arc::new(Runner::new(config.clone(), transport));

        Self {
            inner: Arc::new(Inner {
                config,
                runner,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Create the transport for `config.bootstrap_address` and build an SDK
    /// over it.
    pub async fn connect(config: SdkConfig) -> Result<Self> {
        let transport = create_transport(&config).await?;
        Ok(Self::new(config, transport))
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    /// The identity this process registers as.
    pub fn identity(&self) -> &Identity {
        self.inner.runner.identity()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.inner.runner.state()
    }

    /// Wait until registration has succeeded.
    ///
    /// # Errors
    ///
    /// `NotServing` if the runner stopped without serving.
    pub async fn wait_serving(&self) -> Result<()> {
        self.inner.runner.wait_serving().await
    }

    /// The pending-request registry.
    pub fn registry(&self) -> &FutureRegistry {
        self.inner.runner.registry()
    }

    /// Register and serve until [`shutdown`](Self::shutdown) or a fatal error.
    ///
    /// # Errors
    ///
    /// - `Bootstrap` if registration was rejected
    /// - the transport error that ended the connection
    /// - `AlreadyStarted` on a second call
    pub async fn run(&self) -> Result<()> {
        self.inner.runner.run(self.inner.shutdown.clone()).await
    }

    /// Ask [`run`](Self::run) to stop. Outstanding requests are not failed.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub(crate) fn runner(&self) -> &Arc<Runner> {
        &self.inner.runner
    }
}
