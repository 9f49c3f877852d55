//! Public SDK configuration.
//!
//! A single `SdkConfig` is built once at startup and shared (by reference or
//! `Arc`) with the runner, the request API and the transport factory. It
//! replaces process-global mutable state: the identity it carries is fixed for
//! the life of the process.

use std::time::Duration;

use crate::{Identity, TransportKind};

/// Default cadence of the reaper sweep.
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(10);

/// Default age after which a still-unresolved pending request is evicted.
pub const DEFAULT_MAX_FUTURE_AGE: Duration = Duration::from_secs(600);

/// Largest UDP payload that fits a single IPv4 datagram.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 65_507;

/// Identity, bootstrap address and runtime tuning for one SDK instance.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    // ---
    /// Service name this process registers as.
    pub service_name: String,

    /// Instance number, unique within `service_name`.
    pub instance: String,

    /// Load-balancing weight announced during registration.
    pub weight: u8,

    /// `host:port` of the remote routing tier.
    pub bootstrap_address: String,

    /// Explicit transport choice.
    ///
    /// If `None`, the transport is selected by classifying the host of
    /// `bootstrap_address` (private ⇒ UDP, otherwise TCP).
    pub transport_kind: Option<TransportKind>,

    /// How often the reaper sweeps the pending-request registry.
    ///
    /// Default: 10 seconds
    pub reaper_interval: Duration,

    /// Age ceiling for pending requests that never got a response.
    ///
    /// `None` keeps unresolved entries forever. Should be well beyond any
    /// caller timeout. Default: 10 minutes
    pub max_future_age: Option<Duration>,

    /// Upper bound on the wait for the registration reply.
    ///
    /// Default: `None` (wait until the connection closes or is cancelled)
    pub bootstrap_timeout: Option<Duration>,

    /// Capacity of the transport frame queues and the reply queue.
    pub queue_capacity: usize,

    /// Maximum TCP frame size in bytes.
    pub max_frame_length: usize,

    /// Receive buffer size for UDP datagrams.
    pub max_datagram_size: usize,
}

impl SdkConfig {
    /// Create a config for the given identity and bootstrap address.
    pub fn new(
        service_name: impl Into<String>,
        instance: impl Into<String>,
        weight: u8,
        bootstrap_address: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            instance: instance.into(),
            weight,
            bootstrap_address: bootstrap_address.into(),
            transport_kind: None,
            reaper_interval: DEFAULT_REAPER_INTERVAL,
            max_future_age: Some(DEFAULT_MAX_FUTURE_AGE),
            bootstrap_timeout: None,
            queue_capacity: 64,
            max_frame_length: 16 * 1024 * 1024,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }

    /// The process identity described by this config.
    pub fn identity(&self) -> Identity {
        Identity::new(self.service_name.as_str(), self.instance.as_str())
    }

    /// Force a transport kind instead of classifying the address.
    pub fn with_transport_kind(mut self, kind: TransportKind) -> Self {
        self.transport_kind = Some(kind);
        self
    }

    /// Set the reaper sweep interval.
    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Set (or clear, with `None`) the age ceiling for unresolved requests.
    pub fn with_max_future_age(mut self, age: Option<Duration>) -> Self {
        self.max_future_age = age;
        self
    }

    /// Bound the wait for the registration reply.
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = Some(timeout);
        self
    }

    /// Set the capacity of the internal queues (minimum 1).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the maximum TCP frame size.
    pub fn with_max_frame_length(mut self, len: usize) -> Self {
        self.max_frame_length = len;
        self
    }

    /// Set the UDP receive buffer size.
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }
}
