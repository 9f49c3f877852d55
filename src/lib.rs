//! Service-to-service RPC over one duplex connection.
//!
//! A process registers itself with a remote routing tier as a named service
//! instance, then issues requests to other services and answers theirs, all
//! multiplexed over a single TCP or UDP transport. Responses are matched to
//! requests by message id, so any number of calls can be in flight at once.
//!
//! The pieces, leaves first:
//!
//! - [`Transport`]: a duplex frame channel (memory, TCP, UDP)
//! - [`FutureRegistry`]: pending requests keyed by message id
//! - the runner: registration handshake, inbound dispatch, outbound
//!   forwarding and the reaper, observed through [`RunnerState`]
//! - [`Sdk`]: the handle applications use (`send*`, `register_handler`,
//!   `run`, `shutdown`)
//! - the [`global`] facade wrapping one process-wide [`Sdk`]
//!

// Import all sub modules once...
mod macros;
mod sync;

mod client;
mod domain;
mod protocol;
mod runner;
mod sdk;
mod server;
mod transport;

mod correlation;
mod error;
mod sdk_config;
mod transport_builder;

pub mod global;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use sdk::Sdk;
pub use sdk_config::{
    //
    SdkConfig,
    DEFAULT_MAX_DATAGRAM_SIZE,
    DEFAULT_MAX_FUTURE_AGE,
    DEFAULT_REAPER_INTERVAL,
};

pub use correlation::{IdGenerator, IdKind, Identity, MessageId};
pub use error::{Result, RpcError};

pub use runner::{FutureRegistry, RunnerState, SweepStats, NO_HANDLER};
pub use server::HANDLER_PANICKED;

pub use protocol::{decode, encode, Message, RegisterRequest, RegisterResponse};

pub use transport::{
    //
    create_memory_transport,
    create_tcp_transport,
    create_udp_transport,
    MemoryRemote,
};
pub use transport_builder::create_transport;

// --- public re-exports
pub use domain::{
    //
    FrameInbox,
    LoadBalancePolicy,
    Request,
    Response,
    Transport,
    TransportBase,
    TransportKind,
    TransportPtr,
};

pub use global::{initialize, register_handler, run, send, send_with_cancellation, send_with_timeout, shutdown};
