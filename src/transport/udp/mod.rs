// src/transport/udp/mod.rs

//! UDP transport implementation.
//!
//! Connectionless flavor used for routing tiers on private networks: every
//! frame is exactly one datagram, sent from an ephemeral local port to the
//! bootstrap address.
//!
//! ## Deviations from the reference semantics
//!
//! - Delivery and ordering are whatever the network provides. A lost datagram
//!   is a lost message; the caller's timeout is the only recovery.
//! - Frames larger than `max_datagram_size` are dropped with an error log
//!   instead of being written.
//! - There is no connection to lose: an ICMP "port unreachable" surfacing as
//!   a socket error is the only way `run()` fails.

mod transport;

pub use transport::create_transport;
