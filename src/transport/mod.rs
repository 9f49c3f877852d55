//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Transport` trait, exposed only through constructor functions.
//!
//! Domain code must not depend on transport-specific types.

mod memory;
mod tcp;
mod udp;

pub use memory::{create_transport as create_memory_transport, MemoryRemote};
pub use tcp::create_transport as create_tcp_transport;
pub use udp::create_transport as create_udp_transport;
