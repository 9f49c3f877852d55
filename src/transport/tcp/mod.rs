// src/transport/tcp/mod.rs

//! TCP transport implementation.
//!
//! Connection-oriented flavor: one `TcpStream` to the routing tier, frames
//! delimited by a 4-byte big-endian length prefix.
//!
//! ## Deviations from the reference semantics
//!
//! - The connection is opened when the transport is created, not when `run()`
//!   starts; an unreachable address fails creation.
//! - Frames longer than `max_frame_length` are a decode error and end the
//!   connection.

mod transport;

pub use transport::create_transport;
