// src/transport/memory/mod.rs

//! In-memory transport implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Transport` trait. It is intended primarily for testing, local execution,
//! and as a reference for transport semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory transport defines the **reference behavior** for the transport
//! layer. Socket-backed transports are expected to approximate it as closely as
//! their underlying protocol allows:
//!
//! - Frames arrive in the order they were sent, whole and unmodified.
//! - `send()` only enqueues; nothing reaches the far side until `run()` is
//!   being driven.
//! - When the far side goes away, `run()` fails with `ConnectionLost`.
//!
//! The far side is a [`MemoryRemote`] handle which plays the remote routing
//! tier: it reads what the SDK wrote and injects frames for the SDK to read.

mod transport;

pub use transport::{create_transport, MemoryRemote};
