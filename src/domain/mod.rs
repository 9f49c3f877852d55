//! Domain layer public interface.
//!
//! This module defines domain-level abstractions that are independent of
//! socket implementations, wire encoding, or runtime concerns.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod request;
mod transport;

// --- Request domain re-exports ---

pub use request::{
    //
    LoadBalancePolicy,
    Request,
    Response,
};

// --- Transport domain re-exports ---

pub use transport::{
    //
    FrameInbox,
    Transport,
    TransportBase,
    TransportKind,
    TransportPtr,
};
