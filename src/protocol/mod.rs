//! Wire protocol: the message record, the bootstrap handshake records and the
//! JSON codec that turns them into frames.
//!
//! Field names on the wire match what the remote routing tier speaks. Decoding
//! also accepts the camel-case aliases (`toInstance`, `isRequest`, ...).
mod codec;
mod handshake;
mod message;

pub use codec::{decode, encode};
pub use handshake::{RegisterRequest, RegisterResponse};
pub use message::Message;
