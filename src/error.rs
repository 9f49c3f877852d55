use thiserror::Error;

/// Errors that can occur while running the SDK or issuing requests.
///
/// A response carrying `success = false` is *not* an error at this level; it
/// is returned as a normal [`Response`](crate::Response). Only local failures
/// (timeouts, cancellation, transport and bootstrap faults) are reported here.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The registration handshake was rejected or could not be decoded.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// Transport-level failure (connect, read, write).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side closed the connection while serving.
    #[error("connection lost")]
    ConnectionLost,

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Socket I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-side timeout expired before a response arrived
    #[error("request timed out")]
    Timeout,

    /// Caller-side cancellation fired before a response arrived
    #[error("request cancelled")]
    Cancelled,

    /// The pending request was evicted by the reaper before any response arrived
    #[error("pending request expired before a response arrived")]
    Expired,

    /// `run()` was called on a runner that already started once
    #[error("runner already started")]
    AlreadyStarted,

    /// The runner is not (or no longer) serving traffic
    #[error("runner is not serving")]
    NotServing,

    /// The process-wide SDK was used before `initialize()`
    #[error("sdk not initialized")]
    NotInitialized,

    /// The bootstrap address could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A live pending request already uses this message id
    #[error("duplicate message id: {0}")]
    DuplicateId(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, RpcError>;
