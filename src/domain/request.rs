// src/domain/request.rs

//! Application-facing request and response values.
//!
//! These are what callers build and receive. The wire representation lives in
//! `crate::protocol` and is never exposed directly.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Advisory policy telling the remote routing tier how to pick an instance
/// when the request names none. Never evaluated locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadBalancePolicy {
    #[default]
    #[serde(rename = "RR")]
    RoundRobin,
    #[serde(rename = "WRR")]
    WeightedRoundRobin,
    #[serde(rename = "LC")]
    LeastConnections,
    #[serde(rename = "WLC")]
    WeightedLeastConnections,
    #[serde(rename = "SIPH")]
    SourceIpHashing,
    #[serde(rename = "Random")]
    Random,
    #[serde(rename = "RT")]
    ResponseTime,
    #[serde(rename = "P2C")]
    PowerOfTwoChoices,
}

impl LoadBalancePolicy {
    /// Parse a wire tag, `None` for unknown or empty tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let policy = match tag {
            "RR" => Self::RoundRobin,
            "WRR" => Self::WeightedRoundRobin,
            "LC" => Self::LeastConnections,
            "WLC" => Self::WeightedLeastConnections,
            "SIPH" => Self::SourceIpHashing,
            "Random" => Self::Random,
            "RT" => Self::ResponseTime,
            "P2C" => Self::PowerOfTwoChoices,
            _ => return None,
        };
        Some(policy)
    }
}

/// An outbound request to another service.
///
/// # Example
///
/// ```
/// use call_sdk::{LoadBalancePolicy, Request};
///
/// let req = Request::new("user-service", b"{\"id\":3}".to_vec())
///     .load_balance(LoadBalancePolicy::LeastConnections)
///     .write_op(true);
/// assert!(req.instance.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target service name.
    pub service_name: String,

    /// Target instance. `None` lets the remote tier choose using `policy`.
    pub instance: Option<String>,

    /// Load-balancing hint, only meaningful when `instance` is `None`.
    pub policy: LoadBalancePolicy,

    /// The call has side effects.
    pub write_op: bool,

    /// Opaque application payload.
    pub payload: Bytes,
}

impl Request {
    /// Create a request for `service_name`, letting the remote tier pick the instance.
    pub fn new(service_name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            service_name: service_name.into(),
            instance: None,
            policy: LoadBalancePolicy::default(),
            write_op: false,
            payload: payload.into(),
        }
    }

    /// Target one specific instance.
    pub fn to_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the load-balancing hint.
    pub fn load_balance(mut self, policy: LoadBalancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Mark the call as having side effects.
    pub fn write_op(mut self, write_op: bool) -> Self {
        self.write_op = write_op;
        self
    }
}

/// The answer to a [`Request`].
///
/// `success == false` is an application-level failure reported by the remote
/// handler, with details in `description`. Local failures (timeouts,
/// cancellation) are reported as [`RpcError`](crate::RpcError) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Service that answered.
    pub service_name: String,

    /// Instance that answered.
    pub instance: String,

    pub success: bool,
    pub description: String,
    pub payload: Bytes,
}

impl Response {
    /// Turn an application-level failure into an error string, keeping successes.
    pub fn into_result(self) -> std::result::Result<Bytes, String> {
        if self.success {
            Ok(self.payload)
        } else {
            Err(self.description)
        }
    }
}
