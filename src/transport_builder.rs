//! Transport selection for a bootstrap address.
//!
//! The routing tier is reached over UDP when it lives on a private network and
//! over TCP otherwise:
//!
//! | host                                   | transport |
//! |----------------------------------------|-----------|
//! | `10/8`, `172.16/12`, `192.168/16`       | UDP       |
//! | IPv6 unique-local (`fc00::/7`)          | UDP       |
//! | any other IP address                    | TCP       |
//! | a host name                             | TCP       |
//! | empty (`":3001"`)                       | local host, TCP |
//!
//! [`SdkConfig::transport_kind`] overrides the classification.

use std::net::IpAddr;

use crate::{
    // ---
    create_tcp_transport,
    create_udp_transport,
    log_debug,
    Result,
    RpcError,
    SdkConfig,
    TransportKind,
    TransportPtr,
};

/// A parsed `host:port` bootstrap address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub host: String,
    pub port: u16,
    pub ip: Option<IpAddr>,
}

impl Endpoint {
    /// Parse `host:port`, `[v6]:port` or `:port`.
    pub(crate) fn parse(address: &str) -> Result<Self> {
        // ---
        let invalid = || RpcError::InvalidAddress(address.to_string());

        let (host, port) = address.trim().rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host = if host.is_empty() { "127.0.0.1" } else { host };
        if host.contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
            ip: host.parse().ok(),
        })
    }

    /// The transport this endpoint calls for.
    pub(crate) fn classify(&self) -> TransportKind {
        // ---
        match self.ip {
            Some(IpAddr::V4(v4)) if v4.is_private() => TransportKind::Udp,
            Some(IpAddr::V6(v6)) if (v6.segments()[0] & 0xfe00) == 0xfc00 => TransportKind::Udp,
            _ => TransportKind::Tcp,
        }
    }

    /// `host:port` suitable for connecting.
    pub(crate) fn authority(&self) -> String {
        match self.ip {
            Some(IpAddr::V6(_)) => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Create the transport for `config.bootstrap_address`.
///
/// An explicit `config.transport_kind` wins over address classification. The
/// memory transport cannot be created here; use
/// [`create_memory_transport`](crate::create_memory_transport), which also
/// returns the remote handle.
///
/// # Errors
///
/// `InvalidAddress` if the address does not parse; transport errors if the
/// socket cannot be connected.
pub async fn create_transport(config: &SdkConfig) -> Result<TransportPtr> {
    // ---
    let endpoint = Endpoint::parse(&config.bootstrap_address)?;
    let kind = config.transport_kind.unwrap_or_else(|| endpoint.classify());
    let address = endpoint.authority();

    log_debug!("bootstrap address {} selects {kind}", config.bootstrap_address);

    match kind {
        TransportKind::Tcp => create_tcp_transport(config, &address).await,
        TransportKind::Udp => create_udp_transport(config, &address).await,
        TransportKind::Memory => Err(RpcError::Transport(
            "memory transport has no address; use create_memory_transport".into(),
        )),
    }
}
