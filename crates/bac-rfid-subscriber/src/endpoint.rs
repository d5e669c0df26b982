//! Broker address handling.

use std::fmt;
use std::net::Ipv6Addr;
use url::{Host, Url};

/// Standard unencrypted MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// Host and port of the broker to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    /// Broker host name or IP address
    pub host: String,
    /// TCP port, never zero
    pub port: u16,
}

impl BrokerEndpoint {
    /// Create an endpoint from a host and port.
    ///
    /// # Errors
    ///
    /// Returns error if the host is empty or the port is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, EndpointError> {
        let host = host.into();
        if host.is_empty() {
            return Err(EndpointError::MissingHost(host));
        }
        if port == 0 {
            return Err(EndpointError::InvalidPort(format!("{host}: port 0")));
        }
        Ok(Self { host, port })
    }

    /// Parse `host`, `host:port`, `tcp://host[:port]` or `mqtt://host[:port]`.
    ///
    /// `default_port` applies when the input names no port. IPv6 hosts are
    /// accepted bare (`::1`) or bracketed (`[::1]:1884`); the stored host is
    /// always unbracketed.
    ///
    /// # Errors
    ///
    /// Returns error if the input is not a usable broker address.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, EndpointError> {
        if input.parse::<Ipv6Addr>().is_ok() {
            return Self::new(input, default_port);
        }
        if input.starts_with('[') {
            return Self::parse(&format!("tcp://{input}"), default_port);
        }

        if input.contains("://") {
            let url =
                Url::parse(input).map_err(|e| EndpointError::InvalidUrl(format!("{input}: {e}")))?;

            match url.scheme() {
                "tcp" | "mqtt" => {}
                scheme => {
                    return Err(EndpointError::InvalidUrl(format!(
                        "{input}: unsupported scheme '{scheme}'"
                    )));
                }
            }

            let host = match url.host() {
                Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
                Some(Host::Ipv4(addr)) => addr.to_string(),
                Some(Host::Ipv6(addr)) => addr.to_string(),
                _ => return Err(EndpointError::MissingHost(input.to_string())),
            };
            let port = url.port().unwrap_or(default_port);

            return Self::new(host, port);
        }

        let mut parts = input.split(':');
        let host = parts
            .next()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| EndpointError::MissingHost(input.to_string()))?;
        let port = match parts.next() {
            None => default_port,
            Some(port) => port
                .parse()
                .map_err(|_| EndpointError::InvalidPort(format!("{input}: '{port}'")))?,
        };
        if parts.next().is_some() {
            return Err(EndpointError::InvalidUrl(format!(
                "{input}: too many ':' separators"
            )));
        }

        Self::new(host, port)
    }

    /// Same endpoint on a different port.
    ///
    /// # Errors
    ///
    /// Returns error if the port is zero.
    pub fn with_port(self, port: u16) -> Result<Self, EndpointError> {
        Self::new(self.host, port)
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Errors building a [`BrokerEndpoint`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// Malformed URL or address
    #[error("invalid broker address: {0}")]
    InvalidUrl(String),
    /// No host given
    #[error("missing broker host: {0:?}")]
    MissingHost(String),
    /// Port outside 1..=65535
    #[error("invalid broker port: {0}")]
    InvalidPort(String),
}
