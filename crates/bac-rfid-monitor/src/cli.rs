//! Command-line arguments.

use anyhow::{Context, Result};
use bac_rfid_subscriber::{BrokerEndpoint, DEFAULT_PORT};

pub const USAGE: &str = "Usage:  bac-rfid-monitor serveraddress [port]";

/// Broker given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerArgs {
    /// Host, `host:port` or `tcp://` URL
    pub address: String,
    /// Explicit port; wins over one embedded in the address
    pub port: Option<u16>,
}

impl BrokerArgs {
    /// Parse arguments (program name excluded).
    ///
    /// Returns `Ok(None)` when the argument count is wrong and usage should
    /// be printed.
    ///
    /// # Errors
    ///
    /// Returns error if the port is not a number in 0..=65535.
    pub fn parse(args: &[String]) -> Result<Option<Self>> {
        match args {
            [address] => Ok(Some(Self {
                address: address.clone(),
                port: None,
            })),
            [address, port] => {
                let port = port
                    .parse()
                    .with_context(|| format!("Invalid port '{port}'"))?;
                Ok(Some(Self {
                    address: address.clone(),
                    port: Some(port),
                }))
            }
            _ => Ok(None),
        }
    }

    /// Resolve to a broker endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the address or port is unusable.
    pub fn endpoint(&self) -> Result<BrokerEndpoint> {
        let endpoint = BrokerEndpoint::parse(&self.address, DEFAULT_PORT)
            .with_context(|| format!("Invalid server address '{}'", self.address))?;
        match self.port {
            Some(port) => endpoint.with_port(port).context("Invalid port"),
            None => Ok(endpoint),
        }
    }
}
