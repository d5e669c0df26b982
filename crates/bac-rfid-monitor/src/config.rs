//! Monitor configuration.

use anyhow::{bail, Context, Result};
use bac_rfid_proto::TopicScheme;
use bac_rfid_subscriber::{BrokerEndpoint, ManagerConfig, MqttTransportConfig, RetryPolicy};
use std::str::FromStr;
use std::time::Duration;

/// How tag events are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One human-readable line per event
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("unknown output format '{other}', expected 'text' or 'json'"),
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// MQTT client ID; a random one is generated when unset
    pub client_id: Option<String>,

    /// MQTT keep-alive interval
    pub keep_alive: Duration,

    /// Wait between reconnect attempts
    pub retry_delay: Duration,

    /// Only watch this BAC instead of all of them
    pub bac: Option<String>,

    /// Console output format
    pub output: OutputFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            keep_alive: Duration::from_secs(30),
            retry_delay: RetryPolicy::default().delay,
            bac: None,
            output: OutputFormat::Text,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BAC_RFID_CLIENT_ID`: MQTT client ID
    /// - `BAC_RFID_KEEP_ALIVE_SECS`: keep-alive interval in seconds; 0 disables it
    /// - `BAC_RFID_RETRY_DELAY_SECS`: reconnect delay in seconds, at least 1
    /// - `BAC_RFID_BAC`: watch a single BAC
    /// - `BAC_RFID_OUTPUT`: "text" or "json"
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value or the
    /// retry delay is zero.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(client_id) = lookup("BAC_RFID_CLIENT_ID").filter(|id| !id.is_empty()) {
            config.client_id = Some(client_id);
        }

        if let Some(secs) = lookup("BAC_RFID_KEEP_ALIVE_SECS") {
            config.keep_alive = parse_secs(&secs).context("Invalid BAC_RFID_KEEP_ALIVE_SECS")?;
        }

        if let Some(secs) = lookup("BAC_RFID_RETRY_DELAY_SECS") {
            config.retry_delay =
                parse_secs(&secs).context("Invalid BAC_RFID_RETRY_DELAY_SECS")?;
            if config.retry_delay.is_zero() {
                bail!("Invalid BAC_RFID_RETRY_DELAY_SECS: must be at least 1 second");
            }
        }

        if let Some(bac) = lookup("BAC_RFID_BAC").filter(|bac| !bac.is_empty()) {
            if bac.contains(['/', '+', '#']) {
                bail!("Invalid BAC_RFID_BAC: '{bac}' must not contain '/', '+' or '#'");
            }
            config.bac = Some(bac);
        }

        if let Some(output) = lookup("BAC_RFID_OUTPUT") {
            config.output = output.parse().context("Invalid BAC_RFID_OUTPUT")?;
        }

        Ok(config)
    }

    /// Transport settings.
    #[must_use]
    pub fn transport(&self) -> MqttTransportConfig {
        let mut transport = MqttTransportConfig {
            keep_alive: self.keep_alive,
            ..MqttTransportConfig::default()
        };
        if let Some(client_id) = &self.client_id {
            transport.client_id.clone_from(client_id);
        }
        transport
    }

    /// Connection manager settings for `endpoint`.
    #[must_use]
    pub fn manager(&self, endpoint: BrokerEndpoint) -> ManagerConfig {
        let mut manager = ManagerConfig::new(endpoint);
        manager.topic = TopicScheme::subscription(self.bac.as_deref());
        manager.retry = RetryPolicy {
            delay: self.retry_delay,
        };
        manager
    }
}

fn parse_secs(value: &str) -> Result<Duration> {
    let secs: u64 = value.trim().parse()?;
    Ok(Duration::from_secs(secs))
}
