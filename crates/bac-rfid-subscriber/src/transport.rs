//! Seam between the connection manager and the MQTT client library.

use crate::endpoint::BrokerEndpoint;
use async_trait::async_trait;
use bac_rfid_proto::InboundMessage;

/// What the transport observed while connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A publish matching the subscription
    Message(InboundMessage),
    /// The connection was lost, with a human-readable reason
    Disconnected(String),
}

/// An MQTT connection the manager drives.
///
/// The manager owns its transport exclusively and never calls two methods
/// concurrently.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Open a connection to `endpoint`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if the broker cannot be reached or refuses the session.
    async fn connect(&mut self, endpoint: &BrokerEndpoint) -> Result<(), TransportError>;

    /// Subscribe the current connection to `topic`.
    ///
    /// # Errors
    ///
    /// Returns error if there is no connection or the broker rejects the filter.
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Wait for the next message or disconnect.
    async fn next_event(&mut self) -> TransportEvent;

    /// Close the connection, if any.
    async fn close(&mut self) {}
}

/// Errors raised by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Network or protocol failure while connecting
    #[error("connection error: {0}")]
    Connect(String),
    /// Broker answered CONNACK with a failure code
    #[error("connection refused: {0}")]
    Refused(String),
    /// Subscribe request failed or was rejected
    #[error("subscription error: {0}")]
    Subscribe(String),
    /// Operation needs a live connection
    #[error("not connected")]
    NotConnected,
}
