//! # BAC RFID Subscriber
//!
//! Keeps one subscription to a broker alive and turns every tag report into a
//! [`TagEvent`](bac_rfid_proto::TagEvent) or a
//! [`DecodeFailure`](bac_rfid_proto::DecodeFailure) for a caller-supplied sink.
//!
//! ## Connection lifecycle
//!
//! `Disconnected` → `Connecting` → `Connected` → (disconnect) → `AwaitingRetry`
//! → `Connecting` → … until [`SubscriberHandle::stop`] moves it to `Stopped`.
//! Every failure waits the same fixed delay before the next attempt.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoint;
pub mod manager;
pub mod mqtt;
pub mod sink;
pub mod transport;

pub use endpoint::{BrokerEndpoint, EndpointError, DEFAULT_PORT};
pub use manager::{
    ConnectionManager, ConnectionState, ManagerConfig, RetryPolicy, SubscriberError,
    SubscriberHandle,
};
pub use mqtt::{MqttTransport, MqttTransportConfig};
pub use sink::{EventSink, FnSink, SinkClosed};
pub use transport::{Transport, TransportError, TransportEvent};
