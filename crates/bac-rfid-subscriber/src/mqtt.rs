//! `rumqttc`-backed [`Transport`].

use crate::endpoint::BrokerEndpoint;
use crate::transport::{Transport, TransportError, TransportEvent};
use async_trait::async_trait;
use bac_rfid_proto::InboundMessage;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, Publish, QoS, SubscribeReasonCode,
};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

/// How long `close` waits for the DISCONNECT packet to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for the MQTT transport.
#[derive(Debug, Clone)]
pub struct MqttTransportConfig {
    /// Client ID for MQTT connection
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Request channel capacity
    pub capacity: usize,
    /// How long to wait for SUBACK before giving up on the attempt
    pub subscribe_timeout: Duration,
}

impl Default for MqttTransportConfig {
    fn default() -> Self {
        Self {
            client_id: format!("bac-rfid-{}", Uuid::new_v4()),
            keep_alive: Duration::from_secs(30),
            capacity: 100,
            subscribe_timeout: Duration::from_secs(10),
        }
    }
}

struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
}

/// MQTT transport over `rumqttc`.
///
/// Every [`connect`](Transport::connect) builds a fresh client and event
/// loop, so no state from a dead session leaks into the next one.
pub struct MqttTransport {
    config: MqttTransportConfig,
    session: Option<Session>,
    /// Publishes that arrived while waiting for SUBACK
    backlog: VecDeque<InboundMessage>,
}

impl MqttTransport {
    /// Create a transport; no connection is made until `connect`.
    #[must_use]
    pub fn new(config: MqttTransportConfig) -> Self {
        Self {
            config,
            session: None,
            backlog: VecDeque::new(),
        }
    }

    /// Client ID presented to the broker.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }
}

impl Default for MqttTransport {
    fn default() -> Self {
        Self::new(MqttTransportConfig::default())
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&mut self, endpoint: &BrokerEndpoint) -> Result<(), TransportError> {
        self.session = None;
        self.backlog.clear();

        let mut mqtt_options = MqttOptions::new(
            self.config.client_id.clone(),
            endpoint.host.clone(),
            endpoint.port,
        );
        mqtt_options.set_keep_alive(self.config.keep_alive);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, self.config.capacity);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(TransportError::Refused(format!("{:?}", ack.code)));
                    }
                    break;
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(TransportError::Refused(format!("{code:?}")));
                }
                Err(e) => return Err(TransportError::Connect(e.to_string())),
            }
        }

        tracing::info!(broker = %endpoint, client_id = %self.config.client_id, "Connected to MQTT broker");

        self.session = Some(Session { client, eventloop });
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let session = self.session.as_mut().ok_or(TransportError::NotConnected)?;

        session
            .client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        let backlog = &mut self.backlog;
        let acknowledged = async {
            loop {
                match session.eventloop.poll().await {
                    Ok(Event::Incoming(Packet::SubAck(ack))) => {
                        let rejected = ack
                            .return_codes
                            .iter()
                            .any(|code| matches!(code, SubscribeReasonCode::Failure));
                        break if rejected {
                            Err(TransportError::Subscribe(format!(
                                "broker rejected filter '{topic}'"
                            )))
                        } else {
                            Ok(())
                        };
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        backlog.push_back(to_message(&publish));
                    }
                    Ok(_) => {}
                    Err(e) => break Err(TransportError::Subscribe(e.to_string())),
                }
            }
        };

        let timeout = self.config.subscribe_timeout;
        let outcome = tokio::time::timeout(timeout, acknowledged)
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Subscribe(format!(
                    "no SUBACK within {timeout:?}"
                )))
            });

        if outcome.is_ok() {
            tracing::info!(topic, "Subscription acknowledged");
        } else {
            self.session = None;
        }
        outcome
    }

    async fn next_event(&mut self) -> TransportEvent {
        if let Some(message) = self.backlog.pop_front() {
            return TransportEvent::Message(message);
        }

        let Some(session) = self.session.as_mut() else {
            return TransportEvent::Disconnected("not connected".to_string());
        };

        let reason = loop {
            match session.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return TransportEvent::Message(to_message(&publish));
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    break "broker sent DISCONNECT".to_string();
                }
                Ok(_) => {}
                Err(e) => break e.to_string(),
            }
        };

        self.session = None;
        TransportEvent::Disconnected(reason)
    }

    async fn close(&mut self) {
        let Some(Session {
            client,
            mut eventloop,
        }) = self.session.take()
        else {
            return;
        };

        if client.disconnect().await.is_err() {
            return;
        }

        let flush = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, flush).await.is_err() {
            tracing::debug!("Timed out sending DISCONNECT");
        }
    }
}

fn to_message(publish: &Publish) -> InboundMessage {
    InboundMessage::new(publish.topic.clone(), publish.payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_id_is_unique() {
        let a = MqttTransportConfig::default();
        let b = MqttTransportConfig::default();

        assert!(a.client_id.starts_with("bac-rfid-"));
        assert_ne!(a.client_id, b.client_id);
    }

    #[tokio::test]
    async fn subscribe_without_connection_fails() {
        let mut transport = MqttTransport::default();

        let err = transport.subscribe("+/get/rfidtag/+").await.unwrap_err();
        assert_eq!(err, TransportError::NotConnected);
    }

    #[tokio::test]
    async fn next_event_without_connection_reports_disconnect() {
        let mut transport = MqttTransport::default();

        assert!(matches!(
            transport.next_event().await,
            TransportEvent::Disconnected(_)
        ));
        transport.close().await;
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = MqttTransport::default();
        let endpoint = BrokerEndpoint::new("127.0.0.1", port).unwrap();

        let err = transport.connect(&endpoint).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
