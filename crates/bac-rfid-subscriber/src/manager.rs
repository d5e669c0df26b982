//! Connection manager: connect, subscribe, decode, retry.

use crate::endpoint::BrokerEndpoint;
use crate::sink::{EventSink, SinkClosed};
use crate::transport::{Transport, TransportError, TransportEvent};
use bac_rfid_proto::{InboundMessage, SUBSCRIPTION_TOPIC};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Delay between a failure and the next connection attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// When to try again after a failed attempt or a lost connection.
///
/// The delay is fixed: it does not grow and attempts are unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before every retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started yet
    Disconnected,
    /// Connect and subscribe in progress; `attempt` counts from the last
    /// successful connection
    Connecting {
        /// 1-based attempt number
        attempt: u64,
    },
    /// Connected and subscribed
    Connected,
    /// Waiting out the retry delay
    AwaitingRetry {
        /// Consecutive failed attempts; 0 when a live connection was lost
        attempt: u64,
        /// Why the previous attempt or connection ended
        reason: String,
    },
    /// Shut down; no further attempts are made
    Stopped,
}

impl ConnectionState {
    /// Connected and subscribed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Terminal state reached.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Broker to connect to
    pub endpoint: BrokerEndpoint,
    /// Subscription filter
    pub topic: String,
    /// Retry behaviour
    pub retry: RetryPolicy,
}

impl ManagerConfig {
    /// Subscribe to every BAC on `endpoint` with the default retry delay.
    #[must_use]
    pub fn new(endpoint: BrokerEndpoint) -> Self {
        Self {
            endpoint,
            topic: SUBSCRIPTION_TOPIC.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Errors creating a [`ConnectionManager`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriberError {
    /// Subscription filter is empty
    #[error("subscription topic must not be empty")]
    EmptyTopic,
}

/// Keeps one subscription to one broker alive and feeds a sink.
///
/// The manager task owns the transport, so at most one connect/subscribe
/// attempt is ever in flight.
pub struct ConnectionManager<T, S> {
    config: ManagerConfig,
    transport: T,
    sink: S,
    state: watch::Sender<ConnectionState>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop: watch::Receiver<bool>,
}

enum SessionEnd {
    Disconnected(String),
    Stopped,
    SinkClosed,
}

impl<T: Transport, S: EventSink> ConnectionManager<T, S> {
    /// Create a manager in the `Disconnected` state.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription topic is empty.
    pub fn new(config: ManagerConfig, transport: T, sink: S) -> Result<Self, SubscriberError> {
        if config.topic.is_empty() {
            return Err(SubscriberError::EmptyTopic);
        }

        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (stop_tx, stop) = watch::channel(false);

        Ok(Self {
            config,
            transport,
            sink,
            state,
            stop_tx: Arc::new(stop_tx),
            stop,
        })
    }

    /// Handle for stopping and observing this manager when driving
    /// [`run`](Self::run) directly.
    #[must_use]
    pub fn handle(&self) -> SubscriberHandle {
        SubscriberHandle {
            stop: Arc::clone(&self.stop_tx),
            state: self.state.subscribe(),
            task: None,
        }
    }

    /// Spawn the manager on the current tokio runtime.
    #[must_use]
    pub fn start(self) -> SubscriberHandle {
        let mut handle = self.handle();
        handle.task = Some(tokio::spawn(self.run()));
        handle
    }

    /// Connect, subscribe and dispatch messages until stopped.
    pub async fn run(mut self) {
        let endpoint = self.config.endpoint.clone();
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            self.set_state(ConnectionState::Connecting { attempt });
            tracing::info!(broker = %endpoint, attempt, "Connecting to MQTT broker");

            let established = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop) => None,
                result = establish(&mut self.transport, &self.config) => Some(result),
            };

            let (failed, reason) = match established {
                None => break,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, broker = %endpoint, attempt, "Connect attempt failed");
                    (attempt, err.to_string())
                }
                Some(Ok(())) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    tracing::info!(topic = %self.config.topic, "Connected and subscribed");

                    match self.pump().await {
                        SessionEnd::Disconnected(reason) => {
                            tracing::warn!(reason = %reason, broker = %endpoint, "Disconnected from MQTT broker");
                            (0, reason)
                        }
                        SessionEnd::Stopped => break,
                        SessionEnd::SinkClosed => {
                            tracing::warn!("Event sink closed, stopping subscriber");
                            break;
                        }
                    }
                }
            };

            self.set_state(ConnectionState::AwaitingRetry {
                attempt: failed,
                reason,
            });
            tracing::debug!(delay = ?self.config.retry.delay, "Waiting before reconnect");

            let stopped = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop) => true,
                () = tokio::time::sleep(self.config.retry.delay) => false,
            };
            if stopped {
                break;
            }
        }

        self.transport.close().await;
        self.set_state(ConnectionState::Stopped);
        tracing::info!("Subscriber stopped");
    }

    async fn pump(&mut self) -> SessionEnd {
        loop {
            let event = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop) => None,
                event = self.transport.next_event() => Some(event),
            };

            match event {
                None => return SessionEnd::Stopped,
                Some(TransportEvent::Disconnected(reason)) => {
                    return SessionEnd::Disconnected(reason);
                }
                Some(TransportEvent::Message(message)) => {
                    if self.dispatch(message).is_err() {
                        return SessionEnd::SinkClosed;
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, message: InboundMessage) -> Result<(), SinkClosed> {
        tracing::debug!(
            topic = %message.topic,
            payload = %String::from_utf8_lossy(&message.payload),
            "Received MQTT message"
        );

        match message.decode() {
            Ok(event) => {
                tracing::debug!(
                    bac_name = %event.bac_name,
                    reader_number = event.reader_number,
                    tag_present = event.tag_present(),
                    "Decoded tag event"
                );
                self.sink.on_event(event)
            }
            Err(failure) => {
                tracing::warn!(
                    kind = ?failure.kind,
                    topic = %failure.raw_topic,
                    "Failed to decode tag report"
                );
                self.sink.on_decode_failure(failure)
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

async fn establish<T: Transport>(
    transport: &mut T,
    config: &ManagerConfig,
) -> Result<(), TransportError> {
    transport.connect(&config.endpoint).await?;
    transport.subscribe(&config.topic).await
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    // The manager holds a sender, so this only resolves on a real stop.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

/// Stops and observes a [`ConnectionManager`].
#[derive(Debug)]
pub struct SubscriberHandle {
    stop: Arc<watch::Sender<bool>>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl SubscriberHandle {
    /// Request shutdown. Cancels a pending retry wait or in-flight attempt;
    /// calling it again has no effect.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait for the manager to reach `Stopped`.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "Subscriber task failed");
            }
        } else {
            let _ = self.state.wait_for(ConnectionState::is_stopped).await;
        }
    }

    /// Stop and wait.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}
