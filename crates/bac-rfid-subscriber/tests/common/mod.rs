//! Scripted transport for driving the connection manager in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bac_rfid_proto::InboundMessage;
use bac_rfid_subscriber::{BrokerEndpoint, Transport, TransportError, TransportEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    Subscribe(String),
    Close,
}

#[derive(Debug, Default)]
struct ScriptState {
    connect_results: VecDeque<Result<(), TransportError>>,
    subscribe_results: VecDeque<Result<(), TransportError>>,
    calls: Vec<(Call, Instant)>,
    hang_connects: bool,
}

/// Shared view of what the transport was asked to do and will answer.
#[derive(Debug, Clone, Default)]
pub struct Script {
    inner: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn fail_connects(&self, count: usize) {
        let mut state = self.inner.lock().unwrap();
        for n in 0..count {
            state
                .connect_results
                .push_back(Err(TransportError::Connect(format!("refused #{n}"))));
        }
    }

    pub fn fail_subscribes(&self, count: usize) {
        let mut state = self.inner.lock().unwrap();
        for _ in 0..count {
            state
                .subscribe_results
                .push_back(Err(TransportError::Subscribe("not authorized".to_string())));
        }
    }

    /// Make every `connect` call block until the manager gives up on it.
    pub fn hang_connects(&self) {
        self.inner.lock().unwrap().hang_connects = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    pub fn connect_times(&self) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(call, _)| matches!(call, Call::Connect(_)))
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connect_times().len()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push((call, Instant::now()));
    }
}

pub struct MockTransport {
    script: Script,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Build a transport, its script, and the feed for inbound events.
pub fn mock_transport() -> (MockTransport, Script, mpsc::UnboundedSender<TransportEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let script = Script::default();
    let transport = MockTransport {
        script: script.clone(),
        events: rx,
    };
    (transport, script, tx)
}

pub fn message(topic: &str, payload: &str) -> TransportEvent {
    TransportEvent::Message(InboundMessage::new(topic, payload))
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self, endpoint: &BrokerEndpoint) -> Result<(), TransportError> {
        self.script.record(Call::Connect(endpoint.to_string()));
        let (hang, result) = {
            let mut state = self.script.inner.lock().unwrap();
            (state.hang_connects, state.connect_results.pop_front())
        };
        if hang {
            std::future::pending::<()>().await;
        }
        result.unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.script.record(Call::Subscribe(topic.to_string()));
        let result = self.script.inner.lock().unwrap().subscribe_results.pop_front();
        result.unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        match self.events.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.script.record(Call::Close);
    }
}
