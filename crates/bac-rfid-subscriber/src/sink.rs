//! Destinations for decoded tag reports.

use bac_rfid_proto::{DecodeFailure, TagEvent};
use tokio::sync::mpsc;

/// The consumer of a sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Receives the outcome of every inbound message, in delivery order.
///
/// Called from the manager task; implementations must not block.
pub trait EventSink: Send + 'static {
    /// A message decoded into a tag event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] if nothing is listening anymore, which stops the
    /// manager.
    fn on_event(&mut self, event: TagEvent) -> Result<(), SinkClosed>;

    /// A message that could not be decoded.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] if nothing is listening anymore.
    fn on_decode_failure(&mut self, failure: DecodeFailure) -> Result<(), SinkClosed>;
}

impl EventSink for mpsc::UnboundedSender<Result<TagEvent, DecodeFailure>> {
    fn on_event(&mut self, event: TagEvent) -> Result<(), SinkClosed> {
        self.send(Ok(event)).map_err(|_| SinkClosed)
    }

    fn on_decode_failure(&mut self, failure: DecodeFailure) -> Result<(), SinkClosed> {
        self.send(Err(failure)).map_err(|_| SinkClosed)
    }
}

/// Sink built from two closures.
pub struct FnSink<E, F> {
    on_event: E,
    on_failure: F,
}

impl<E, F> FnSink<E, F>
where
    E: FnMut(TagEvent) + Send + 'static,
    F: FnMut(DecodeFailure) + Send + 'static,
{
    /// Wrap an event callback and a failure callback.
    pub fn new(on_event: E, on_failure: F) -> Self {
        Self {
            on_event,
            on_failure,
        }
    }
}

impl<E, F> EventSink for FnSink<E, F>
where
    E: FnMut(TagEvent) + Send + 'static,
    F: FnMut(DecodeFailure) + Send + 'static,
{
    fn on_event(&mut self, event: TagEvent) -> Result<(), SinkClosed> {
        (self.on_event)(event);
        Ok(())
    }

    fn on_decode_failure(&mut self, failure: DecodeFailure) -> Result<(), SinkClosed> {
        (self.on_failure)(failure);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bac_rfid_proto::decode;
    use std::sync::{Arc, Mutex};

    type Outcome = Result<TagEvent, DecodeFailure>;

    #[test]
    fn channel_sink_forwards_in_order() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<Outcome>();

        let event = decode("BAC1/get/rfidtag/1", b"TAG").unwrap();
        let failure = decode("BAC1/get/rfidtag", b"TAG").unwrap_err();
        tx.on_event(event.clone()).unwrap();
        tx.on_decode_failure(failure.clone()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), Ok(event));
        assert_eq!(rx.try_recv().unwrap(), Err(failure));
    }

    #[test]
    fn channel_sink_reports_closed_receiver() {
        let (mut tx, rx) = mpsc::unbounded_channel::<Outcome>();
        drop(rx);

        let event = decode("BAC1/get/rfidtag/1", b"NONE").unwrap();
        assert_eq!(tx.on_event(event), Err(SinkClosed));
    }

    #[test]
    fn fn_sink_invokes_callbacks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::clone(&seen);
        let failures = Arc::clone(&seen);

        let mut sink = FnSink::new(
            move |event: TagEvent| events.lock().unwrap().push(event.to_string()),
            move |failure: DecodeFailure| failures.lock().unwrap().push(failure.to_string()),
        );

        sink.on_event(decode("A/get/rfidtag/4", b"NONE").unwrap())
            .unwrap();
        sink.on_decode_failure(decode("A/get/rfidtag/q", b"").unwrap_err())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], "BAC A, Reader 4:  Tag is not present.");
        assert!(seen[1].contains("A/get/rfidtag/q"));
    }
}
