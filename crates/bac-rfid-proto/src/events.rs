//! Tag presence events decoded from reader topics.

use crate::topics::TOPIC_SEGMENTS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload a reader publishes when no tag is in range.
pub const NO_TAG_PAYLOAD: &str = "NONE";

/// A message as delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was published on
    pub topic: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Create a new inbound message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Decode this message into a tag event.
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(&self) -> Result<TagEvent, DecodeFailure> {
        decode(&self.topic, &self.payload)
    }
}

/// A decoded tag presence report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvent {
    /// Name of the BAC, taken verbatim from the first topic segment
    pub bac_name: String,
    /// Reader index within the BAC
    pub reader_number: u32,
    /// Tag identifier, `None` when no tag is present
    pub tag_id: Option<String>,
}

impl TagEvent {
    /// Whether a tag is currently in range of the reader.
    #[must_use]
    pub fn tag_present(&self) -> bool {
        self.tag_id.is_some()
    }
}

impl fmt::Display for TagEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BAC {}, Reader {}:  Tag is ", self.bac_name, self.reader_number)?;
        match &self.tag_id {
            Some(tag_id) => write!(f, "{tag_id}."),
            None => f.write_str("not present."),
        }
    }
}

/// Why a message could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailureKind {
    /// Topic does not have the four-segment shape
    MalformedTopic,
    /// Last topic segment is not a reader number
    MissingReaderNumber,
}

impl fmt::Display for DecodeFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedTopic => f.write_str("unexpected topic in subscription"),
            Self::MissingReaderNumber => {
                f.write_str("could not determine the reader number from the topic")
            }
        }
    }
}

/// A message that could not be turned into a [`TagEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {raw_topic}")]
pub struct DecodeFailure {
    /// Failure category
    pub kind: DecodeFailureKind,
    /// Topic as received
    pub raw_topic: String,
}

impl DecodeFailure {
    fn new(kind: DecodeFailureKind, topic: &str) -> Self {
        Self {
            kind,
            raw_topic: topic.to_string(),
        }
    }
}

/// Decode a tag report from its topic and payload.
///
/// # Topic Format
///
/// `{bac_name}/get/rfidtag/{reader_number}`
///
/// The middle segments are not checked; the subscription filter already
/// pins them.
///
/// # Errors
///
/// Returns [`DecodeFailureKind::MalformedTopic`] if the topic does not split
/// into exactly four segments or one of the first three is empty, and
/// [`DecodeFailureKind::MissingReaderNumber`] if the last segment is not a
/// base-10 non-negative integer.
pub fn decode(topic: &str, payload: &[u8]) -> Result<TagEvent, DecodeFailure> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.len() != TOPIC_SEGMENTS || parts[..3].iter().any(|part| part.is_empty()) {
        return Err(DecodeFailure::new(DecodeFailureKind::MalformedTopic, topic));
    }

    let bac_name = parts[0].to_string();
    let reader_number = parse_reader_number(parts[3])
        .ok_or_else(|| DecodeFailure::new(DecodeFailureKind::MissingReaderNumber, topic))?;

    let tag_id = if payload == NO_TAG_PAYLOAD.as_bytes() {
        None
    } else {
        Some(String::from_utf8_lossy(payload).into_owned())
    };

    Ok(TagEvent {
        bac_name,
        reader_number,
        tag_id,
    })
}

/// Digits only: `u32::from_str` would also take a leading `+`.
fn parse_reader_number(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
