//! # BAC RFID Protocol
//!
//! Wire contract for RFID tag presence reports published by building access
//! control (BAC) readers.
//!
//! ## MQTT Topics
//!
//! Readers publish on `{bacName}/get/rfidtag/{readerNumber}`. The payload is
//! UTF-8 text: the literal `NONE` when no tag is in range, otherwise the tag
//! identifier.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod events;
pub mod topics;

pub use events::{decode, DecodeFailure, DecodeFailureKind, InboundMessage, TagEvent};
pub use topics::{TopicScheme, SUBSCRIPTION_TOPIC};
