//! MQTT topic scheme for RFID tag reports.
//!
//! Topic structure: `{bac_name}/get/rfidtag/{reader_number}`
//!
//! The first segment names the BAC, the last one the reader inside it.

/// Wildcard subscription matching every reader of every BAC.
pub const SUBSCRIPTION_TOPIC: &str = "+/get/rfidtag/+";

/// Fixed middle segments of a tag report topic.
const TAG_PATH: &str = "get/rfidtag";

/// Number of `/`-separated segments in a tag report topic.
pub const TOPIC_SEGMENTS: usize = 4;

/// Builds topics and subscription filters for tag reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicScheme;

impl TopicScheme {
    /// Topic a reader publishes its tag state on.
    #[must_use]
    pub fn tag_topic(bac_name: &str, reader_number: u32) -> String {
        format!("{bac_name}/{TAG_PATH}/{reader_number}")
    }

    /// Filter for every reader of a single BAC.
    #[must_use]
    pub fn bac_filter(bac_name: &str) -> String {
        format!("{bac_name}/{TAG_PATH}/+")
    }

    /// Subscription filter, optionally narrowed to one BAC.
    #[must_use]
    pub fn subscription(bac_name: Option<&str>) -> String {
        match bac_name {
            Some(name) if !name.is_empty() => Self::bac_filter(name),
            _ => SUBSCRIPTION_TOPIC.to_string(),
        }
    }
}
