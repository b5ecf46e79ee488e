//! Inbound gateway message and the outbound webhook event.

use serde::{Deserialize, Serialize};

/// Discord epoch (2015-01-01T00:00:00Z) in Unix milliseconds.
const DISCORD_EPOCH_MILLIS: u64 = 1_420_070_400_000;

/// A message as seen by the bridge, detached from the gateway library's types.
///
/// `origin_id == None` means the message arrived in a direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub content: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub author_username: String,
    pub author_discriminator: String,
    pub author_tag: String,
    pub origin_id: Option<String>,
    pub origin_name: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub message_id: String,
    pub created_at_millis: i64,
}

/// JSON body POSTed to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub content: String,
    pub author: EventAuthor,
    /// `null` for direct messages
    pub guild: Option<EventGuild>,
    pub channel: EventChannel,
    pub message: EventMessage,
    /// ISO-8601 time at which the event was built, not the message creation time.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAuthor {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGuild {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChannel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    /// 消息创建时间（Unix 毫秒）
    pub timestamp: i64,
}

/// Creation time encoded in a Discord snowflake id, in Unix milliseconds.
pub fn snowflake_timestamp_millis(id: u64) -> i64 {
    ((id >> 22) + DISCORD_EPOCH_MILLIS) as i64
}
