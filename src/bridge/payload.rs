//! Maps an admitted message to the webhook event.

use chrono::{DateTime, SecondsFormat, Utc};

use super::message::{
    EventAuthor, EventChannel, EventGuild, EventMessage, InboundMessage, OutboundEvent,
};

/// Channel name used when the message has none (direct messages).
pub const DM_CHANNEL_NAME: &str = "DM";

/// Build the event, stamped with the current wall-clock time.
pub fn build_event(msg: &InboundMessage) -> OutboundEvent {
    build_event_at(msg, Utc::now())
}

pub fn build_event_at(msg: &InboundMessage, now: DateTime<Utc>) -> OutboundEvent {
    OutboundEvent {
        // 原始内容，不 trim 不转小写
        content: msg.content.clone(),
        author: EventAuthor {
            id: msg.author_id.clone(),
            username: msg.author_username.clone(),
            discriminator: msg.author_discriminator.clone(),
            tag: msg.author_tag.clone(),
        },
        guild: msg.origin_id.as_ref().map(|id| EventGuild {
            id: id.clone(),
            name: msg.origin_name.clone().unwrap_or_default(),
        }),
        channel: EventChannel {
            id: msg.channel_id.clone(),
            name: msg
                .channel_name
                .clone()
                .unwrap_or_else(|| DM_CHANNEL_NAME.to_string()),
        },
        message: EventMessage {
            id: msg.message_id.clone(),
            timestamp: msg.created_at_millis,
        },
        timestamp: iso_timestamp(now),
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn iso_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
