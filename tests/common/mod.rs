//! Shared helpers for the integration tests.

// Each test file uses only part of these helpers.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use discord_bridge::bridge::{Bridge, InboundMessage, MessageReactor, WebhookClient};
use discord_bridge::config::Settings;
use discord_bridge::error::ReactionError;

pub const WEBHOOK_PATH: &str = "/webhook/discord";

/// Settings pointing at `base_url` + [`WEBHOOK_PATH`].
pub fn settings(base_url: &str, guild: Option<&str>, channels: &[&str]) -> Settings {
    Settings::new(
        "test-token",
        &format!("{}{}", base_url, WEBHOOK_PATH),
        guild.map(str::to_string),
        channels.iter().map(|c| c.to_string()),
        None,
    )
    .unwrap()
}

pub fn bridge(settings: Settings) -> Arc<Bridge> {
    bridge_with_timeout(settings, Duration::from_secs(10))
}

pub fn bridge_with_timeout(settings: Settings, timeout: Duration) -> Arc<Bridge> {
    let client = WebhookClient::with_timeout(settings.destination_url().clone(), timeout).unwrap();
    Arc::new(Bridge::with_client(Arc::new(settings), client))
}

/// A guild message in G1 / C1 from a human author.
pub fn guild_message(content: &str) -> InboundMessage {
    InboundMessage {
        content: content.to_string(),
        author_id: "80351110224678912".to_string(),
        author_is_bot: false,
        author_username: "nelly".to_string(),
        author_discriminator: "1337".to_string(),
        author_tag: "nelly#1337".to_string(),
        origin_id: Some("G1".to_string()),
        origin_name: Some("Test Guild".to_string()),
        channel_id: "C1".to_string(),
        channel_name: Some("general".to_string()),
        message_id: "175928847299117063".to_string(),
        created_at_millis: 1_462_015_105_796,
    }
}

pub fn direct_message(content: &str) -> InboundMessage {
    InboundMessage {
        origin_id: None,
        origin_name: None,
        channel_id: "D1".to_string(),
        channel_name: None,
        ..guild_message(content)
    }
}

/// Records every reaction; optionally fails or panics when asked to react.
#[derive(Default)]
pub struct RecordingReactor {
    emojis: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail: bool,
    panic: bool,
}

impl RecordingReactor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            panic: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn emojis(&self) -> Vec<String> {
        self.emojis.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageReactor for RecordingReactor {
    async fn react(&self, emoji: &str) -> Result<(), ReactionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.emojis.lock().unwrap().push(emoji.to_string());
        if self.panic {
            panic!("reactor exploded");
        }
        if self.fail {
            return Err(ReactionError("Missing Permissions".to_string()));
        }
        Ok(())
    }
}
