use std::sync::Arc;

use async_trait::async_trait;
use color_eyre::eyre::{Context as _, Result};
use serenity::all::{
    Channel, ChannelId, Context, EventHandler, GatewayIntents, Http, Message, MessageId,
    ReactionType, Ready,
};
use serenity::Client;
use tracing::{info, warn};

use crate::bridge::{snowflake_timestamp_millis, Bridge, InboundMessage, MessageReactor};
use crate::config::Settings;
use crate::error::ReactionError;

/// Gateway intents: guild + DM messages, with message content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Reacts to one specific Discord message through the REST API.
pub struct DiscordReactor {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
}

impl DiscordReactor {
    pub fn new(http: Arc<Http>, channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            http,
            channel_id,
            message_id,
        }
    }
}

#[async_trait]
impl MessageReactor for DiscordReactor {
    async fn react(&self, emoji: &str) -> Result<(), ReactionError> {
        let reaction = ReactionType::Unicode(emoji.to_string());
        self.http
            .create_reaction(self.channel_id, self.message_id, &reaction)
            .await
            .map_err(|e| ReactionError(e.to_string()))
    }
}

struct Handler {
    bridge: Arc<Bridge>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.tag());
        log_settings(self.bridge.settings());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let inbound = to_inbound(&ctx, &msg).await;
        let reactor = Arc::new(DiscordReactor::new(ctx.http.clone(), msg.channel_id, msg.id));
        // 不等待投递完成，gateway 继续处理下一条消息
        drop(self.bridge.dispatch(inbound, reactor));
    }
}

fn log_settings(settings: &Settings) {
    info!("Webhook: {}", settings.destination_url());
    info!("Command prefix: {}", settings.command_prefix());

    match settings.allowed_origin_id() {
        Some(id) => info!("Restricted to guild ID: {}", id),
        None => info!("No guild restriction (all guilds allowed)"),
    }

    let channels = settings.allowed_channel_ids();
    if channels.is_empty() {
        info!("No channel restriction (all channels allowed)");
    } else {
        let ids: Vec<&str> = channels.iter().map(String::as_str).collect();
        info!("Restricted to channel IDs: {}", ids.join(", "));
    }
}

/// Snapshot the fields the pipeline needs.
///
/// Guild and channel names come from the cache. A guild channel the cache does
/// not know (new thread, partial startup cache) is fetched once over HTTP; if
/// that also fails the name stays empty and the event reports `"DM"`.
async fn to_inbound(ctx: &Context, msg: &Message) -> InboundMessage {
    // CacheRef 不能跨 await 持有
    let (origin_name, cached_channel) = match msg.guild(&ctx.cache) {
        Some(guild) => {
            let channel_name = guild
                .channels
                .get(&msg.channel_id)
                .map(|c| c.name.clone())
                .or_else(|| {
                    guild
                        .threads
                        .iter()
                        .find(|t| t.id == msg.channel_id)
                        .map(|t| t.name.clone())
                });
            (Some(guild.name.clone()), channel_name)
        }
        None => (None, None),
    };

    let is_guild_message = msg.guild_id.is_some();
    let channel_name = if needs_channel_fetch(is_guild_message, cached_channel.as_deref()) {
        fetch_channel_name(ctx, msg.channel_id).await
    } else {
        cached_channel
    };

    InboundMessage {
        content: msg.content.clone(),
        author_id: msg.author.id.to_string(),
        author_is_bot: msg.author.bot,
        author_username: msg.author.name.clone(),
        author_discriminator: discriminator(msg.author.discriminator.map(|d| d.get())),
        author_tag: msg.author.tag(),
        origin_id: msg.guild_id.map(|id| id.to_string()),
        origin_name,
        channel_id: msg.channel_id.to_string(),
        channel_name,
        message_id: msg.id.to_string(),
        created_at_millis: snowflake_timestamp_millis(msg.id.get()),
    }
}

/// Only guild messages have a channel name worth fetching; DMs are named `"DM"`.
fn needs_channel_fetch(is_guild_message: bool, cached: Option<&str>) -> bool {
    is_guild_message && cached.is_none()
}

async fn fetch_channel_name(ctx: &Context, channel_id: ChannelId) -> Option<String> {
    match channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => Some(channel.name),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to fetch channel {}: {}", channel_id, e);
            None
        }
    }
}

/// Four-digit legacy discriminator, `"0"` for accounts on the new username system.
fn discriminator(value: Option<u16>) -> String {
    match value {
        Some(d) => format!("{:04}", d),
        None => "0".to_string(),
    }
}

/// Connect to the gateway and relay messages until the process is stopped.
pub async fn run_discord(settings: Arc<Settings>) -> Result<()> {
    let bridge = Arc::new(
        Bridge::new(Arc::clone(&settings)).wrap_err("Failed to build webhook client")?,
    );

    info!("Connecting to Discord...");
    let mut client = Client::builder(settings.credential(), intents())
        .event_handler(Handler { bridge })
        .await
        .wrap_err("Failed to create Discord client")?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received shutdown signal");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.wrap_err("Discord gateway error")?;
    Ok(())
}
