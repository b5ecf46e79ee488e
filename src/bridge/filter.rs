//! Admission checks deciding whether a message is forwarded.

use std::fmt;

use crate::config::Settings;

use super::message::InboundMessage;

/// Why a message was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Bot authors (including ourselves) are never relayed.
    BotAuthor,
    GuildNotAllowed,
    ChannelNotAllowed,
    MissingPrefix,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::BotAuthor => "author is a bot",
            DropReason::GuildNotAllowed => "guild not in allowlist",
            DropReason::ChannelNotAllowed => "channel not in allowlist",
            DropReason::MissingPrefix => "no command prefix",
        };
        f.write_str(s)
    }
}

/// Run the admission checks in order, stopping at the first failure.
pub fn admit(msg: &InboundMessage, settings: &Settings) -> Result<(), DropReason> {
    if msg.author_is_bot {
        return Err(DropReason::BotAuthor);
    }

    // DM 没有 origin_id，配置了 guild 白名单时永远不匹配
    if let Some(allowed) = settings.allowed_origin_id() {
        if msg.origin_id.as_deref() != Some(allowed) {
            return Err(DropReason::GuildNotAllowed);
        }
    }

    let channels = settings.allowed_channel_ids();
    if !channels.is_empty() && !channels.contains(&msg.channel_id) {
        return Err(DropReason::ChannelNotAllowed);
    }

    if !msg
        .content
        .trim()
        .to_lowercase()
        .starts_with(settings.command_prefix())
    {
        return Err(DropReason::MissingPrefix);
    }

    Ok(())
}

pub fn should_forward(msg: &InboundMessage, settings: &Settings) -> bool {
    admit(msg, settings).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(guild: Option<&str>, channels: &[&str], prefix: &str) -> Settings {
        Settings::new(
            "token",
            "http://localhost:5678/webhook",
            guild.map(str::to_string),
            channels.iter().map(|c| c.to_string()),
            Some(prefix.to_string()),
        )
        .unwrap()
    }

    fn message(content: &str) -> InboundMessage {
        InboundMessage {
            content: content.to_string(),
            author_id: "42".to_string(),
            author_is_bot: false,
            author_username: "alice".to_string(),
            author_discriminator: "0".to_string(),
            author_tag: "alice".to_string(),
            origin_id: Some("G1".to_string()),
            origin_name: Some("Guild One".to_string()),
            channel_id: "C1".to_string(),
            channel_name: Some("general".to_string()),
            message_id: "M1".to_string(),
            created_at_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn bot_messages_are_always_dropped() {
        let open = settings(None, &[], "!cme");
        let mut msg = message("!cme hello");
        msg.author_is_bot = true;
        assert_eq!(admit(&msg, &open), Err(DropReason::BotAuthor));

        // even when every other check would pass
        let strict = settings(Some("G1"), &["C1"], "!cme");
        assert!(!should_forward(&msg, &strict));
    }

    #[test]
    fn matching_guild_is_forwarded() {
        let s = settings(Some("G1"), &[], "!cme");
        assert!(should_forward(&message("!cme hello"), &s));
    }

    #[test]
    fn other_guild_is_dropped_regardless_of_content() {
        let s = settings(Some("G1"), &[], "!cme");
        let mut msg = message("!cme hello");
        msg.origin_id = Some("G2".to_string());
        assert_eq!(admit(&msg, &s), Err(DropReason::GuildNotAllowed));

        msg.content = "no prefix".to_string();
        assert_eq!(admit(&msg, &s), Err(DropReason::GuildNotAllowed));
    }

    #[test]
    fn direct_message_never_matches_guild_allowlist() {
        let s = settings(Some("G1"), &[], "!cme");
        let mut msg = message("!cme hello");
        msg.origin_id = None;
        msg.origin_name = None;
        assert_eq!(admit(&msg, &s), Err(DropReason::GuildNotAllowed));
    }

    #[test]
    fn direct_message_passes_without_guild_allowlist() {
        let s = settings(None, &[], "!cme");
        let mut msg = message("!cme hello");
        msg.origin_id = None;
        assert!(should_forward(&msg, &s));
    }

    #[test]
    fn channel_allowlist() {
        let s = settings(None, &["C1", "C2"], "!cme");
        assert!(should_forward(&message("!cme a"), &s));

        let mut msg = message("!cme a");
        msg.channel_id = "C3".to_string();
        assert_eq!(admit(&msg, &s), Err(DropReason::ChannelNotAllowed));
    }

    #[test]
    fn prefix_check_ignores_case_and_surrounding_whitespace() {
        let s = settings(None, &[], "!cme");
        for content in [
            "!cme do thing",
            "  !CME do thing",
            "\t!Cme\n",
            "!cmefoo",
            "   !cme   ",
        ] {
            assert!(should_forward(&message(content), &s), "{:?}", content);
        }
    }

    #[test]
    fn prefix_must_lead_the_message() {
        let s = settings(None, &[], "!cme");
        for content in ["hello !cme", "", "   ", "!cm", "cme"] {
            assert_eq!(
                admit(&message(content), &s),
                Err(DropReason::MissingPrefix),
                "{:?}",
                content
            );
        }
    }

    #[test]
    fn configured_prefix_is_case_folded() {
        let s = settings(None, &[], "!DeploY");
        assert!(should_forward(&message("!deploy now"), &s));
        assert!(should_forward(&message("!DEPLOY now"), &s));
        assert!(!should_forward(&message("!cme now"), &s));
    }
}
