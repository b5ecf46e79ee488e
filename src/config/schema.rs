use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// 默认命令前缀
pub const DEFAULT_COMMAND_PREFIX: &str = "!cme";

/// Environment variables read at startup (case-insensitive, no prefix).
pub const ENV_KEYS: [&str; 5] = [
    "DISCORD_BOT_TOKEN",
    "N8N_WEBHOOK_URL",
    "ALLOWED_GUILD_ID",
    "ALLOWED_CHANNEL_IDS",
    "COMMAND_PREFIX",
];

/// Raw, unvalidated configuration as merged by figment (defaults → TOML → env).
///
/// Discord ids look like numbers, so env values such as `ALLOWED_GUILD_ID=123`
/// arrive as integers; the lenient deserializers turn them back into strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub discord_bot_token: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub n8n_webhook_url: Option<String>,
    /// 空 = 不限制 guild
    #[serde(default, deserialize_with = "lenient::string")]
    pub allowed_guild_id: Option<String>,
    /// 逗号分隔字符串或字符串数组，空 = 不限制 channel
    #[serde(default, deserialize_with = "lenient::list")]
    pub allowed_channel_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub command_prefix: Option<String>,
}

/// Resolved bridge settings.
///
/// Built once at startup and shared read-only (`Arc<Settings>`) with every
/// per-message task. The command prefix is already lower-cased.
#[derive(Clone)]
pub struct Settings {
    credential: String,
    destination_url: Url,
    allowed_origin_id: Option<String>,
    allowed_channel_ids: BTreeSet<String>,
    command_prefix: String,
}

/// 默认配置 TOML 模板
pub const DEFAULT_CONFIG_TOML: &str = r#"# discord-bridge configuration
# Environment variables with the same names (upper case) override these values.

# Bot token from the Discord developer portal (required)
# discord_bot_token = "..."

# Webhook receiving forwarded messages (required)
# n8n_webhook_url = "https://n8n.example.com/webhook/discord"

# Only forward messages from this guild (empty = any guild)
# allowed_guild_id = ""

# Only forward messages from these channels (empty = any channel)
# allowed_channel_ids = ["123456789012345678"]

# Case-insensitive command prefix
command_prefix = "!cme"
"#;

impl Settings {
    pub fn new(
        credential: impl Into<String>,
        destination_url: &str,
        allowed_origin_id: Option<String>,
        allowed_channel_ids: impl IntoIterator<Item = String>,
        command_prefix: Option<String>,
    ) -> Result<Self, ConfigError> {
        let credential = credential.into();
        if credential.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "DISCORD_BOT_TOKEN",
            });
        }
        if destination_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "N8N_WEBHOOK_URL",
            });
        }
        let destination_url = parse_webhook_url(destination_url.trim())?;

        let command_prefix = command_prefix
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string())
            .to_lowercase();

        Ok(Self {
            credential,
            destination_url,
            allowed_origin_id: allowed_origin_id.filter(|id| !id.trim().is_empty()),
            allowed_channel_ids: allowed_channel_ids
                .into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            command_prefix,
        })
    }

    /// 配置文件默认路径: `~/.discord-bridge/config.toml`
    pub fn default_config_path() -> color_eyre::eyre::Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| color_eyre::eyre::eyre!("cannot resolve home directory"))?;
        Ok(base_dirs
            .home_dir()
            .join(".discord-bridge")
            .join("config.toml"))
    }

    /// Layered sources: built-in defaults, then the TOML file (if it exists), then env.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment =
            Figment::new().merge(Serialized::default("command_prefix", DEFAULT_COMMAND_PREFIX));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::raw().only(&ENV_KEYS))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: FileConfig = figment.extract().map_err(Box::new)?;
        Self::try_from(raw)
    }

    /// Load with an optional config file; a missing file is skipped.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(config_file))
    }

    /// Load with a config file the user named explicitly; it must exist.
    pub fn load_required(config_file: &Path) -> Result<Self, ConfigError> {
        if !config_file.is_file() {
            return Err(ConfigError::FileNotFound {
                path: config_file.to_path_buf(),
            });
        }
        Self::load(Some(config_file))
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn destination_url(&self) -> &Url {
        &self.destination_url
    }

    /// `None` means messages from any guild (and DMs) are accepted.
    pub fn allowed_origin_id(&self) -> Option<&str> {
        self.allowed_origin_id.as_deref()
    }

    /// Empty means every channel is accepted.
    pub fn allowed_channel_ids(&self) -> &BTreeSet<String> {
        &self.allowed_channel_ids
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }
}

impl TryFrom<FileConfig> for Settings {
    type Error = ConfigError;

    fn try_from(raw: FileConfig) -> Result<Self, Self::Error> {
        let credential = raw.discord_bot_token.unwrap_or_default();
        let url = raw.n8n_webhook_url.unwrap_or_default();
        Settings::new(
            credential,
            &url,
            raw.allowed_guild_id,
            raw.allowed_channel_ids,
            raw.command_prefix,
        )
    }
}

fn parse_webhook_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        key: "N8N_WEBHOOK_URL",
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("credential", &"<redacted>")
            .field("destination_url", &self.destination_url.as_str())
            .field("allowed_origin_id", &self.allowed_origin_id)
            .field("allowed_channel_ids", &self.allowed_channel_ids)
            .field("command_prefix", &self.command_prefix)
            .finish()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "discord_bot_token = \"<redacted>\"")?;
        writeln!(f, "n8n_webhook_url = \"{}\"", self.destination_url)?;
        writeln!(
            f,
            "allowed_guild_id = \"{}\"",
            self.allowed_origin_id.as_deref().unwrap_or("")
        )?;
        let channels: Vec<String> = self
            .allowed_channel_ids
            .iter()
            .map(|id| format!("\"{}\"", id))
            .collect();
        writeln!(f, "allowed_channel_ids = [{}]", channels.join(", "))?;
        write!(f, "command_prefix = \"{}\"", self.command_prefix)
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar(Value::deserialize(d)?))
    }

    pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let items: Vec<String> = match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(scalar).collect(),
            other => scalar(other)
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        };
        Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
