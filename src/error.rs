//! Error types for the bridge.
//!
//! Only `ConfigError` is fatal. Delivery and reaction failures are recovered
//! locally by the pipeline and end up as log lines plus a `DeliveryOutcome`.

use std::fmt;

/// Configuration errors raised while resolving `Settings` at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is required")]
    Missing { key: &'static str },

    #[error("{key} is not a valid http(s) URL ({value}): {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("config file not found: {}", path.display())]
    FileNotFound { path: std::path::PathBuf },

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// A failed attempt to POST an event to the webhook.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("webhook responded with status {status}")]
    Status { status: u16, body: String },

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DeliveryError {
    pub fn reason(&self) -> FailureReason {
        match self {
            DeliveryError::Timeout(_) => FailureReason::Timeout,
            DeliveryError::Network(_) | DeliveryError::Encode(_) => FailureReason::Network,
            DeliveryError::Status { .. } => FailureReason::Status,
        }
    }

    /// HTTP status of the response, when the webhook answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            DeliveryError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Coarse classification of a delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Network,
    Status,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Network => "network",
            FailureReason::Status => "status",
        };
        f.write_str(s)
    }
}

/// The gateway refused to attach the failure reaction (missing permission, deleted message, ...).
#[derive(Debug, thiserror::Error)]
#[error("failed to add reaction: {0}")]
pub struct ReactionError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_exposes_status_and_body() {
        let err = DeliveryError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.reason(), FailureReason::Status);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.body(), Some("boom"));
        assert_eq!(err.to_string(), "webhook responded with status 500");
    }

    #[test]
    fn timeout_has_no_status() {
        let err = DeliveryError::Timeout(std::time::Duration::from_secs(10));
        assert_eq!(err.reason(), FailureReason::Timeout);
        assert!(err.status().is_none());
        assert!(err.body().is_none());
        assert_eq!(err.reason().to_string(), "timeout");
    }

    #[test]
    fn missing_key_message() {
        let err = ConfigError::Missing {
            key: "DISCORD_BOT_TOKEN",
        };
        assert_eq!(err.to_string(), "DISCORD_BOT_TOKEN is required");
    }

    #[test]
    fn file_not_found_names_the_path() {
        let err = ConfigError::FileNotFound {
            path: "/etc/typo.toml".into(),
        };
        assert_eq!(err.to_string(), "config file not found: /etc/typo.toml");
    }
}
