//! Webhook delivery and the failure reaction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::{error, info, warn};
use url::Url;

use super::message::OutboundEvent;
use crate::error::{DeliveryError, FailureReason, ReactionError};

/// Emoji attached to the original message when forwarding fails.
pub const FAILURE_REACTION: &str = "❌";
/// 单次投递超时
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Error response bodies are cut to this size before logging.
const MAX_LOGGED_BODY_BYTES: usize = 2048;

/// "React to the original message" capability handed over by the event source.
///
/// One instance is bound to one message.
#[async_trait]
pub trait MessageReactor: Send + Sync {
    async fn react(&self, emoji: &str) -> Result<(), ReactionError>;
}

/// Result of the failure reaction side branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAttempt {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        status: u16,
    },
    Failed {
        reason: FailureReason,
        status: Option<u16>,
        body: Option<String>,
        reaction: ReactionAttempt,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// HTTP client bound to the webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(url: Url) -> reqwest::Result<Self> {
        Self::with_timeout(url, DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(url: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the event once. Any non-2xx status is an error.
    pub async fn post(&self, event: &OutboundEvent) -> Result<u16, DeliveryError> {
        let body = serde_json::to_vec(event)?;

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(
                USER_AGENT,
                HeaderValue::from_static(concat!("discord-bridge/", env!("CARGO_PKG_VERSION"))),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        })
    }

    /// Deliver the event; on failure, react to the original message exactly once.
    ///
    /// Never returns an error: every failure is logged and folded into the outcome.
    pub async fn deliver(
        &self,
        event: &OutboundEvent,
        reactor: &dyn MessageReactor,
    ) -> DeliveryOutcome {
        match self.post(event).await {
            Ok(status) => {
                info!("Forwarded message {} to webhook (status: {})", event.message.id, status);
                DeliveryOutcome::Delivered { status }
            }
            Err(err) => {
                error!("Failed to forward message {} to webhook: {}", event.message.id, err);
                if let Some(status) = err.status() {
                    error!("Webhook response status: {}", status);
                    error!("Webhook response body: {}", err.body().unwrap_or_default());
                }

                let reaction = signal_failure(reactor).await;
                DeliveryOutcome::Failed {
                    reason: err.reason(),
                    status: err.status(),
                    body: err.body().map(str::to_string),
                    reaction,
                }
            }
        }
    }

    fn classify(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else {
            DeliveryError::Network(err)
        }
    }
}

async fn signal_failure(reactor: &dyn MessageReactor) -> ReactionAttempt {
    match reactor.react(FAILURE_REACTION).await {
        Ok(()) => ReactionAttempt::Succeeded,
        Err(e) => {
            warn!("Failed to add error reaction: {}", e);
            ReactionAttempt::Failed
        }
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_LOGGED_BODY_BYTES {
        let mut end = MAX_LOGGED_BODY_BYTES;
        // 确保在 UTF-8 字符边界
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}
