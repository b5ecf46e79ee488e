//! Message forwarding pipeline: admission filter → event builder → webhook delivery.
//!
//! Each inbound message is handled by its own tokio task. Tasks share only the
//! read-only `Settings` and the webhook client, so they never wait on each other.

pub mod delivery;
pub mod filter;
pub mod message;
pub mod payload;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Settings;

pub use delivery::{
    DeliveryOutcome, MessageReactor, ReactionAttempt, WebhookClient, DELIVERY_TIMEOUT,
    FAILURE_REACTION,
};
pub use filter::{admit, should_forward, DropReason};
pub use message::{snowflake_timestamp_millis, InboundMessage, OutboundEvent};
pub use payload::{build_event, build_event_at};

pub struct Bridge {
    settings: Arc<Settings>,
    client: WebhookClient,
}

impl Bridge {
    /// Build a bridge posting to the configured webhook URL.
    pub fn new(settings: Arc<Settings>) -> reqwest::Result<Self> {
        let client = WebhookClient::new(settings.destination_url().clone())?;
        Ok(Self::with_client(settings, client))
    }

    pub fn with_client(settings: Arc<Settings>, client: WebhookClient) -> Self {
        Self { settings, client }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &WebhookClient {
        &self.client
    }

    /// Run the pipeline for one message.
    ///
    /// Returns `None` when the message is dropped by the admission filter; no
    /// event is built and no request is sent in that case.
    pub async fn process(
        &self,
        msg: InboundMessage,
        reactor: &dyn MessageReactor,
    ) -> Option<DeliveryOutcome> {
        if let Err(reason) = admit(&msg, &self.settings) {
            debug!("Dropped message {} from {}: {}", msg.message_id, msg.author_tag, reason);
            return None;
        }

        let event = build_event(&msg);
        info!(
            "Forwarding message from {} in {}: {}",
            msg.author_tag,
            msg.origin_name.as_deref().unwrap_or("DM"),
            msg.content.trim()
        );

        Some(self.client.deliver(&event, reactor).await)
    }

    /// Spawn `process` as an independent task and return without waiting.
    ///
    /// The returned handle may be dropped; the task keeps running. A panic inside
    /// the pipeline is caught here and logged, it never reaches the gateway loop.
    pub fn dispatch(
        self: &Arc<Self>,
        msg: InboundMessage,
        reactor: Arc<dyn MessageReactor>,
    ) -> JoinHandle<Option<DeliveryOutcome>> {
        let bridge = Arc::clone(self);
        let message_id = msg.message_id.clone();
        let task = tokio::spawn(async move { bridge.process(msg, reactor.as_ref()).await });

        tokio::spawn(async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Unhandled fault while forwarding message {}: {}", message_id, e);
                    None
                }
            }
        })
    }
}
