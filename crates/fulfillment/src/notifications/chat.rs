//! Chat webhook notification channel.
//!
//! Posts `{phone, message, metadata}` JSON to a configured webhook; the
//! gateway behind it fans out to the customer's chat app.

use async_trait::async_trait;
use jabuticaba_core::{OrderId, OrderStatus};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

/// Request timeout for webhook calls.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Errors that can occur when posting to the chat webhook.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Network failure or timeout.
    #[error("chat webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the message.
    #[error("chat webhook error ({status}): {message}")]
    Api {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway error body, verbatim.
        message: String,
    },
}

/// Transition metadata attached to every chat message, for gateway-side
/// routing and deduplication.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMetadata {
    /// Order the message is about.
    pub order_id: OrderId,
    /// Status after the transition.
    pub new_status: OrderStatus,
}

/// Abstract chat channel, so the dispatcher is testable without a gateway.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Post one message to a phone in E.164 form.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] on network failure or a gateway rejection.
    async fn post(
        &self,
        phone_e164: &str,
        message: &str,
        metadata: &ChatMetadata,
    ) -> Result<(), ChatError>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    phone: &'a str,
    message: &'a str,
    metadata: &'a ChatMetadata,
}

/// Webhook implementation of [`ChatSender`].
#[derive(Clone)]
pub struct WebhookChatSender {
    client: reqwest::Client,
    webhook_url: Url,
    api_token: SecretString,
}

impl std::fmt::Debug for WebhookChatSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookChatSender")
            .field("webhook_url", &self.webhook_url.as_str())
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl WebhookChatSender {
    /// Create a sender for a webhook endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Http`] if the HTTP client cannot be built.
    pub fn new(webhook_url: Url, api_token: SecretString) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            webhook_url,
            api_token,
        })
    }
}

#[async_trait]
impl ChatSender for WebhookChatSender {
    #[instrument(skip(self, message, metadata), fields(order_id = %metadata.order_id))]
    async fn post(
        &self,
        phone_e164: &str,
        message: &str,
        metadata: &ChatMetadata,
    ) -> Result<(), ChatError> {
        let payload = WebhookPayload {
            phone: phone_e164,
            message,
            metadata,
        };

        let response = self
            .client
            .post(self.webhook_url.clone())
            .bearer_auth(self.api_token.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::info!(phone = %phone_e164, "status chat message sent");
        Ok(())
    }
}
