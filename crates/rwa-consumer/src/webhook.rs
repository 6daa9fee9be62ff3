//! Webhook delivery.
//!
//! Posts each message as a Discord-style webhook payload. The display name
//! is `"{username} - {channel}"` so every channel is identifiable in a
//! shared server.

use rwa_core::DeliveryError;
use rwa_core::config::DeliveryConfig;
use rwa_core::stream::{Delivery, OutboundMessage};
use serde::Serialize;

use crate::error::ConsumerError;

/// JSON body of a webhook post.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookPayload<'a> {
    /// Message text.
    pub content: &'a str,
    /// Display name.
    pub username: String,
    /// Avatar image URL.
    pub avatar_url: &'a str,
}

/// Delivers messages to webhook URLs.
pub struct WebhookDelivery {
    client: reqwest::Client,
    username: String,
    avatar_url: String,
}

impl WebhookDelivery {
    /// Build a delivery client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &DeliveryConfig) -> Result<Self, ConsumerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConsumerError::Http(format!("failed to build webhook client: {e}")))?;
        Ok(Self {
            client,
            username: config.username.clone(),
            avatar_url: config.avatar_url.clone(),
        })
    }

    /// The body posted for `message`.
    pub fn payload<'a>(&'a self, message: &'a OutboundMessage) -> WebhookPayload<'a> {
        WebhookPayload {
            content: &message.content,
            username: format!("{} - {}", self.username, message.channel),
            avatar_url: &self.avatar_url,
        }
    }
}

impl Delivery for WebhookDelivery {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&message.target)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected(status.as_u16()));
        }
        tracing::debug!(channel = %message.channel, "Delivered");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn payload_names_the_channel() {
        let delivery = WebhookDelivery::new(&DeliveryConfig::default()).unwrap();
        let message = OutboundMessage {
            channel: "Endo Alerts".to_owned(),
            target: "https://example.invalid/hook".to_owned(),
            content: "hello".to_owned(),
        };
        let json = serde_json::to_value(delivery.payload(&message)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "content": "hello",
                "username": "RWA Feed - Endo Alerts",
                "avatar_url": DeliveryConfig::default().avatar_url,
            })
        );
    }

    #[tokio::test]
    async fn unreachable_target_is_a_transport_error() {
        let delivery = WebhookDelivery::new(&DeliveryConfig::default()).unwrap();
        let message = OutboundMessage {
            channel: "c".to_owned(),
            target: "http://127.0.0.1:1/hook".to_owned(),
            content: "x".to_owned(),
        };
        let err = delivery.deliver(&message).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Transport(_) | DeliveryError::Timeout
        ));
    }
}
