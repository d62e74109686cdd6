//! Outbound WhatsApp Cloud API Client
//!
//! Sends text replies back to the originating channel through the provider's
//! message-send endpoint. Exactly one attempt per call: retries would risk
//! duplicate messages on the user's phone, and the webhook handler already
//! treats delivery failure as a logged, non-fatal outcome.

use serde::Deserialize;
use std::time::Duration;
use tracing::info;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced by a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error sending WhatsApp message: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("WhatsApp API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("WhatsApp API response could not be parsed: {0}")]
    InvalidResponse(#[source] reqwest::Error),
}

/// The provider's acknowledgement of an accepted message.
#[derive(Debug, Deserialize)]
pub struct SendReceipt {
    #[serde(default)]
    pub messages: Vec<MessageId>,
}

#[derive(Debug, Deserialize)]
pub struct MessageId {
    pub id: String,
}

/// Client for the Meta WhatsApp Cloud API message-send endpoint.
pub struct WhatsAppClient {
    http: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl WhatsAppClient {
    /// Creates a client for the given send endpoint URL and bearer token.
    pub fn new(api_url: String, api_token: String) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url,
            api_token,
        })
    }

    /// Posts a text message to `recipient_id` and returns the receipt.
    pub async fn send_text(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<SendReceipt, DeliveryError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&text_payload(recipient_id, text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status, body });
        }

        let receipt = response
            .json::<SendReceipt>()
            .await
            .map_err(DeliveryError::InvalidResponse)?;
        info!(recipient = recipient_id, "Message sent");
        Ok(receipt)
    }
}

/// Builds the provider's message-send payload for a plain text message.
fn text_payload(recipient_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": recipient_id,
        "type": "text",
        "text": { "body": text },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_payload_shape() {
        let payload = text_payload("5511999999999", "Hello back!");
        assert_eq!(
            payload,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "5511999999999",
                "type": "text",
                "text": { "body": "Hello back!" },
            })
        );
    }

    #[test]
    fn test_send_receipt_deserialization() {
        let receipt: SendReceipt = serde_json::from_value(json!({
            "messaging_product": "whatsapp",
            "contacts": [{ "input": "5511999999999", "wa_id": "5511999999999" }],
            "messages": [{ "id": "wamid.HBgL" }]
        }))
        .unwrap();

        assert_eq!(receipt.messages.len(), 1);
        assert_eq!(receipt.messages[0].id, "wamid.HBgL");
    }

    #[tokio::test]
    async fn test_transport_failure_is_a_delivery_error() {
        // Nothing listens on this port; the connection is refused locally.
        let client = WhatsAppClient::new(
            "http://127.0.0.1:9/v19.0/123456789/messages".to_string(),
            "test-token".to_string(),
        )
        .unwrap();

        let err = client.send_text("5511999999999", "Hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn test_delivery_error_display() {
        let err = DeliveryError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: r#"{"error":{"message":"Invalid OAuth access token"}}"#.to_string(),
        };
        let rendered = format!("{}", err);
        assert!(rendered.contains("401"));
        assert!(rendered.contains("Invalid OAuth access token"));
    }
}
