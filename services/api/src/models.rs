//! Webhook and API Models
//!
//! This module defines the typed shape of the WhatsApp Cloud API webhook
//! envelope, the normalization step that classifies an inbound envelope, and
//! the JSON response bodies, annotated for OpenAPI generation with `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Query parameters of the Meta webhook verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// The outermost webhook envelope: `{entry: [{changes: [{value: ...}]}]}`.
///
/// Every layer tolerates absent fields so that classification happens in
/// [`WebhookEvent::normalize`] rather than as a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    /// Delivery/read receipts. Their contents are never inspected.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

/// One inbound message as delivered by the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundMessage {
    pub from: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub timestamp: Option<String>,
    pub text: Option<TextContent>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextContent {
    pub body: String,
}

/// Why an envelope carried nothing to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredKind {
    StatusNotification,
    NoMessages,
}

/// The first message of an envelope, unpacked into a flat shape.
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub sender_id: String,
    pub message_type: String,
    pub timestamp: Option<String>,
    pub raw_message: InboundMessage,
}

/// Classification of an inbound webhook envelope.
#[derive(Debug)]
pub enum WebhookEvent {
    Message(NormalizedMessage),
    Ignored(IgnoredKind),
    Malformed { detail: String },
}

impl WebhookEvent {
    /// Extracts the first message from the nested provider envelope.
    ///
    /// Status-only notifications classify as `Ignored`; a message missing its
    /// sender or type classifies as `Malformed` with a detail string.
    pub fn normalize(payload: WebhookPayload) -> WebhookEvent {
        let value = payload
            .entry
            .into_iter()
            .next()
            .and_then(|entry| entry.changes.into_iter().next())
            .map(|change| change.value)
            .unwrap_or_default();

        if !value.statuses.is_empty() {
            return WebhookEvent::Ignored(IgnoredKind::StatusNotification);
        }

        let Some(message) = value.messages.into_iter().next() else {
            return WebhookEvent::Ignored(IgnoredKind::NoMessages);
        };

        let (Some(sender_id), Some(message_type)) =
            (message.from.clone(), message.message_type.clone())
        else {
            return WebhookEvent::Malformed {
                detail: "message is missing `from` or `type`".to_string(),
            };
        };

        WebhookEvent::Message(NormalizedMessage {
            sender_id,
            message_type,
            timestamp: message.timestamp.clone(),
            raw_message: message,
        })
    }
}

/// The body of every `POST /webhook` response.
///
/// The status is always `"success"`: application-level failures must never
/// surface as a non-200 to the provider, which would retry-storm otherwise.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    #[schema(example = "success")]
    pub status: &'static str,
    #[schema(example = "Message processed")]
    pub message: String,
}

impl WebhookAck {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "chatrelay")]
    pub service: &'static str,
    pub active_sessions: usize,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "running")]
    pub status: &'static str,
    pub active_chat_sessions: usize,
    pub config_loaded: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_message_payload(from: &str, body: &str) -> serde_json::Value {
        json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": from,
                            "type": "text",
                            "timestamp": "1714000000",
                            "text": { "body": body }
                        }]
                    }
                }]
            }]
        })
    }

    #[test]
    fn test_normalize_text_message() {
        let payload: WebhookPayload =
            serde_json::from_value(text_message_payload("5511999999999", "Hello")).unwrap();

        match WebhookEvent::normalize(payload) {
            WebhookEvent::Message(msg) => {
                assert_eq!(msg.sender_id, "5511999999999");
                assert_eq!(msg.message_type, "text");
                assert_eq!(msg.timestamp.as_deref(), Some("1714000000"));
                assert_eq!(msg.raw_message.text.unwrap().body, "Hello");
            }
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_status_notification_is_ignored() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "statuses": [{ "id": "wamid.xyz", "status": "delivered" }]
                    }
                }]
            }]
        }))
        .unwrap();

        match WebhookEvent::normalize(payload) {
            WebhookEvent::Ignored(kind) => assert_eq!(kind, IgnoredKind::StatusNotification),
            other => panic!("expected Ignored, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_empty_envelope_is_ignored() {
        for raw in [json!({}), json!({"entry": []}), json!({"entry": [{}]})] {
            let payload: WebhookPayload = serde_json::from_value(raw).unwrap();
            match WebhookEvent::normalize(payload) {
                WebhookEvent::Ignored(kind) => assert_eq!(kind, IgnoredKind::NoMessages),
                other => panic!("expected Ignored, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_normalize_message_without_sender_is_malformed() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{ "type": "text", "text": { "body": "Hi" } }]
                    }
                }]
            }]
        }))
        .unwrap();

        match WebhookEvent::normalize(payload) {
            WebhookEvent::Malformed { detail } => {
                assert!(detail.contains("from"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_params_from_query_string() {
        let params: VerifyParams = serde_urlencoded_from_str(
            "hub.mode=subscribe&hub.verify_token=secret&hub.challenge=XYZ123",
        );
        assert_eq!(params.mode.as_deref(), Some("subscribe"));
        assert_eq!(params.verify_token.as_deref(), Some("secret"));
        assert_eq!(params.challenge.as_deref(), Some("XYZ123"));

        let partial: VerifyParams = serde_urlencoded_from_str("hub.verify_token=secret");
        assert!(partial.mode.is_none());
        assert!(partial.challenge.is_none());
    }

    // Axum's Query extractor uses the same urlencoded deserializer; go
    // through serde_json here to avoid an extra dev-dependency.
    fn serde_urlencoded_from_str(query: &str) -> VerifyParams {
        let map: std::collections::HashMap<&str, &str> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| pair.split_once('='))
            .collect();
        serde_json::from_value(serde_json::to_value(map).unwrap()).unwrap()
    }

    #[test]
    fn test_webhook_ack_serialization() {
        let ack = WebhookAck::success("Event ignored");
        let json = serde_json::to_string(&ack).unwrap();
        assert_eq!(json, r#"{"status":"success","message":"Event ignored"}"#);
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        // Real envelopes carry metadata and contacts this service never reads.
        let payload: WebhookPayload = serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1234",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": { "phone_number_id": "5678" },
                        "contacts": [{ "wa_id": "5511999999999" }],
                        "messages": [{
                            "id": "wamid.abc",
                            "from": "5511999999999",
                            "type": "text",
                            "timestamp": "1714000000",
                            "text": { "body": "Hello" }
                        }]
                    }
                }]
            }]
        }))
        .unwrap();

        assert!(matches!(
            WebhookEvent::normalize(payload),
            WebhookEvent::Message(_)
        ));
    }
}
