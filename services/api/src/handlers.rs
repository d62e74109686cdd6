//! Axum Handlers for the Webhook Surface
//!
//! The GET verification handshake is the only path that surfaces real error
//! statuses: the provider depends on them to confirm setup. Everything behind
//! the POST ingestion path resolves to 200 with a JSON status body, because a
//! non-200 would make the provider retry the delivery.

use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    models::{
        ErrorResponse, HealthResponse, NormalizedMessage, StatusResponse, VerifyParams,
        WebhookAck, WebhookEvent, WebhookPayload,
    },
    state::AppState,
};

/// Substitute reply when the AI backend fails, so the user always hears back.
pub const FALLBACK_REPLY: &str =
    "Sorry, something went wrong while processing your message. Please try again.";

pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Verify webhook ownership for the Meta subscription handshake.
#[utoipa::path(
    get,
    path = "/webhook",
    responses(
        (status = 200, description = "Challenge echoed back as plain text", body = String),
        (status = 400, description = "Missing hub.mode or hub.verify_token", body = ErrorResponse),
        (status = 403, description = "Verification token mismatch", body = ErrorResponse)
    ),
    params(
        ("hub.mode" = Option<String>, Query, description = "Must be 'subscribe'"),
        ("hub.verify_token" = Option<String>, Query, description = "The configured shared secret"),
        ("hub.challenge" = Option<String>, Query, description = "Challenge string to echo back")
    )
)]
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, ApiError> {
    let (Some(mode), Some(token)) = (params.mode, params.verify_token) else {
        return Err(ApiError::BadRequest(
            "`hub.mode` and `hub.verify_token` are required".to_string(),
        ));
    };

    if mode == "subscribe" && token == state.config.verify_token {
        info!("Webhook verified successfully");
        Ok(params.challenge.unwrap_or_default())
    } else {
        Err(ApiError::Forbidden(
            "Invalid verification token".to_string(),
        ))
    }
}

/// Receive a webhook event, relay any text message through the AI backend,
/// and deliver the reply. Always acknowledges with 200.
#[utoipa::path(
    post,
    path = "/webhook",
    responses(
        (status = 200, description = "Event acknowledged; status describes the outcome", body = WebhookAck)
    )
)]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Json<WebhookAck> {
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => {
            warn!("Discarding unreadable webhook body: {rejection}");
            return Json(WebhookAck::success("Webhook received"));
        }
    };

    let payload: WebhookPayload = match serde_json::from_value(raw) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Webhook envelope did not match the expected shape: {e}");
            return Json(WebhookAck::success("Webhook received"));
        }
    };

    let ack = match WebhookEvent::normalize(payload) {
        WebhookEvent::Ignored(kind) => {
            debug!(?kind, "Ignoring webhook event");
            WebhookAck::success("Event ignored")
        }
        WebhookEvent::Malformed { detail } => {
            warn!(detail, "Malformed webhook event");
            WebhookAck::success("Webhook received")
        }
        WebhookEvent::Message(message) => relay_message(&state, message).await,
    };

    Json(ack)
}

/// Runs one message through the session registry, the AI backend, and
/// outbound delivery. Every failure past this point is logged and swallowed.
async fn relay_message(state: &AppState, event: NormalizedMessage) -> WebhookAck {
    if event.message_type != "text" {
        info!(
            message_type = %event.message_type,
            "Unsupported message type"
        );
        return WebhookAck::success("Unsupported message type");
    }

    let body = event
        .raw_message
        .text
        .as_ref()
        .map(|t| t.body.as_str())
        .unwrap_or_default();
    if body.is_empty() || event.sender_id.is_empty() {
        warn!("Received text message with empty body or sender");
        return WebhookAck::success("Empty message");
    }

    info!(sender = %event.sender_id, "Message received");

    let session = match state.registry.get_or_create(&event.sender_id, None).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = ?e, "Failed to create chat session");
            return WebhookAck::success("Webhook received with error");
        }
    };

    let reply = match session.send(body).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = ?e, "AI backend call failed");
            FALLBACK_REPLY.to_string()
        }
    };

    // Delivery failure is an accepted outcome: reply generated but not sent.
    if let Err(e) = state.whatsapp.send_text(&event.sender_id, &reply).await {
        error!(error = ?e, recipient = %event.sender_id, "Failed to deliver reply");
    }

    WebhookAck::success("Message processed")
}

/// Process liveness and current registry size.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "chatrelay",
        active_sessions: state.registry.count().await,
    })
}

/// Detailed runtime status readout. Read-only, no side effects.
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Runtime status", body = StatusResponse)
    )
)]
pub async fn status_report(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        active_chat_sessions: state.registry.count().await,
        config_loaded: true,
    })
}
