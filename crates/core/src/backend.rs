//! Chat Backend Abstraction
//!
//! This module defines the contract for the conversational AI backend and a
//! concrete implementation for any OpenAI-compatible chat-completions API.
//! The service binary points it at Gemini's OpenAI-compatible endpoint.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;

/// Errors produced by a single chat-completion round trip.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("chat completion call failed: {0}")]
    Api(#[from] async_openai::error::OpenAIError),
    #[error("chat completion response contained no choices")]
    EmptyResponse,
}

/// A generic client for one conversational turn against an AI backend.
///
/// The caller owns the transcript; each call receives the full conversation
/// so far and returns the assistant's next reply. An empty reply is valid.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Makes a single, non-streaming chat-completion call. No retries.
    async fn complete(
        &self,
        history: &[ChatCompletionRequestMessage],
    ) -> Result<String, BackendError>;
}

/// An implementation of `ChatBackend` for any OpenAI-compatible API.
pub struct OpenAiCompatibleBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatibleBackend {
    /// Creates a new backend client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The API configuration, including key and base URL.
    /// * `model` - The model identifier to use (e.g., "gemini-2.5-flash").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    async fn complete(
        &self,
        history: &[ChatCompletionRequestMessage],
    ) -> Result<String, BackendError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(history.to_vec())
            .build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(BackendError::EmptyResponse)?;

        // A reply with no content is a valid (empty) reply.
        Ok(choice.message.content.unwrap_or_default())
    }
}

/// A deterministic `ChatBackend` for development and integration testing.
///
/// Always returns the same canned reply, regardless of the transcript.
pub struct CannedBackend {
    reply: String,
}

impl CannedBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for CannedBackend {
    async fn complete(
        &self,
        _history: &[ChatCompletionRequestMessage],
    ) -> Result<String, BackendError> {
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::types::ChatCompletionRequestUserMessageArgs;

    #[tokio::test]
    async fn canned_backend_always_returns_its_reply() {
        let backend = CannedBackend::new("Hello there!");

        let empty: Vec<ChatCompletionRequestMessage> = vec![];
        assert_eq!(backend.complete(&empty).await.unwrap(), "Hello there!");

        let turn = ChatCompletionRequestUserMessageArgs::default()
            .content("Hi")
            .build()
            .unwrap()
            .into();
        assert_eq!(backend.complete(&[turn]).await.unwrap(), "Hello there!");
    }

    #[test]
    fn backend_error_display() {
        let err = BackendError::EmptyResponse;
        assert_eq!(
            format!("{}", err),
            "chat completion response contained no choices"
        );
    }
}
