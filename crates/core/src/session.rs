//! Conversation Sessions and the Session Registry
//!
//! A `ChatSession` owns the transcript for one user's ongoing exchange with
//! the AI backend. The `SessionRegistry` is the process-wide map from user
//! identifier to session, with create-if-absent semantics and explicit
//! lifecycle operations. It is the only shared, mutable state in the system.

use crate::backend::{BackendError, ChatBackend};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The persona used when no custom system instruction is supplied.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a friendly and helpful virtual assistant. \
     Keep your replies concise, at most three sentences.";

/// Errors produced by session construction or a conversational turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to initialize chat context: {0}")]
    BackendInit(#[source] async_openai::error::OpenAIError),
    #[error("chat backend call failed for user {user_id}: {source}")]
    BackendCall {
        user_id: String,
        #[source]
        source: BackendError,
    },
}

/// One ongoing conversation between a single external user and the backend.
///
/// The transcript is seeded with the system instruction at construction and
/// mutated only through [`ChatSession::send`], which appends the user turn,
/// calls the backend with the full conversation so far, and appends the
/// assistant's reply. The per-session mutex serializes concurrent turns for
/// the same user, so conversational ordering cannot be corrupted by two
/// in-flight requests.
pub struct ChatSession {
    user_id: String,
    system_instruction: String,
    backend: Arc<dyn ChatBackend>,
    history: Mutex<Vec<ChatCompletionRequestMessage>>,
}

impl ChatSession {
    /// Creates a session whose transcript starts with `system_instruction`.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        user_id: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let system_instruction = system_instruction.into();
        let system_turn = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_instruction.clone())
            .build()
            .map_err(ChatError::BackendInit)?
            .into();

        Ok(Self {
            user_id: user_id.into(),
            system_instruction,
            backend,
            history: Mutex::new(vec![system_turn]),
        })
    }

    /// Sends one user message and returns the backend's reply.
    ///
    /// A single attempt is made, with no retry. An empty reply is valid. On
    /// failure the user turn is rolled back, so a failed call leaves the
    /// conversation context exactly as it was.
    pub async fn send(&self, message: &str) -> Result<String, ChatError> {
        let user_turn = ChatCompletionRequestUserMessageArgs::default()
            .content(message)
            .build()
            .map_err(|e| self.call_error(BackendError::Api(e)))?
            .into();

        let mut history = self.history.lock().await;
        history.push(user_turn);

        let reply = match self.backend.complete(&history).await {
            Ok(reply) => reply,
            Err(source) => {
                history.pop();
                return Err(self.call_error(source));
            }
        };

        let assistant_turn = match ChatCompletionRequestAssistantMessageArgs::default()
            .content(reply.clone())
            .build()
        {
            Ok(turn) => turn.into(),
            Err(e) => {
                history.pop();
                return Err(self.call_error(BackendError::Api(e)));
            }
        };
        history.push(assistant_turn);

        Ok(reply)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Number of turns in the transcript, including the system instruction.
    pub async fn transcript_len(&self) -> usize {
        self.history.lock().await.len()
    }

    fn call_error(&self, source: BackendError) -> ChatError {
        ChatError::BackendCall {
            user_id: self.user_id.clone(),
            source,
        }
    }
}

/// The process-wide mapping from user identifier to conversation session.
///
/// The registry is constructed once at startup and injected wherever it is
/// needed, so tests can build a fresh one. Insert-if-absent happens under a
/// single lock, which guarantees at most one session is ever constructed per
/// user id even when calls race on the same new id. There is no expiry:
/// sessions live until deleted or the process exits.
pub struct SessionRegistry {
    backend: Arc<dyn ChatBackend>,
    default_instruction: String,
    sessions: Mutex<HashMap<String, Arc<ChatSession>>>,
}

impl SessionRegistry {
    /// Creates a registry using [`DEFAULT_SYSTEM_INSTRUCTION`] for new sessions.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_instruction(backend, DEFAULT_SYSTEM_INSTRUCTION)
    }

    /// Creates a registry with a custom default system instruction.
    pub fn with_instruction(
        backend: Arc<dyn ChatBackend>,
        default_instruction: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            default_instruction: default_instruction.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the existing session for `user_id`, constructing and inserting
    /// one first if absent. The optional instruction only applies when a new
    /// session is created; an existing session keeps its original persona.
    pub async fn get_or_create(
        &self,
        user_id: &str,
        system_instruction: Option<&str>,
    ) -> Result<Arc<ChatSession>, ChatError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(user_id) {
            return Ok(session.clone());
        }

        let instruction = system_instruction.unwrap_or(&self.default_instruction);
        let session = Arc::new(ChatSession::new(
            self.backend.clone(),
            user_id,
            instruction,
        )?);
        sessions.insert(user_id.to_string(), session.clone());
        info!(user_id, "New chat session created");
        Ok(session)
    }

    /// Pure lookup, no construction.
    pub async fn get(&self, user_id: &str) -> Option<Arc<ChatSession>> {
        self.sessions.lock().await.get(user_id).cloned()
    }

    /// Removes the session for `user_id`. Returns whether a removal occurred.
    pub async fn delete(&self, user_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(user_id).is_some();
        if removed {
            info!(user_id, "Chat session deleted");
        }
        removed
    }

    /// Removes all sessions unconditionally. Operational reset only.
    pub async fn clear(&self) {
        self.sessions.lock().await.clear();
        info!("All chat sessions cleared");
    }

    /// Number of live sessions, exposed for observability.
    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
