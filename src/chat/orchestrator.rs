//! One chat turn: validate, persist, load history, ask the model, persist the reply.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::chat::errors::ChatResult;
use crate::chat::validation::{SendMessage, validate_request};
use crate::llm::{ChatModel, ModelMessage};
use crate::store::{ConversationStore, Message, Role};

/// Build the model input for a thread: the system instruction followed by
/// the stored history in order.
#[must_use]
pub fn build_model_input(system_prompt: &str, history: &[Message]) -> Vec<ModelMessage> {
    let mut input = Vec::with_capacity(history.len() + 1);
    input.push(ModelMessage::system(system_prompt));
    input.extend(history.iter().map(ModelMessage::from));
    input
}

/// Sequences store and model calls for inbound messages.
pub struct ChatOrchestrator {
    store: Arc<dyn ConversationStore>,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl ChatOrchestrator {
    /// Create an orchestrator over an initialized store and a model client.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        model: Arc<dyn ChatModel>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            model,
            system_prompt: system_prompt.into(),
        }
    }

    /// Validate a raw request body and run the turn.
    ///
    /// # Errors
    /// Returns a validation error before anything is written, or the first
    /// storage or model failure of the turn.
    pub async fn handle(&self, body: &Value) -> ChatResult<String> {
        let request = validate_request(body)?;
        self.send_message(&request).await
    }

    /// Run one turn for an already validated request and return the reply.
    ///
    /// The user message is stored before the model is called. If the model
    /// fails, no assistant message is written.
    ///
    /// # Errors
    /// Returns the first storage or model failure; later steps do not run.
    pub async fn send_message(&self, request: &SendMessage) -> ChatResult<String> {
        let thread_id = request.thread_id.as_str();

        let user_id = self
            .store
            .append(thread_id, Role::User, &request.content)
            .await?;
        let history = self.store.history(thread_id).await?;
        debug!(thread_id, user_id, messages = history.len(), "history loaded");

        let input = build_model_input(&self.system_prompt, &history);
        let reply = self.model.complete(input).await?;

        let reply_id = self
            .store
            .append(thread_id, Role::Assistant, &reply)
            .await?;
        info!(thread_id, user_id, reply_id, "turn completed");

        Ok(reply)
    }
}
