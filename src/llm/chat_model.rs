//! Model-facing message types and the completion trait.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::llm::errors::ModelResult;
use crate::store::{Message, Role};

/// Boxed future type for model calls.
pub type ModelFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Role of an entry in the model input.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// Leading instruction.
    System,
    /// Caller message.
    User,
    /// Earlier model reply.
    Assistant,
}

impl From<Role> for ModelRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// One (role, content) pair sent to the model.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    /// Entry role.
    pub role: ModelRole,
    /// Entry text.
    pub content: String,
}

impl ModelMessage {
    /// Build the leading system instruction.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ModelRole::System,
            content: content.into(),
        }
    }
}

impl From<&Message> for ModelMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
        }
    }
}

/// A language model that turns an ordered conversation into one reply.
pub trait ChatModel: Send + Sync {
    /// Request a single, non-streamed reply.
    ///
    /// # Errors
    /// Returns a classified [`crate::llm::ModelError`] if the call fails.
    fn complete(&self, messages: Vec<ModelMessage>) -> ModelFuture<'_, ModelResult<String>>;
}
