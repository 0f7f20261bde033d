//! Language-model client components.

pub mod chat_model;
pub mod errors;
pub mod openai;

pub use chat_model::{ChatModel, ModelFuture, ModelMessage, ModelRole};
pub use errors::{ModelError, ModelResult};
pub use openai::OpenAiChat;
