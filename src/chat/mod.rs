//! Chat pipeline: request validation and turn orchestration.

pub mod errors;
pub mod orchestrator;
pub mod validation;

pub use errors::{ChatError, ChatResult, ValidationError};
pub use orchestrator::{ChatOrchestrator, build_model_input};
pub use validation::{SendMessage, validate_request};
