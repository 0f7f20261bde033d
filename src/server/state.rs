//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::chat::ChatOrchestrator;
use crate::config::RuntimeMode;

/// Shared application state.
pub struct AppState {
    /// Turn pipeline over the shared store and model client.
    pub chat: ChatOrchestrator,
    /// Controls whether 500 responses carry failure details.
    pub mode: RuntimeMode,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(chat: ChatOrchestrator, mode: RuntimeMode) -> Arc<Self> {
        Arc::new(Self { chat, mode })
    }
}
