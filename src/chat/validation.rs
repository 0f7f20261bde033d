//! Inbound request validation.

use serde_json::Value;

use crate::chat::errors::ValidationError;

/// JSON key holding the thread identifier.
const THREAD_ID_FIELD: &str = "threadId";
/// JSON key holding the message text.
const CONTENT_FIELD: &str = "content";

/// A validated "send message" request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendMessage {
    /// Opaque thread identifier.
    pub thread_id: String,
    /// Message text exactly as submitted.
    pub content: String,
}

/// Validate a request body.
///
/// Checks run in order: presence of both fields, then their types, then that
/// `content` is not blank. A field holding `null`, `false`, `0` or `""` counts
/// as absent. The returned content is untrimmed.
///
/// # Errors
/// Returns the first [`ValidationError`] encountered.
pub fn validate_request(body: &Value) -> Result<SendMessage, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::MalformedBody)?;

    let thread_id = object.get(THREAD_ID_FIELD).filter(|v| is_present(v));
    let content = object.get(CONTENT_FIELD).filter(|v| is_present(v));
    let (Some(thread_id), Some(content)) = (thread_id, content) else {
        return Err(ValidationError::MissingField);
    };

    let (Some(thread_id), Some(content)) = (thread_id.as_str(), content.as_str()) else {
        return Err(ValidationError::InvalidType);
    };

    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }

    Ok(SendMessage {
        thread_id: thread_id.to_string(),
        content: content.to_string(),
    })
}

/// JSON truthiness: only `null`, `false`, zero and the empty string are falsy.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
