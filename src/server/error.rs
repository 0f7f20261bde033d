//! Mapping of chat failures to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::chat::{ChatError, ValidationError};
use crate::config::RuntimeMode;
use crate::llm::ModelError;

/// Generic text returned in place of failure details outside development mode.
const GENERIC_DETAIL: &str = "Something went wrong";

/// JSON error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Short error description.
    pub error: String,
    /// Failure detail, present only on 500 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A chat failure ready to be turned into a response.
#[derive(Debug)]
pub struct ErrorReply {
    error: ChatError,
    mode: RuntimeMode,
}

impl ErrorReply {
    /// Wrap a failure with the runtime mode that decides detail exposure.
    #[must_use]
    pub const fn new(error: ChatError, mode: RuntimeMode) -> Self {
        Self { error, mode }
    }

    /// Status code and body for this failure.
    #[must_use]
    pub fn parts(&self) -> (StatusCode, ErrorBody) {
        match &self.error {
            ChatError::Validation(err @ ValidationError::BodyTooLarge) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    error: err.to_string(),
                    message: None,
                },
            ),
            ChatError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: err.to_string(),
                    message: None,
                },
            ),
            ChatError::Model(ModelError::Auth(_)) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "Invalid model API key".to_string(),
                    message: None,
                },
            ),
            ChatError::Model(ModelError::Quota(_)) => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorBody {
                    error: "Model API quota exceeded".to_string(),
                    message: None,
                },
            ),
            ChatError::Storage(_) | ChatError::Model(ModelError::Unknown(_)) => {
                let message = if self.mode.exposes_details() {
                    self.error.to_string()
                } else {
                    GENERIC_DETAIL.to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error".to_string(),
                        message: Some(message),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ErrorReply {
    fn into_response(self) -> Response {
        match &self.error {
            ChatError::Validation(err) => debug!(error = %err, "request rejected"),
            ChatError::Model(ModelError::Auth(_) | ModelError::Quota(_)) => {
                warn!(error = %self.error, "model call refused");
            }
            ChatError::Storage(_) | ChatError::Model(ModelError::Unknown(_)) => {
                error!(error = %self.error, "error processing message");
            }
        }

        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn validation_errors_are_bad_requests() {
        let reply = ErrorReply::new(ValidationError::EmptyContent.into(), RuntimeMode::Production);
        let (status, body) = reply.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Content cannot be empty");
        assert!(body.message.is_none());
    }

    #[test]
    fn oversized_bodies_are_413_with_the_error_envelope() {
        let reply = ErrorReply::new(ValidationError::BodyTooLarge.into(), RuntimeMode::Production);
        let (status, body) = reply.parts();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body.error, "Request body too large");
        assert!(body.message.is_none());
    }

    #[test]
    fn model_refusals_map_to_401_and_402() {
        let auth = ErrorReply::new(ModelError::Auth("x".into()).into(), RuntimeMode::Production);
        assert_eq!(auth.parts().0, StatusCode::UNAUTHORIZED);

        let quota = ErrorReply::new(ModelError::Quota("x".into()).into(), RuntimeMode::Production);
        assert_eq!(quota.parts().0, StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn internal_details_only_in_development() {
        let failure = || ChatError::from(StoreError::Unavailable("disk gone".into()));

        let (status, body) = ErrorReply::new(failure(), RuntimeMode::Production).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert_eq!(body.message.as_deref(), Some(GENERIC_DETAIL));

        let (_, detailed) = ErrorReply::new(failure(), RuntimeMode::Development).parts();
        assert_eq!(
            detailed.message.as_deref(),
            Some("storage unavailable: disk gone")
        );
    }

    #[test]
    fn unknown_model_errors_are_internal() {
        let reply = ErrorReply::new(
            ModelError::Unknown("502".into()).into(),
            RuntimeMode::Development,
        );
        let (status, body) = reply.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message.as_deref(), Some("model call failed: 502"));
    }
}
