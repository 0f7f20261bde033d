//! HTTP route handlers for the chat relay API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::chat::{ChatError, ValidationError};

use super::error::{ErrorBody, ErrorReply};
use super::state::AppState;

/// Create the API router with all routes.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/messages", post(send_message))
        .fallback(not_found)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Chat relay is running!",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "messages": "POST /messages - Send a message and get AI response"
        }
    }))
}

/// Successful reply to `POST /messages`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// The assistant's reply.
    pub content: String,
}

/// Handle a chat turn.
///
/// The body is buffered and parsed here rather than through the `Json`
/// extractor so that every rejection, including an oversized body, uses the
/// `{ error }` envelope.
async fn send_message(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    let reject = |err: ValidationError| ErrorReply::new(ChatError::Validation(err), state.mode);

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            reject(ValidationError::BodyTooLarge)
        } else {
            reject(ValidationError::MalformedBody)
        }
    })?;
    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| reject(ValidationError::MalformedBody))?;
    info!(body = %payload, "received message");

    let content = state
        .chat
        .handle(&payload)
        .await
        .map_err(|err| ErrorReply::new(err, state.mode))?;

    info!(reply = %content, "sent response");
    Ok(Json(MessageResponse { content }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
            message: None,
        }),
    )
}

/// Answer every `OPTIONS` request with an empty 200 before routing.
pub async fn short_circuit_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}
