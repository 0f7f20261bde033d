//! Chat Completions client for `OpenAI`-compatible APIs.
//!
//! Behaviour:
//! - One `POST {base_url}/chat/completions` per call, `stream: false`, no retry.
//! - Replies are taken from `choices[0].message.content`.
//! - Failures are classified from the error body `code`, falling back to the HTTP status.

use std::time::Duration;

use reqwest::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::llm::chat_model::{ChatModel, ModelFuture, ModelMessage};
use crate::llm::errors::{ModelError, ModelResult};

/// Connect timeout for the model API.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error code reported for a rejected credential.
const CODE_INVALID_API_KEY: &str = "invalid_api_key";
/// Error code reported when the account has no quota left.
const CODE_INSUFFICIENT_QUOTA: &str = "insufficient_quota";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ModelMessage],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Async client for the Chat Completions endpoint.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiChat {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> ModelResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn post_completion(&self, messages: &[ModelMessage]) -> ModelResult<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        debug!(model = %self.model, messages = messages.len(), "requesting completion");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        extract_reply(&body)
    }
}

impl ChatModel for OpenAiChat {
    fn complete(&self, messages: Vec<ModelMessage>) -> ModelFuture<'_, ModelResult<String>> {
        Box::pin(async move { self.post_completion(&messages).await })
    }
}

/// Map a non-success response to a [`ModelError`].
fn classify_failure(status: StatusCode, body: &str) -> ModelError {
    let api_error = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);

    let code = api_error.as_ref().and_then(|e| e.code.as_deref());
    let kind = api_error.as_ref().and_then(|e| e.kind.as_deref());
    let detail = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("http status {}", status.as_u16()));

    if code == Some(CODE_INVALID_API_KEY) || status == StatusCode::UNAUTHORIZED {
        ModelError::Auth(detail)
    } else if code == Some(CODE_INSUFFICIENT_QUOTA) || kind == Some(CODE_INSUFFICIENT_QUOTA) {
        ModelError::Quota(detail)
    } else {
        ModelError::Unknown(format!("{} ({detail})", status.as_u16()))
    }
}

/// Pull the first choice's text out of a success body.
fn extract_reply(body: &str) -> ModelResult<String> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|err| ModelError::Unknown(format!("malformed completion: {err}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ModelError::Unknown("completion has no reply text".to_string()))
}
