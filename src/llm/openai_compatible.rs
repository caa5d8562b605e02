//! OpenAI-compatible chat completion client (`/v1/chat/completions`).
//!
//! One call = one system message + one user message, one POST, one
//! classified result. No history, no retries, no streaming. All wire types
//! are private to this module.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use super::{CompletionError, endpoint};
use crate::config::LlmConfig;

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleProvider {
    /// Build the provider and its HTTP client.
    ///
    /// The client timeout covers the whole exchange, from connect until the
    /// response body is fully read.
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CompletionError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    /// The endpoint every request is posted to.
    pub fn endpoint(&self) -> String {
        endpoint::normalize(&self.base_url)
    }

    /// Send `content` verbatim as the user message and return the reply text.
    pub async fn complete(&self, content: &str) -> Result<String, CompletionError> {
        let url = self.endpoint();

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: [
                Message { role: "system", content: &self.system_prompt },
                Message { role: "user", content },
            ],
        };

        debug!(%url, model = %self.model, content_len = content.len(), "sending completion request");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full completion request payload");
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, timeout = e.is_timeout(), "completion request failed (transport)");
                CompletionError::Transport(e.to_string())
            })?;

        // Only 200 carries a completion; every other status, 2xx included,
        // is reported back verbatim.
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.map_err(|e| {
                error!(%status, error = %e, "failed to read error body");
                CompletionError::Transport(e.to_string())
            })?;
            warn!(%status, body_len = body.len(), "completion request returned HTTP error");
            return Err(CompletionError::Upstream { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!(error = %e, "failed to read completion body");
            CompletionError::Transport(e.to_string())
        })?;

        let text = extract_content(&bytes)?;
        debug!(reply_len = text.len(), "received completion");
        Ok(text)
    }
}

/// Pull `choices[0].message.content` out of a success body.
///
/// Malformed JSON and well-formed JSON of the wrong shape are deliberately
/// the same error.
pub fn extract_content(body: &[u8]) -> Result<String, CompletionError> {
    let parsed: ChatCompletionResponse = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, body_len = body.len(), "unparseable completion body");
        CompletionError::Parse
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| {
            warn!("completion body has no choices");
            CompletionError::Parse
        })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}
