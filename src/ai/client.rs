// src/ai/client.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Sampling parameters for one chat completion call.
/// Varied per slot/attempt by the generator to encourage diverse output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

/// Failure modes of a single chat completion call.
/// `Connectivity` is the one non-transient case: callers must not retry it.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("network unreachable: {0}")]
    Connectivity(String),

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("empty completion")]
    Empty,

    #[error("request failed: {0}")]
    Request(String),
}

/// Seam between the orchestration logic and the LLM HTTP API,
/// so retry/dedup behavior is testable with a scripted backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one chat completion request and returns the raw response text.
    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        params: SamplingParams,
    ) -> Result<String, ChatError>;
}

/// HTTP client for an OpenAI-compatible chat completions endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        params: SamplingParams,
    ) -> Result<String, ChatError> {
        tracing::debug!(model, temperature = params.temperature, "calling chat completions");

        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ChatError::Connectivity(e.to_string())
                } else {
                    ChatError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ChatError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(ChatError::Empty)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::Empty);
        }

        Ok(content.to_string())
    }
}
