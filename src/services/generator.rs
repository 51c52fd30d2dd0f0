use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::core::prompt::GenerationPrompt;

/// Errors that can occur when calling the text generator
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Generator request timed out")]
    Timeout,

    #[error("Rate limited by generator")]
    RateLimited,

    #[error("Unauthorized: invalid generator API key")]
    Unauthorized,

    #[error("Generator returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Generator rejected the prompt: {0}")]
    ContentRejected(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Stateless structured-text generation
///
/// Implementations return the raw text of the reply. Checking it against
/// `prompt.output_schema` is the caller's job.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GeneratorError>;
}

/// Chat-completions client for OpenAI-compatible endpoints
///
/// Sends the prompt with a `json_schema` response format so providers that
/// support constrained decoding enforce the shape up front.
pub struct HttpGenerator {
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    client: Client,
}

impl HttpGenerator {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        temperature: Option<f32>,
        timeout: Duration,
    ) -> Result<Self, GeneratorError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            model,
            temperature,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &GenerationPrompt) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "playdate_matches",
                    "strict": true,
                    "schema": prompt.output_schema,
                },
            },
        });

        if let (Some(t), Some(obj)) = (self.temperature, body.as_object_mut()) {
            obj.insert("temperature".to_string(), json!(t));
        }

        body
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GeneratorError> {
        let url = self.completions_url();

        tracing::debug!("Sending matchmaking prompt to {} ({})", url, self.model);

        let mut request = self.client.post(&url).json(&self.request_body(prompt));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout
            } else {
                GeneratorError::RequestError(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GeneratorError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(GeneratorError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;

        let choice = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| GeneratorError::InvalidResponse("Missing choices array".into()))?;

        if choice.get("finish_reason").and_then(|r| r.as_str()) == Some("content_filter") {
            return Err(GeneratorError::ContentRejected("content filter triggered".into()));
        }

        let message = choice
            .get("message")
            .ok_or_else(|| GeneratorError::InvalidResponse("Missing message".into()))?;

        if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
            return Err(GeneratorError::ContentRejected(refusal.to_string()));
        }

        match message.get("content").and_then(|c| c.as_str()) {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            Some(_) => Err(GeneratorError::InvalidResponse("Generator returned empty text".into())),
            None => Err(GeneratorError::InvalidResponse("Generator returned no text".into())),
        }
    }
}
