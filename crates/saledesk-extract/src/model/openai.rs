//! OpenAI-compatible Chat Completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{CompletionRequest, ModelClient};
use crate::error::ExtractError;
use crate::retry::retry_with_backoff;

const SERVICE: &str = "model API";

/// Calls `{base_url}/chat/completions` with JSON-object output forced and
/// temperature 0, retrying transient failures with back-off.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NotConfigured`] when no API key is set.
    pub fn from_config(config: &saledesk_core::AppConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .model_api_key
            .as_deref()
            .ok_or(ExtractError::NotConfigured("OPENAI_API_KEY"))?;
        Self::new(
            &config.model_base_url,
            api_key,
            &config.model_name,
            config.model_timeout_secs,
            config.model_max_retries,
            config.model_backoff_base_ms,
        )
    }

    async fn complete_once(&self, body: &Value) -> Result<String, ExtractError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExtractError::UpstreamAuth {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(5);
            return Err(ExtractError::RateLimited {
                service: SERVICE,
                retry_after_secs,
            });
        }

        if !status.is_success() {
            return Err(ExtractError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let payload: Value = response.json().await?;
        payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ExtractError::Parse("completion response has no message content".into()))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError> {
        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "temperature": 0,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ]
        });

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || self.complete_once(&body))
            .await
    }
}
