//! Chat-completions client
//!
//! Gemini (AI Studio and Vertex AI) and most other hosts expose the
//! OpenAI-compatible `/chat/completions` endpoint, so one client covers them.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::agent::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// The model-hosting seam
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one chat completion
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse>;
}

/// HTTP client for an OpenAI-compatible endpoint
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    endpoint: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl ModelClient {
    /// Create a new client
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.bearer().expose_secret()))
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(ModelClient {
            client,
            endpoint: format!("{}/chat/completions", config.endpoint()),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(500),
        })
    }

    /// Override the first retry delay
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        debug!("Sending chat completion: model={}, messages={}", request.model, request.messages.len());

        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            let parsed: ChatCompletionResponse = serde_json::from_str(&body)
                .map_err(|e| Error::Llm(format!("Malformed completion response: {}", e)))?;

            if let Some(ref usage) = parsed.usage {
                info!("Model response: model={}, tokens={}", parsed.model, usage.total_tokens);
            }
            return Ok(parsed);
        }

        let error_text = response.text().await.unwrap_or_default();
        match status.as_u16() {
            429 => Err(Error::RateLimit(error_text)),
            401 | 403 => Err(Error::Unauthorized(format!("Model API rejected credentials: {}", error_text))),
            code if code >= 500 => Err(Error::Provider(format!("Model API error ({}): {}", status, error_text))),
            _ => Err(Error::Llm(format!("API error ({}): {}", status, error_text))),
        }
    }
}

#[async_trait]
impl ChatModel for ModelClient {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(None)
            .build();

        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let request = &request;
        let max_retries = self.max_retries;

        backoff::future::retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            match self.send_once(request).await {
                Ok(response) => Ok(response),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    warn!("Model call failed (attempt {}/{}), retrying: {}", attempt + 1, max_retries + 1, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}
