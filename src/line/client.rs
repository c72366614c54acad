//! LINE Messaging API client

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::LineConfig;
use crate::error::{Error, Result};

/// LINE rejects text messages longer than this many characters
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Outbound side of the messaging platform
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send one text reply to a reply target
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage>,
}

#[derive(Debug, Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

/// Reply API client authenticated with the channel access token
#[derive(Clone)]
pub struct LineClient {
    client: Client,
    base_url: String,
}

impl LineClient {
    /// Create a new client
    pub fn new(config: &LineConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!(
                "Bearer {}",
                config.channel_access_token.expose_secret()
            ))
            .map_err(|e| Error::Config(format!("Invalid channel access token format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(LineClient {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let url = format!("{}/v2/bot/message/reply", self.base_url);
        let request = ReplyRequest {
            reply_token,
            messages: vec![TextMessage {
                kind: "text",
                text: truncate_text(text),
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!("Reply delivered ({} chars)", text.chars().count());
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            match status.as_u16() {
                401 => Err(Error::Unauthorized("Invalid channel access token".to_string())),
                429 => Err(Error::RateLimit(body)),
                _ => Err(Error::Messaging(format!("Reply API error ({}): {}", status, body))),
            }
        }
    }
}

/// Clip to the platform limit on a character boundary
fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_LENGTH {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(MAX_TEXT_LENGTH - 1).collect();
    clipped.push('…');
    clipped
}
