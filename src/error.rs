//! Error types for LineAgent

use thiserror::Error;

/// Result type alias using LineAgent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for LineAgent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model runtime API error
    #[error("LLM API error: {0}")]
    Llm(String),

    /// The model finished without producing any text
    #[error("Agent did not produce a final response")]
    EmptyResponse,

    /// LINE Messaging API error
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Webhook signature missing or wrong
    #[error("Invalid signature")]
    InvalidSignature,

    /// Malformed webhook payload
    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream data provider error (market data, search, arXiv)
    #[error("Provider error: {0}")]
    Provider(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Conversation session vanished between lookup and use
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::RateLimit(_) | Error::Timeout(_) | Error::Provider(_) => true,
            _ => false,
        }
    }

    /// Check if error is a client error (the caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::NotFound(_)
                | Error::Unauthorized(_)
                | Error::InvalidSignature
                | Error::Parse(_)
        )
    }
}
