//! Provider configuration types
//!
//! Configuration for the model-hosting service backing the agents. The
//! runtime speaks the OpenAI-compatible chat-completions protocol, which both
//! Gemini (AI Studio) and Vertex AI expose.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Gemini OpenAI-compatible endpoint on AI Studio
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (AI Studio or any OpenAI-compatible endpoint)
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// OAuth access token, used instead of the API key on Vertex AI
    #[serde(skip_serializing, default = "default_secret")]
    pub access_token: SecretString,
    /// Model identifier shared by every agent
    #[serde(default = "default_model")]
    pub model: String,
    /// Explicit base URL; overrides the AI Studio / Vertex derivation
    pub base_url: Option<String>,
    /// Route requests through Vertex AI
    #[serde(default)]
    pub use_vertex: bool,
    /// Google Cloud project (Vertex AI only)
    pub project: Option<String>,
    /// Google Cloud location (Vertex AI only)
    pub location: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries for retryable failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            api_key: default_secret(),
            access_token: default_secret(),
            model: default_model(),
            base_url: None,
            use_vertex: false,
            project: None,
            location: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the chat-completions base URL
    pub fn endpoint(&self) -> String {
        if let Some(ref url) = self.base_url {
            return url.trim_end_matches('/').to_string();
        }

        if self.use_vertex {
            let project = self.project.as_deref().unwrap_or_default();
            let location = self.location.as_deref().unwrap_or("us-central1");
            format!(
                "https://{location}-aiplatform.googleapis.com/v1beta1/projects/{project}/locations/{location}/endpoints/openapi"
            )
        } else {
            GEMINI_OPENAI_BASE_URL.to_string()
        }
    }

    /// Model id as the endpoint expects it. Vertex wants publisher-qualified ids.
    pub fn model_id(&self) -> String {
        if self.use_vertex && !self.model.contains('/') {
            format!("google/{}", self.model)
        } else {
            self.model.clone()
        }
    }

    /// Credential sent as the bearer token
    pub fn bearer(&self) -> &SecretString {
        if self.use_vertex {
            &self.access_token
        } else {
            &self.api_key
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}
