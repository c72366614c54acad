//! Channel configuration types
//!
//! Credentials and endpoints for the LINE Messaging API channel.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// LINE channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// Channel secret, the HMAC key for webhook signatures
    #[serde(skip_serializing, default = "default_secret")]
    pub channel_secret: SecretString,
    /// Long-lived channel access token for the reply API
    #[serde(skip_serializing, default = "default_secret")]
    pub channel_access_token: SecretString,
    /// Messaging API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Reply request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        LineConfig {
            channel_secret: default_secret(),
            channel_access_token: default_secret(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.line.me".to_string()
}

fn default_timeout() -> u64 {
    10
}
