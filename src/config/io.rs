//! Configuration I/O - Loading configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // The first name of each pair is the one the LINE console docs use.
    let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k));

    // LINE channel
    if let Some(secret) = first(&["ChannelSecret", "LINE_CHANNEL_SECRET"]) {
        config.line.channel_secret = SecretString::from(secret);
    }
    if let Some(token) = first(&["ChannelAccessToken", "LINE_CHANNEL_ACCESS_TOKEN"]) {
        config.line.channel_access_token = SecretString::from(token);
    }
    if let Some(url) = lookup("LINE_API_BASE_URL") {
        config.line.api_base_url = url;
    }

    // Model provider
    if let Some(key) = lookup("GOOGLE_API_KEY") {
        config.provider.api_key = SecretString::from(key);
    }
    if let Some(token) = lookup("GOOGLE_CLOUD_ACCESS_TOKEN") {
        config.provider.access_token = SecretString::from(token);
    }
    if let Some(v) = lookup("GOOGLE_GENAI_USE_VERTEXAI") {
        config.provider.use_vertex = matches!(v.to_lowercase().as_str(), "true" | "1");
    }
    if let Some(project) = lookup("GOOGLE_CLOUD_PROJECT") {
        config.provider.project = Some(project);
    }
    if let Some(location) = lookup("GOOGLE_CLOUD_LOCATION") {
        config.provider.location = Some(location);
    }
    if let Some(model) = lookup("LLM_MODEL") {
        config.provider.model = model;
    }
    if let Some(url) = lookup("LLM_BASE_URL") {
        config.provider.base_url = Some(url);
    }
    if let Some(v) = lookup("LLM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
        config.provider.max_retries = v;
    }

    // Agent
    if let Some(agent) = lookup("DEFAULT_AGENT").and_then(|v| v.parse().ok()) {
        config.agent.default = agent;
    }
    if let Some(timeout) = lookup("AGENT_TIMEOUT").and_then(|v| humantime_serde::re::humantime::parse_duration(&v).ok()) {
        config.agent.timeout = timeout;
    }
    if let Some(language) = lookup("REPLY_LANGUAGE") {
        config.agent.reply_language = language;
    }

    // Market data
    if let Some(url) = lookup("MARKET_DATA_BASE_URL") {
        config.market.base_url = url;
    }

    // Gateway
    if let Some(port) = first(&["PORT", "GATEWAY_PORT"]).and_then(|v| v.parse().ok()) {
        config.gateway.port = port;
    }
    if let Some(bind) = lookup("GATEWAY_BIND") {
        config.gateway.bind = bind;
    }
}
