//! Configuration types module

pub mod channel;
pub mod provider;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model provider configuration
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// LINE channel configuration
    #[serde(default)]
    pub line: channel::LineConfig,

    /// Agent behaviour
    #[serde(default)]
    pub agent: AgentConfig,

    /// Market data provider
    #[serde(default)]
    pub market: MarketConfig,

    /// Webhook HTTP server
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Layers, lowest precedence first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. Environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Which agent persona answers a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// General-purpose assistant with web search
    #[default]
    Suggestion,
    /// Stock analysis assistant
    Stock,
    /// arXiv research assistant
    Arxiv,
}

impl AgentKind {
    /// Every agent, in registration order
    pub const ALL: [AgentKind; 3] = [AgentKind::Suggestion, AgentKind::Stock, AgentKind::Arxiv];

    /// Stable agent name
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Suggestion => "suggestion",
            AgentKind::Stock => "stock",
            AgentKind::Arxiv => "arxiv",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "suggestion" | "search" | "general" => Ok(AgentKind::Suggestion),
            "stock" | "stocks" => Ok(AgentKind::Stock),
            "arxiv" | "paper" | "papers" => Ok(AgentKind::Arxiv),
            other => Err(crate::Error::Config(format!(
                "Invalid agent: {}. Valid options: suggestion, stock, arxiv",
                other
            ))),
        }
    }
}

/// Agent-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent used when a message carries no explicit command
    #[serde(default)]
    pub default: AgentKind,
    /// Upper bound on one agent turn, tool calls included
    #[serde(with = "humantime_serde", default = "default_agent_timeout")]
    pub timeout: Duration,
    /// Maximum model round-trips per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Maximum tool calls per turn
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
    /// Language the agents are instructed to reply in
    #[serde(default = "default_reply_language")]
    pub reply_language: String,
    /// Messages of history kept per user session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Idle time after which a session is dropped
    #[serde(with = "humantime_serde", default = "default_session_ttl")]
    pub session_ttl: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            default: AgentKind::default(),
            timeout: default_agent_timeout(),
            max_iterations: default_max_iterations(),
            max_tool_calls: default_max_tool_calls(),
            reply_language: default_reply_language(),
            history_limit: default_history_limit(),
            session_ttl: default_session_ttl(),
        }
    }
}

fn default_agent_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_iterations() -> u32 {
    8
}

fn default_max_tool_calls() -> u32 {
    6
}

fn default_reply_language() -> String {
    "zh-TW".to_string()
}

fn default_history_limit() -> usize {
    20
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Market data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Yahoo Finance chart API base URL
    #[serde(default = "default_market_url")]
    pub base_url: String,
    /// How long fetched price series are reused
    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub cache_ttl: Duration,
    /// Request timeout in seconds
    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            base_url: default_market_url(),
            cache_ttl: default_cache_ttl(),
            timeout_secs: default_market_timeout(),
        }
    }
}

fn default_market_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_market_timeout() -> u64 {
    15
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.agent.default, AgentKind::Suggestion);
        assert_eq!(config.agent.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_agent_kind_parsing() {
        assert_eq!("stock".parse::<AgentKind>().unwrap(), AgentKind::Stock);
        assert_eq!("Papers".parse::<AgentKind>().unwrap(), AgentKind::Arxiv);
        assert_eq!("search".parse::<AgentKind>().unwrap(), AgentKind::Suggestion);
        assert!("weather".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_humantime_fields_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [agent]
            default = "stock"
            timeout = "45s"
            session_ttl = "10m"

            [market]
            cache_ttl = "2m"
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.default, AgentKind::Stock);
        assert_eq!(config.agent.timeout, Duration::from_secs(45));
        assert_eq!(config.agent.session_ttl, Duration::from_secs(600));
        assert_eq!(config.market.cache_ttl, Duration::from_secs(120));
    }
}
