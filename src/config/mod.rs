//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, AgentConfig, etc.)
//! - types/provider.rs: Model provider configuration
//! - types/channel.rs: LINE channel configuration
//! - io.rs: Configuration loading and env overrides
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{AgentConfig, AgentKind, Config, GatewayConfig, MarketConfig};
pub use types::channel::LineConfig;
pub use types::provider::{ProviderConfig, GEMINI_OPENAI_BASE_URL};

pub use io::{apply_env_overrides, apply_overrides_from, load_config, load_config_from_path};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
