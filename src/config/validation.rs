//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_line_config(config, result);
    result = validate_provider_config(config, result);
    result = validate_agent_config(config, result);

    result
}

fn validate_line_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.line.channel_secret.expose_secret().is_empty() {
        result = result.with_error(
            ValidationIssue::new("line.channel_secret", "Channel secret is required")
                .with_suggestion("Set the ChannelSecret environment variable"),
        );
    }
    if config.line.channel_access_token.expose_secret().is_empty() {
        result = result.with_error(
            ValidationIssue::new("line.channel_access_token", "Channel access token is required")
                .with_suggestion("Set the ChannelAccessToken environment variable"),
        );
    }

    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let provider = &config.provider;

    if provider.use_vertex {
        if provider.project.as_deref().map_or(true, str::is_empty) {
            result = result.with_error(
                ValidationIssue::new("provider.project", "Vertex AI requires a project")
                    .with_suggestion("Set GOOGLE_CLOUD_PROJECT"),
            );
        }
        if provider.location.as_deref().map_or(true, str::is_empty) {
            result = result.with_error(
                ValidationIssue::new("provider.location", "Vertex AI requires a location")
                    .with_suggestion("Set GOOGLE_CLOUD_LOCATION"),
            );
        }
        if provider.access_token.expose_secret().is_empty() {
            result = result.with_warning(
                ValidationIssue::new(
                    "provider.access_token",
                    "No access token configured; Vertex AI requests will be rejected",
                )
                .with_suggestion("Set GOOGLE_CLOUD_ACCESS_TOKEN (e.g. from `gcloud auth print-access-token`)"),
            );
        }
    } else if provider.api_key.expose_secret().is_empty() {
        result = result.with_error(
            ValidationIssue::new("provider.api_key", "API key is required")
                .with_suggestion("Set GOOGLE_API_KEY or enable Vertex AI with GOOGLE_GENAI_USE_VERTEXAI=True"),
        );
    }

    result
}

fn validate_agent_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.agent.timeout.is_zero() {
        result = result.with_error(ValidationIssue::new("agent.timeout", "Timeout must be non-zero"));
    }
    if config.agent.max_iterations == 0 {
        result = result.with_error(ValidationIssue::new(
            "agent.max_iterations",
            "At least one model round-trip is required",
        ));
    }
    if config.agent.history_limit == 0 {
        result = result.with_warning(ValidationIssue::new(
            "agent.history_limit",
            "History disabled; every message starts a fresh conversation",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn complete_config() -> Config {
        let mut config = Config::default();
        config.line.channel_secret = SecretString::from("secret");
        config.line.channel_access_token = SecretString::from("token");
        config.provider.api_key = SecretString::from("key");
        config
    }

    #[test]
    fn test_validate_default_config() {
        let result = validate_config(&Config::default());
        assert!(!result.valid);
        let paths: Vec<_> = result.errors.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"line.channel_secret"));
        assert!(paths.contains(&"line.channel_access_token"));
        assert!(paths.contains(&"provider.api_key"));
    }

    #[test]
    fn test_validate_complete_config() {
        let result = validate_config(&complete_config());
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_vertex_requires_project_and_location() {
        let mut config = complete_config();
        config.provider.use_vertex = true;
        let result = validate_config(&config);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.warnings.len(), 1);
    }
}
