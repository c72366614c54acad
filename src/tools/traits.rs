//! Core tool trait and result types

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::types::{FunctionDefinition, ToolDefinition};
use crate::error::Result;

/// A tool that can be called by the LLM
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON Schema for tool parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value) -> Result<ToolResult>;

    /// Convert to a chat-completions tool definition
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Result content. Failures may carry a structured payload here too.
    pub content: Option<String>,
    /// Error message (for failed execution)
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    /// Create a successful result from a JSON payload
    pub fn json(payload: &Value) -> Self {
        Self::success(payload.to_string())
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }

    /// Create a failed result that still hands the model a JSON payload
    pub fn failure_json(payload: &Value, error: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: Some(payload.to_string()),
            error: Some(error.into()),
        }
    }
}

impl std::fmt::Display for ToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.content, &self.error) {
            (Some(content), _) => f.write_str(content),
            (None, Some(error)) => write!(f, "Error: {}", error),
            (None, None) => Ok(()),
        }
    }
}

/// A tool call request from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments as JSON
    pub arguments: Value,
}

/// Parse tool arguments into a typed struct
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| crate::Error::InvalidInput(format!("Invalid tool arguments: {}", e)))
}

/// JSON Schema for a typed argument struct, as function-calling APIs expect it
pub fn schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    strip_formats(&mut value);
    value
}

// Gemini only accepts a handful of `format` values; schemars emits ones like `uint32`.
fn strip_formats(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("format").is_some_and(Value::is_string) {
                map.remove("format");
            }
            map.values_mut().for_each(strip_formats);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_formats),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct ExampleArgs {
        /// Ticker symbol
        symbol: String,
        /// Window length
        days: u32,
    }

    #[test]
    fn test_tool_result_display() {
        assert_eq!(ToolResult::success("Done!").to_string(), "Done!");
        assert_eq!(ToolResult::failure("Oops!").to_string(), "Error: Oops!");

        let payload = serde_json::json!({"status": "error"});
        let structured = ToolResult::failure_json(&payload, "bad");
        assert!(!structured.success);
        assert_eq!(structured.to_string(), r#"{"status":"error"}"#);
    }

    #[test]
    fn test_schema_for_strips_meta_keys() {
        let schema = schema_for::<ExampleArgs>();
        assert_eq!(schema["type"], "object");
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["properties"]["symbol"]["type"], "string");
        assert_eq!(schema["properties"]["symbol"]["description"], "Ticker symbol");
        assert!(schema["properties"]["days"].get("format").is_none());
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&Value::from("days")));
    }

    #[test]
    fn test_parse_args_rejects_wrong_shape() {
        let ok: ExampleArgs = parse_args(serde_json::json!({"symbol": "AAPL", "days": 5})).unwrap();
        assert_eq!(ok.days, 5);
        assert!(parse_args::<ExampleArgs>(serde_json::json!({"symbol": 1})).is_err());
    }
}
