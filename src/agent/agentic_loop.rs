//! Agentic loop engine.
//!
//! Calls the model, executes the tools it asks for, feeds results back, and
//! repeats until the model answers in plain text or a limit is reached.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::client::ChatModel;
use crate::agent::types::*;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::tools::{ToolCall, ToolRegistry};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tool message for calls made after `max_tool_calls` is spent
const TOOL_BUDGET_EXHAUSTED: &str = "Error: tool budget exhausted. Answer with the information you already have.";

/// Configurable limits for the agentic loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum model round-trips before the loop is stopped.
    pub max_iterations: u32,
    /// Maximum total tool calls across all iterations.
    pub max_tool_calls: u32,
    /// Generation options (temperature, max_tokens, etc.).
    pub generation_options: GenerationOptions,
}

impl LoopConfig {
    /// Limits taken from the agent configuration
    pub fn from_agent_config(config: &AgentConfig, generation_options: GenerationOptions) -> Self {
        Self {
            max_iterations: config.max_iterations,
            max_tool_calls: config.max_tool_calls,
            generation_options,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from_agent_config(&AgentConfig::default(), GenerationOptions::balanced())
    }
}

/// How the loop finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered with text.
    Completed,
    /// Tool budget exhausted; the answer came from a tool-less call.
    ToolLimitReached,
    /// Hit `max_iterations` without a final answer.
    MaxIterationsExceeded,
    /// The model returned neither text nor tool calls.
    EmptyResponse,
}

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Everything the loop needs to run.
pub struct AgentLoopInput<'a> {
    /// System instruction, history and the new user message.
    pub messages: Vec<Message>,
    /// Model to call.
    pub model: &'a dyn ChatModel,
    /// Model identifier sent with each request.
    pub model_id: &'a str,
    /// Tools the model may call.
    pub tools: &'a ToolRegistry,
    /// Loop limits.
    pub config: &'a LoopConfig,
}

/// The result of running the agentic loop.
#[derive(Debug, Clone)]
pub struct AgentLoopOutput {
    /// Final assistant text; empty unless the outcome carries an answer.
    pub response: String,
    pub outcome: LoopOutcome,
    pub iterations: u32,
    pub tool_calls: u32,
    /// Accumulated token usage across all iterations.
    pub usage: Usage,
}

impl AgentLoopOutput {
    /// The final text, if the loop produced one
    pub fn answer(&self) -> Option<&str> {
        match self.outcome {
            LoopOutcome::Completed | LoopOutcome::ToolLimitReached if !self.response.trim().is_empty() => {
                Some(self.response.as_str())
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Core loop implementation
// ---------------------------------------------------------------------------

/// Run the agentic loop. Model API failures are returned as errors; tool
/// failures are fed back to the model as tool results.
pub async fn run_agent_loop(input: AgentLoopInput<'_>) -> Result<AgentLoopOutput> {
    let AgentLoopInput {
        mut messages,
        model,
        model_id,
        tools,
        config,
    } = input;

    let loop_start = Instant::now();
    let tool_definitions = tools.definitions();

    let mut iteration: u32 = 0;
    let mut tool_calls_made: u32 = 0;
    let mut usage = Usage::default();
    let mut response_text = String::new();

    let outcome = loop {
        iteration += 1;
        if iteration > config.max_iterations {
            warn!("Agent loop exceeded {} iterations", config.max_iterations);
            break LoopOutcome::MaxIterationsExceeded;
        }

        // Once the tool budget is spent the model gets no tools and must answer.
        let use_tools = tool_calls_made < config.max_tool_calls && !tool_definitions.is_empty();
        let offered = if use_tools { tool_definitions.clone() } else { Vec::new() };

        debug!("Agent loop iteration {}/{}", iteration, config.max_iterations);
        let request = ChatCompletionRequest::new(model_id, messages.clone(), offered, &config.generation_options);
        let response = model.complete(request).await?;

        if let Some(ref delta) = response.usage {
            usage.accumulate(delta);
        }

        let Some(choice) = response.choices.into_iter().next() else {
            warn!("Model returned no choices");
            break LoopOutcome::EmptyResponse;
        };

        let finish_reason = choice.finish_reason.clone().unwrap_or_else(|| "unknown".to_string());
        let requested = choice.message.requested_tools().to_vec();

        debug!(
            "finish_reason: {}, has_content: {}, tool_calls: {}",
            finish_reason,
            !choice.message.content.is_empty(),
            requested.len()
        );

        // Gemini reports "stop" even when it wants tools, so look at the calls first.
        if use_tools && !requested.is_empty() {
            messages.push(choice.message);

            for tc in &requested {
                // Every call needs a tool message, even past the budget.
                let content = if tool_calls_made < config.max_tool_calls {
                    tool_calls_made += 1;
                    execute_tool_call(tools, tc, tool_calls_made, config.max_tool_calls).await
                } else {
                    warn!("Tool budget exhausted, skipping {}", tc.function.name);
                    TOOL_BUDGET_EXHAUSTED.to_string()
                };
                messages.push(Message::tool(&tc.id, content));
            }
            continue;
        }

        if !choice.message.content.trim().is_empty() {
            response_text = choice.message.content;
            if use_tools || tool_calls_made == 0 {
                break LoopOutcome::Completed;
            }
            break LoopOutcome::ToolLimitReached;
        }

        warn!("Model returned empty response, finish_reason: {}", finish_reason);
        break LoopOutcome::EmptyResponse;
    };

    let iterations = iteration.min(config.max_iterations);
    info!(
        "Agent loop finished: outcome={:?}, iterations={}, tool_calls={}, tokens={}, duration={}ms",
        outcome,
        iterations,
        tool_calls_made,
        usage.total_tokens,
        loop_start.elapsed().as_millis(),
    );

    Ok(AgentLoopOutput {
        response: response_text,
        outcome,
        iterations,
        tool_calls: tool_calls_made,
        usage,
    })
}

/// Execute one requested tool call and render what goes back to the model
async fn execute_tool_call(tools: &ToolRegistry, tc: &AssistantToolCall, n: u32, max: u32) -> String {
    let tool_name = &tc.function.name;
    let raw_args = if tc.function.arguments.trim().is_empty() { "{}" } else { tc.function.arguments.as_str() };

    let arguments: serde_json::Value = match serde_json::from_str(raw_args) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse tool arguments for {}: {}", tool_name, e);
            return format!("Error: arguments for {} are not valid JSON: {}", tool_name, e);
        }
    };

    info!("Executing tool: {} (call #{}/{})", tool_name, n, max);
    debug!("Tool {} arguments: {}", tool_name, raw_args);

    let call = ToolCall {
        id: tc.id.clone(),
        name: tool_name.clone(),
        arguments,
    };

    let start = Instant::now();
    match tools.execute(&call).await {
        Ok(result) => {
            let content = result.to_string();
            debug!(
                "Tool {} finished in {}ms (success={}): {}",
                tool_name,
                start.elapsed().as_millis(),
                result.success,
                content.chars().take(500).collect::<String>()
            );
            content
        }
        Err(e) => {
            warn!("Tool {} failed: {}", tool_name, e);
            format!("Tool error: {}", e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
