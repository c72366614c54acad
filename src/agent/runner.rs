//! Agent runtime
//!
//! Runs one user turn against an agent: instruction, session history and the
//! new message go into the agentic loop, and the final reply is recorded back
//! into the session.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::agent::agentic_loop::{run_agent_loop, AgentLoopInput, LoopConfig};
use crate::agent::client::ChatModel;
use crate::agent::conversation::SessionStore;
use crate::agent::definitions::{AgentCatalog, AgentDefinition};
use crate::agent::types::Message;
use crate::config::{AgentConfig, AgentKind};
use crate::error::{Error, Result};

/// Seam between the webhook and the agents
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Answer `input` from `user_id` with the given agent
    async fn run(&self, agent: AgentKind, user_id: &str, input: &str) -> Result<String>;
}

/// Runs agents against a chat model with per-user sessions
pub struct AgentRunner {
    model: Arc<dyn ChatModel>,
    agents: AgentCatalog,
    sessions: Arc<SessionStore>,
    max_iterations: u32,
    max_tool_calls: u32,
}

impl AgentRunner {
    pub fn new(model: Arc<dyn ChatModel>, agents: AgentCatalog, sessions: Arc<SessionStore>, config: &AgentConfig) -> Self {
        AgentRunner {
            model,
            agents,
            sessions,
            max_iterations: config.max_iterations,
            max_tool_calls: config.max_tool_calls,
        }
    }

    /// Session store backing this runner
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    fn loop_config(&self, agent: &AgentDefinition) -> LoopConfig {
        LoopConfig {
            max_iterations: self.max_iterations,
            max_tool_calls: self.max_tool_calls,
            generation_options: agent.generation.clone(),
        }
    }

    async fn run_turn(&self, agent: &AgentDefinition, user_id: &str, input: &str) -> Result<String> {
        let session_id = self.sessions.get_or_create(user_id).await;
        let history = self.sessions.history(&session_id).await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(agent.instruction()?));
        messages.extend(history);
        messages.push(Message::user(input));

        let config = self.loop_config(agent);
        let output = run_agent_loop(AgentLoopInput {
            messages,
            model: self.model.as_ref(),
            model_id: &agent.model,
            tools: &agent.tools,
            config: &config,
        })
        .await?;

        info!(
            "Agent {} finished: outcome={:?}, iterations={}, tool_calls={}, tokens={}",
            agent.name(),
            output.outcome,
            output.iterations,
            output.tool_calls,
            output.usage.total_tokens
        );

        let reply = output.answer().ok_or(Error::EmptyResponse)?.to_string();
        self.sessions
            .append_turn(&session_id, Message::user(input), Message::assistant(&reply))
            .await?;
        Ok(reply)
    }
}

#[async_trait]
impl AgentRuntime for AgentRunner {
    async fn run(&self, agent: AgentKind, user_id: &str, input: &str) -> Result<String> {
        let definition = self.agents.get(agent)?;
        let started = Instant::now();

        let result = match self.run_turn(&definition, user_id, input).await {
            Err(Error::SessionNotFound(id)) => {
                warn!("Session {} vanished mid-turn, retrying with a fresh session", id);
                self.sessions.remove(user_id).await;
                self.run_turn(&definition, user_id, input).await
            }
            other => other,
        };

        info!("Turn for {} took {:?}", agent, started.elapsed());
        result
    }
}
