//! Agent module - LLM logic, prompts, sessions and routing
//!
//! This module handles all AI-related functionality including:
//! - OpenAI-compatible client for Gemini (AI Studio or Vertex AI)
//! - The agentic tool-calling loop
//! - Agent personas and their tool lists
//! - Per-user conversation sessions
//! - Routing a message to an agent

pub mod agentic_loop;
mod client;
mod conversation;
mod definitions;
pub mod prompts;
mod router;
mod runner;
pub mod types;

pub use agentic_loop::{run_agent_loop, AgentLoopInput, AgentLoopOutput, LoopConfig, LoopOutcome};
pub use client::{ChatModel, ModelClient};
pub use conversation::{session_id, Session, SessionStore};
pub use definitions::{AgentCatalog, AgentDefinition, Toolkit};
pub use prompts::{InstructionContext, PromptTemplate};
pub use router::{rewrite_paper_links, Route, Router, EMPTY_COMMAND_PROMPT};
pub use runner::{AgentRunner, AgentRuntime};
pub use types::*;
